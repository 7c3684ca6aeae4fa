use super::item::*;

use thiserror::Error;

/// Collects the problems a single item reports during validation.
///
/// Errors are fatal and abort construction finalization; warnings are reported
/// through the validation result but don't abort anything.
pub struct ValidationContext {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationContext {
    pub(crate) fn new() -> ValidationContext {
        ValidationContext {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Reports a fatal problem with the item being validated.
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Reports a non-fatal problem with the item being validated.
    pub fn report_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// The problems reported by a single item during validation.
pub struct ItemValidationResult {
    item: String,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ItemValidationResult {
    /// Returns the description of the item this result belongs to.
    pub fn item(&self) -> &str {
        &self.item
    }

    /// Returns the errors reported by the item.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns the warnings reported by the item.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// The aggregate result of validating every item of a design once.
///
/// The validator never stops at the first problem; all problems from all items
/// are collected into one result so a caller can see every problem in one run
/// instead of fixing one at a time.
pub struct DesignValidationResult {
    item_results: Vec<ItemValidationResult>,
}

impl DesignValidationResult {
    pub(crate) fn collect(items: &[ItemRef<'_>]) -> DesignValidationResult {
        let mut item_results = Vec::new();
        for item in items {
            let mut context = ValidationContext::new();
            item.validate(&mut context);
            item_results.push(ItemValidationResult {
                item: item.description(),
                errors: context.errors,
                warnings: context.warnings,
            });
        }
        DesignValidationResult { item_results }
    }

    /// Returns the per-item results, in registration order.
    pub fn item_results(&self) -> &[ItemValidationResult] {
        &self.item_results
    }

    /// Returns true iff no item reported an error. Warnings don't make a design
    /// invalid.
    pub fn is_valid(&self) -> bool {
        self.item_results.iter().all(|result| result.errors.is_empty())
    }

    pub(crate) fn into_error(self) -> ValidationError {
        let mut problems = Vec::new();
        for result in self.item_results {
            for message in result.errors {
                problems.push(ValidationProblem {
                    item: result.item.clone(),
                    message,
                });
            }
        }
        ValidationError { problems }
    }
}

/// A single fatal problem found during validation.
#[derive(Debug, Clone, Error)]
#[error("{item}: {message}")]
pub struct ValidationProblem {
    /// Description of the item that reported the problem.
    pub item: String,
    /// The problem message.
    pub message: String,
}

/// The error returned when a design fails validation. Carries every problem
/// found in the validation pass, not just the first one.
#[derive(Debug, Error)]
#[error("design validation failed with {} problem(s): {}", problems.len(), problems.iter().map(|p| p.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    /// All fatal problems, in item registration order.
    pub problems: Vec<ValidationProblem>,
}
