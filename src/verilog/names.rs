use super::GenerateError;
use crate::graph::*;

use std::collections::{HashMap, HashSet};

/// Determines a name candidate for every design item, based on the item's own
/// display name, how the item is used, and finally its kind.
///
/// An unnamed item that is used in exactly one position borrows its consumer's
/// name plus a position suffix, so that for example the left operand of an
/// addition that feeds a register `counter` becomes `counter_addL`. Unnamed
/// items with no usable position fall back to a kind default such as
/// `register` or `signal`. These are only candidates; the [`Names`] allocator
/// makes them unique.
///
/// [`Names`]: ./struct.Names.html
pub(crate) struct AbsoluteNames {
    names: HashMap<usize, String>,
}

struct PropagatingSuggestion {
    origin: usize,
    suffix: String,
}

struct Resolver<'i, 'a> {
    items_by_index: HashMap<usize, ItemRef<'a>>,
    propagating: HashMap<usize, PropagatingSuggestion>,
    independent: HashMap<usize, &'static str>,
    in_progress: HashSet<usize>,
    names: &'i mut HashMap<usize, String>,
}

impl AbsoluteNames {
    pub(crate) fn new(items: &[ItemRef<'_>]) -> AbsoluteNames {
        let mut names = HashMap::new();
        let mut resolver = Resolver {
            items_by_index: items.iter().map(|item| (item.index(), *item)).collect(),
            propagating: HashMap::new(),
            independent: HashMap::new(),
            in_progress: HashSet::new(),
            names: &mut names,
        };
        for item in items {
            resolver.collect_suggestions(*item);
        }
        for item in items {
            resolver.determine(*item);
        }
        AbsoluteNames { names }
    }

    pub(crate) fn absolute_name(&self, item_index: usize) -> &str {
        &self.names[&item_index]
    }
}

impl<'i, 'a> Resolver<'i, 'a> {
    fn suggest(&mut self, target: usize, origin: usize, suffix: impl Into<String>) {
        self.propagating.insert(
            target,
            PropagatingSuggestion {
                origin,
                suffix: suffix.into(),
            },
        );
    }

    fn collect_suggestions(&mut self, item: ItemRef<'a>) {
        let index = item.index();
        match item {
            ItemRef::BitSignal(signal) => match signal.data {
                BitSignalData::Op { op, lhs, rhs } => {
                    self.suggest(lhs.as_item().index(), index, format!("_{}L", op.suggestion_suffix()));
                    self.suggest(rhs.as_item().index(), index, format!("_{}R", op.suggestion_suffix()));
                }
                BitSignalData::Not { operand } => {
                    self.suggest(operand.as_item().index(), index, "_not");
                }
                BitSignalData::Conditional {
                    condition,
                    on_true,
                    on_false,
                } => {
                    self.suggest(condition.as_item().index(), index, "_condition");
                    self.suggest(on_true.as_item().index(), index, "_then");
                    self.suggest(on_false.as_item().index(), index, "_else");
                }
                BitSignalData::Comparison { op, lhs, rhs } => {
                    self.suggest(lhs.as_item().index(), index, format!("_{}L", op.suggestion_suffix()));
                    self.suggest(rhs.as_item().index(), index, format!("_{}R", op.suggestion_suffix()));
                }
                BitSignalData::IndexSelection { container, index: sel_index } => {
                    self.suggest(container.as_item().index(), index, "_container");
                    self.suggest(sel_index.as_item().index(), index, "_index");
                }
                BitSignalData::ConstantIndexSelection { container, .. } => {
                    self.suggest(container.as_item().index(), index, "_container");
                }
                BitSignalData::Connector { ref connected } => {
                    if let Some(connected) = connected.get() {
                        self.suggest(connected.as_item().index(), index, "");
                    }
                }
                _ => (),
            },
            ItemRef::VectorSignal(signal) => match signal.data {
                VectorSignalData::Op { op, lhs, rhs } => {
                    self.suggest(lhs.as_item().index(), index, format!("_{}L", op.suggestion_suffix()));
                    self.suggest(rhs.as_item().index(), index, format!("_{}R", op.suggestion_suffix()));
                }
                VectorSignalData::Not { operand } => {
                    self.suggest(operand.as_item().index(), index, "_not");
                }
                VectorSignalData::Negate { operand } => {
                    self.suggest(operand.as_item().index(), index, "_neg");
                }
                VectorSignalData::Shift { lhs, rhs, .. } => {
                    self.suggest(lhs.as_item().index(), index, "_shiftL");
                    self.suggest(rhs.as_item().index(), index, "_shiftR");
                }
                VectorSignalData::Concat { lhs, rhs } => {
                    self.suggest(lhs.as_item().index(), index, "_element0");
                    self.suggest(rhs.as_item().index(), index, "_element1");
                }
                VectorSignalData::Repeat { source, .. } => {
                    self.suggest(source.as_item().index(), index, "_element");
                }
                VectorSignalData::FromBit { bit } => {
                    self.suggest(bit.as_item().index(), index, "");
                }
                VectorSignalData::RangeSelection { container, .. } => {
                    self.suggest(container.as_item().index(), index, "_container");
                }
                VectorSignalData::Conditional {
                    condition,
                    on_true,
                    on_false,
                } => {
                    self.suggest(condition.as_item().index(), index, "_condition");
                    self.suggest(on_true.as_item().index(), index, "_then");
                    self.suggest(on_false.as_item().index(), index, "_else");
                }
                VectorSignalData::Connector { ref connected, .. } => {
                    if let Some(connected) = connected.get() {
                        self.suggest(connected.as_item().index(), index, "");
                    }
                }
                VectorSignalData::MemorySelection { memory, index: sel_index } => {
                    self.suggest(memory.as_item().index(), index, "_container");
                    self.suggest(sel_index.as_item().index(), index, "_index");
                }
                VectorSignalData::MemoryConstantSelection { memory, .. } => {
                    self.suggest(memory.as_item().index(), index, "_container");
                }
                _ => (),
            },
            ItemRef::BitOutputPin(pin) => {
                self.suggest(pin.source().as_item().index(), index, "");
            }
            ItemRef::VectorOutputPin(pin) => {
                self.suggest(pin.source().as_item().index(), index, "");
            }
            ItemRef::ClockedBlock(block) => {
                self.collect_statement_suggestions(block.statements());
            }
            _ => (),
        }
    }

    fn collect_statement_suggestions(&mut self, sequence: &StatementSequence<'a>) {
        for statement in sequence.statement_list().iter() {
            match *statement {
                Statement::AssignBit { register, source } => {
                    self.suggest(
                        source.as_item().index(),
                        register.signal.as_item().index(),
                        "_d",
                    );
                }
                Statement::AssignVector { register, source } => {
                    self.suggest(
                        source.as_item().index(),
                        register.signal.as_item().index(),
                        "_d",
                    );
                }
                Statement::WriteMemory { memory, source, .. } => {
                    self.suggest(source.as_item().index(), memory.as_item().index(), "_d");
                }
                Statement::When(when) => {
                    let condition_index = when.condition().as_item().index();
                    self.independent.insert(condition_index, "condition");
                    if when.otherwise_branch_ref().is_effectively_nop() {
                        if let Some(destination) =
                            single_assignment_destination(when.then_branch_ref())
                        {
                            self.suggest(condition_index, destination, "_condition");
                        }
                    }
                    self.collect_statement_suggestions(when.then_branch_ref());
                    self.collect_statement_suggestions(when.otherwise_branch_ref());
                }
            }
        }
    }

    fn determine(&mut self, item: ItemRef<'a>) -> String {
        let index = item.index();
        if let Some(name) = self.names.get(&index) {
            return name.clone();
        }
        // Suggestion chains can be cyclic (eg. through connectors); a revisited
        // item falls back to its default name.
        if !self.in_progress.insert(index) {
            return default_name(item);
        }
        let name = if let Some(name) = item.name() {
            name
        } else if let Some((origin, suffix)) = self
            .propagating
            .get(&index)
            .map(|suggestion| (suggestion.origin, suggestion.suffix.clone()))
        {
            let origin_item = self.items_by_index[&origin];
            format!("{}{}", self.determine(origin_item), suffix)
        } else if let Some(independent) = self.independent.get(&index) {
            (*independent).to_string()
        } else {
            default_name(item)
        };
        self.in_progress.remove(&index);
        self.names.insert(index, name.clone());
        name
    }
}

fn single_assignment_destination(sequence: &StatementSequence<'_>) -> Option<usize> {
    let statements = sequence.statement_list();
    if statements.len() != 1 {
        return None;
    }
    match statements[0] {
        Statement::AssignBit { register, .. } => Some(register.signal.as_item().index()),
        Statement::AssignVector { register, .. } => Some(register.signal.as_item().index()),
        _ => None,
    }
}

fn default_name(item: ItemRef<'_>) -> String {
    match item {
        ItemRef::BitSignal(signal) => match signal.data {
            BitSignalData::Register { .. } => "register",
            _ => "signal",
        },
        ItemRef::VectorSignal(signal) => match signal.data {
            VectorSignalData::Register { .. } => "register",
            _ => "signal",
        },
        ItemRef::Memory(_) => "memory",
        ItemRef::Clock(_) => "clock",
        ItemRef::ClockedBlock(_) => "clocked_block",
        ItemRef::BitOutputPin(_) | ItemRef::VectorOutputPin(_) => "pin",
        ItemRef::Interval(_) => "interval_item",
        ItemRef::TimeLimit(_) => "time_limit",
        ItemRef::ClockStepper(_) => "clock_stepper",
    }
    .to_string()
}

/// Stores the names actually used in the generated Verilog and allocates
/// generated names.
///
/// This table is not about name *candidates* (see [`AbsoluteNames`]); a name
/// stored here must be used if present, and an item with no name here has no
/// Verilog declaration.
///
/// [`AbsoluteNames`]: ./struct.AbsoluteNames.html
pub(crate) struct Names {
    absolute_names: AbsoluteNames,
    name_to_item: HashMap<String, usize>,
    item_to_name: HashMap<usize, String>,
    prefix_counters: HashMap<String, u32>,
}

impl Names {
    pub(crate) fn new(absolute_names: AbsoluteNames) -> Names {
        Names {
            absolute_names,
            name_to_item: HashMap::new(),
            item_to_name: HashMap::new(),
            prefix_counters: HashMap::new(),
        }
    }

    /// Uses the specified name for an item, ignoring the item's own name. Fails
    /// if the name is already taken, by either a fixed or a generated name.
    pub(crate) fn assign_fixed_name(
        &mut self,
        name: &str,
        item_index: usize,
    ) -> Result<(), GenerateError> {
        if self.name_to_item.contains_key(name) {
            return Err(GenerateError::FixedNameCollision {
                name: name.to_string(),
            });
        }
        self.name_to_item.insert(name.to_string(), item_index);
        self.item_to_name.insert(item_index, name.to_string());
        Ok(())
    }

    /// Generates a name based on the item's name candidate, appending a
    /// disambiguating number if the bare candidate, or any earlier numbered
    /// variant, is already taken. The search skips past collisions with both
    /// fixed and previously generated names; every candidate is re-checked
    /// against the full name table, since a fixed name may have been registered
    /// after this candidate's counter was last used.
    pub(crate) fn assign_generated_name(&mut self, item_index: usize) -> String {
        let prefix = self.absolute_names.absolute_name(item_index).to_string();
        let counter = self.prefix_counters.entry(prefix.clone()).or_insert(0);
        loop {
            let name = if *counter == 0 {
                prefix.clone()
            } else {
                format!("{}__{}", prefix, *counter)
            };
            *counter += 1;
            if !self.name_to_item.contains_key(&name) {
                self.name_to_item.insert(name.clone(), item_index);
                self.item_to_name.insert(item_index, name.clone());
                return name;
            }
        }
    }

    /// Returns the Verilog name assigned to the given item, if any.
    pub(crate) fn name_of(&self, item_index: usize) -> Option<&str> {
        self.item_to_name.get(&item_index).map(|name| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute_names<'a>(design: &'a Design<'a>) -> AbsoluteNames {
        AbsoluteNames::new(&design.items())
    }

    #[test]
    fn own_name_wins() {
        let design = Design::new();

        let a = design.lit(0, 4);
        a.set_name("a");

        let names = absolute_names(&design);
        assert_eq!(names.absolute_name(a.as_item().index()), "a");
    }

    #[test]
    fn operands_borrow_their_consumers_name() {
        let design = Design::new();

        let a = design.lit(1, 4);
        let b = design.lit(2, 4);
        let sum = a + b;
        sum.set_name("total");

        let names = absolute_names(&design);
        assert_eq!(names.absolute_name(a.as_item().index()), "total_addL");
        assert_eq!(names.absolute_name(b.as_item().index()), "total_addR");
    }

    #[test]
    fn suggestions_propagate_through_chains() {
        let design = Design::new();

        let a = design.lit(1, 4);
        let negated = -a;
        design.vector_output_pin("result", negated);

        let names = absolute_names(&design);
        assert_eq!(names.absolute_name(negated.as_item().index()), "result");
        assert_eq!(names.absolute_name(a.as_item().index()), "result_neg");
    }

    #[test]
    fn unnamed_items_fall_back_to_kind_defaults() {
        let design = Design::new();

        let register = design.bit_register();
        register.disable_error_if_not_assigned();
        let signal = design.lit(0, 4);

        let names = absolute_names(&design);
        assert_eq!(
            names.absolute_name(register.signal.as_item().index()),
            "register"
        );
        assert_eq!(names.absolute_name(signal.as_item().index()), "signal");
    }

    #[test]
    fn assignment_source_is_named_after_its_destination() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let counter = design.vector_register(4);
        counter.set_name("counter");
        let next = counter.signal + design.lit(1, 4);
        clock.clocked_block().statements().assign(counter, next);

        let names = absolute_names(&design);
        assert_eq!(names.absolute_name(next.as_item().index()), "counter_d");
    }

    #[test]
    fn single_assignment_condition_is_named_after_the_destination() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let flag = design.bit_register();
        flag.set_name("flag");
        let condition = design.bit_input_pin("ready").signal & design.high();
        let when = clock.clocked_block().statements().when(condition);
        when.then_branch().assign_bit_value(flag, true);

        let names = absolute_names(&design);
        assert_eq!(
            names.absolute_name(condition.as_item().index()),
            "flag_condition"
        );
    }

    #[test]
    fn fixed_name_collision_error() {
        let design = Design::new();

        let a = design.lit(0, 4);
        let b = design.lit(0, 4);
        let mut names = Names::new(absolute_names(&design));

        names.assign_fixed_name("clk", a.as_item().index()).unwrap();
        let error = names
            .assign_fixed_name("clk", b.as_item().index())
            .unwrap_err();
        assert!(matches!(error, GenerateError::FixedNameCollision { name } if name == "clk"));
    }

    #[test]
    fn generated_names_are_disambiguated_with_suffixes() {
        let design = Design::new();

        let a = design.bit_register();
        a.disable_error_if_not_assigned();
        let b = design.bit_register();
        b.disable_error_if_not_assigned();
        let mut names = Names::new(absolute_names(&design));

        assert_eq!(names.assign_generated_name(a.signal.as_item().index()), "register");
        assert_eq!(
            names.assign_generated_name(b.signal.as_item().index()),
            "register__1"
        );
    }

    #[test]
    fn generated_names_skip_past_fixed_names() {
        let design = Design::new();

        let fixed = design.lit(0, 4);
        let a = design.bit_register();
        a.disable_error_if_not_assigned();
        let b = design.bit_register();
        b.disable_error_if_not_assigned();
        let mut names = Names::new(absolute_names(&design));

        names
            .assign_fixed_name("register", fixed.as_item().index())
            .unwrap();
        assert_eq!(
            names.assign_generated_name(a.signal.as_item().index()),
            "register__1"
        );
        assert_eq!(
            names.assign_generated_name(b.signal.as_item().index()),
            "register__2"
        );
    }

    #[test]
    fn generated_names_recheck_fixed_names_registered_in_between() {
        let design = Design::new();

        let fixed = design.lit(0, 4);
        let a = design.bit_register();
        a.disable_error_if_not_assigned();
        let b = design.bit_register();
        b.disable_error_if_not_assigned();
        let mut names = Names::new(absolute_names(&design));

        assert_eq!(names.assign_generated_name(a.signal.as_item().index()), "register");
        names
            .assign_fixed_name("register__1", fixed.as_item().index())
            .unwrap();
        assert_eq!(
            names.assign_generated_name(b.signal.as_item().index()),
            "register__2"
        );
    }
}
