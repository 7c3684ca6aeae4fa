use super::names::Names;
use super::{DeclarationKeyword, Declarations, GenerateError};
use crate::code_writer::CodeWriter;
use crate::graph::*;

use std::collections::HashSet;
use std::io;

/// The kinds of expressions that may be embedded unparenthesized at a use site.
///
/// Every use of a signal inside an expression states the nesting it requires;
/// a signal whose own expression doesn't comply is extracted into a named wire
/// instead of being embedded. This sidesteps operator-precedence and
/// width-context surprises in the generated Verilog without ever printing
/// parentheses.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Nesting {
    /// Any expression may be embedded here.
    All,
    /// Only selections, bare signal names and constants may be embedded here.
    SelectionsSignalsAndConstants,
    /// Only bare signal names and constants may be embedded here.
    SignalsAndConstants,
}

/// Returns whether `signal`'s own expression can be embedded at a use site with
/// the given nesting.
pub(crate) fn complies_with<'a>(signal: SignalRef<'a>, nesting: Nesting) -> bool {
    match signal {
        SignalRef::Bit(signal) => match signal.data {
            BitSignalData::Constant { .. } => true,
            BitSignalData::IndexSelection { .. } | BitSignalData::ConstantIndexSelection { .. } => {
                nesting != Nesting::SignalsAndConstants
            }
            BitSignalData::Connector { ref connected } => match connected.get() {
                Some(connected) => complies_with(SignalRef::Bit(connected), nesting),
                None => false,
            },
            _ => nesting == Nesting::All,
        },
        SignalRef::Vector(signal) => match signal.data {
            VectorSignalData::Constant { .. } => true,
            VectorSignalData::RangeSelection { .. }
            | VectorSignalData::MemorySelection { .. }
            | VectorSignalData::MemoryConstantSelection { .. } => {
                nesting != Nesting::SignalsAndConstants
            }
            VectorSignalData::FromBit { bit } => complies_with(SignalRef::Bit(bit), nesting),
            VectorSignalData::Connector { ref connected, .. } => match connected.get() {
                Some(connected) => complies_with(SignalRef::Vector(connected), nesting),
                None => false,
            },
            _ => nesting == Nesting::All,
        },
    }
}

/// The sink an implementation expression is printed into.
///
/// One expression printer per signal kind (see
/// [`print_implementation_expression`]) serves both the usage analysis and the
/// actual output: the analysis passes a writer that discards the text and only
/// records the nested signal usages, the emission passes a writer that prints
/// names or recurses. This way the two phases cannot accidentally differ.
///
/// [`print_implementation_expression`]: ./fn.print_implementation_expression.html
pub(crate) trait ExpressionWriter<'a> {
    fn write_str(&mut self, s: &str) -> Result<(), GenerateError>;
    fn write_signal(&mut self, signal: SignalRef<'a>, nesting: Nesting)
        -> Result<(), GenerateError>;
    fn write_memory(&mut self, memory: &'a Memory<'a>) -> Result<(), GenerateError>;
}

/// Prints the expression that implements `signal` in terms of its operands.
///
/// Fails with [`GenerateError::SynthesisNotSupported`] for signal shapes that
/// have no implementation expression (registers and input pins); those must
/// always have been resolved into named declarations before emission reaches
/// them.
///
/// [`GenerateError::SynthesisNotSupported`]: ./enum.GenerateError.html#variant.SynthesisNotSupported
pub(crate) fn print_implementation_expression<'a>(
    signal: SignalRef<'a>,
    out: &mut dyn ExpressionWriter<'a>,
) -> Result<(), GenerateError> {
    match signal {
        SignalRef::Bit(signal) => match signal.data {
            BitSignalData::Constant { value } => out.write_str(if value { "1'b1" } else { "1'b0" }),
            BitSignalData::InputPin { .. } | BitSignalData::Register { .. } => {
                Err(no_implementation_expression(signal.as_item()))
            }
            BitSignalData::Op { op, lhs, rhs } => {
                out.write_signal(SignalRef::Bit(lhs), Nesting::SelectionsSignalsAndConstants)?;
                out.write_str(&format!(" {} ", op.symbol()))?;
                out.write_signal(SignalRef::Bit(rhs), Nesting::SelectionsSignalsAndConstants)
            }
            BitSignalData::Not { operand } => {
                out.write_str("~")?;
                out.write_signal(SignalRef::Bit(operand), Nesting::SelectionsSignalsAndConstants)
            }
            BitSignalData::Conditional {
                condition,
                on_true,
                on_false,
            } => {
                out.write_signal(
                    SignalRef::Bit(condition),
                    Nesting::SelectionsSignalsAndConstants,
                )?;
                out.write_str(" ? ")?;
                out.write_signal(SignalRef::Bit(on_true), Nesting::SelectionsSignalsAndConstants)?;
                out.write_str(" : ")?;
                out.write_signal(SignalRef::Bit(on_false), Nesting::SelectionsSignalsAndConstants)
            }
            BitSignalData::Comparison { op, lhs, rhs } => {
                out.write_signal(SignalRef::Vector(lhs), Nesting::SelectionsSignalsAndConstants)?;
                out.write_str(&format!(" {} ", op.symbol()))?;
                out.write_signal(SignalRef::Vector(rhs), Nesting::SelectionsSignalsAndConstants)
            }
            BitSignalData::IndexSelection { container, index } => {
                out.write_signal(SignalRef::Vector(container), Nesting::SignalsAndConstants)?;
                out.write_str("[")?;
                out.write_signal(SignalRef::Vector(index), Nesting::SignalsAndConstants)?;
                out.write_str("]")
            }
            BitSignalData::ConstantIndexSelection { container, index } => {
                out.write_signal(SignalRef::Vector(container), Nesting::SignalsAndConstants)?;
                out.write_str(&format!("[{}]", index))
            }
            BitSignalData::Connector { ref connected } => match connected.get() {
                // Invalid nesting is detected through compliance, so the
                // connected signal may be embedded with any nesting here.
                Some(connected) => out.write_signal(SignalRef::Bit(connected), Nesting::All),
                None => Err(no_implementation_expression(signal.as_item())),
            },
        },
        SignalRef::Vector(signal) => match signal.data {
            VectorSignalData::Constant { value } => out.write_str(&value.to_string()),
            VectorSignalData::InputPin { .. } | VectorSignalData::Register { .. } => {
                Err(no_implementation_expression(signal.as_item()))
            }
            VectorSignalData::Op { op, lhs, rhs } => {
                out.write_signal(SignalRef::Vector(lhs), Nesting::SelectionsSignalsAndConstants)?;
                out.write_str(&format!(" {} ", op.symbol()))?;
                out.write_signal(SignalRef::Vector(rhs), Nesting::SelectionsSignalsAndConstants)
            }
            VectorSignalData::Not { operand } => {
                out.write_str("~")?;
                out.write_signal(
                    SignalRef::Vector(operand),
                    Nesting::SelectionsSignalsAndConstants,
                )
            }
            VectorSignalData::Negate { operand } => {
                out.write_str("-")?;
                out.write_signal(
                    SignalRef::Vector(operand),
                    Nesting::SelectionsSignalsAndConstants,
                )
            }
            VectorSignalData::Shift { op, lhs, rhs } => {
                out.write_signal(SignalRef::Vector(lhs), Nesting::SelectionsSignalsAndConstants)?;
                out.write_str(&format!(" {} ", op.symbol()))?;
                out.write_signal(SignalRef::Vector(rhs), Nesting::SelectionsSignalsAndConstants)
            }
            VectorSignalData::Concat { lhs, rhs } => {
                out.write_str("{")?;
                out.write_signal(SignalRef::Vector(lhs), Nesting::SelectionsSignalsAndConstants)?;
                out.write_str(", ")?;
                out.write_signal(SignalRef::Vector(rhs), Nesting::SelectionsSignalsAndConstants)?;
                out.write_str("}")
            }
            VectorSignalData::Repeat { source, count } => {
                out.write_str(&format!("{{{}{{", count))?;
                out.write_signal(SignalRef::Bit(source), Nesting::SignalsAndConstants)?;
                out.write_str("}}")
            }
            VectorSignalData::FromBit { bit } => {
                out.write_signal(SignalRef::Bit(bit), Nesting::SignalsAndConstants)
            }
            VectorSignalData::RangeSelection {
                container,
                from,
                to,
            } => {
                out.write_signal(SignalRef::Vector(container), Nesting::SignalsAndConstants)?;
                out.write_str(&format!("[{}:{}]", from, to))
            }
            VectorSignalData::Conditional {
                condition,
                on_true,
                on_false,
            } => {
                out.write_signal(
                    SignalRef::Bit(condition),
                    Nesting::SelectionsSignalsAndConstants,
                )?;
                out.write_str(" ? ")?;
                out.write_signal(
                    SignalRef::Vector(on_true),
                    Nesting::SelectionsSignalsAndConstants,
                )?;
                out.write_str(" : ")?;
                out.write_signal(
                    SignalRef::Vector(on_false),
                    Nesting::SelectionsSignalsAndConstants,
                )
            }
            VectorSignalData::Connector { ref connected, .. } => match connected.get() {
                Some(connected) => out.write_signal(SignalRef::Vector(connected), Nesting::All),
                None => Err(no_implementation_expression(signal.as_item())),
            },
            VectorSignalData::MemorySelection { memory, index } => {
                out.write_memory(memory)?;
                out.write_str("[")?;
                out.write_signal(SignalRef::Vector(index), Nesting::SignalsAndConstants)?;
                out.write_str("]")
            }
            VectorSignalData::MemoryConstantSelection { memory, index } => {
                out.write_memory(memory)?;
                out.write_str(&format!("[{}]", index))
            }
        },
    }
}

fn no_implementation_expression(item: ItemRef<'_>) -> GenerateError {
    GenerateError::SynthesisNotSupported {
        item: item.description(),
        message: "this kind of signal has no implementation expression".to_string(),
    }
}

/// Phase 2 of the synthesis backend: walks every contribution's used signals and
/// decides which of them must be extracted into named declarations.
///
/// A signal is extracted if the same signal object is reached a second time
/// (shared sub-expressions are declared once and referenced by name, keeping the
/// output linear in the graph size) or if its expression doesn't comply with the
/// nesting of its use site. Connectors are transparent: using a connector is
/// using whatever it forwards to.
pub(crate) struct UsageAnalysis<'n, 'a> {
    analyzed: HashSet<usize>,
    names: &'n mut Names,
    declarations: &'n mut Declarations<'a>,
}

impl<'n, 'a> UsageAnalysis<'n, 'a> {
    pub(crate) fn new(
        names: &'n mut Names,
        declarations: &'n mut Declarations<'a>,
    ) -> UsageAnalysis<'n, 'a> {
        UsageAnalysis {
            analyzed: HashSet::new(),
            names,
            declarations,
        }
    }

    pub(crate) fn consume_signal_usage(
        &mut self,
        signal: SignalRef<'a>,
        nesting: Nesting,
    ) -> Result<(), GenerateError> {
        let signal = signal.resolve_connectors();

        // A signal reached for the second time is used in more than one place
        // and must be declared; it was already analyzed the first time.
        if !self.analyzed.insert(signal.index()) {
            self.declare(signal);
            return Ok(());
        }

        if !complies_with(signal, nesting) {
            self.declare(signal);
        }

        // Recurse into the operands, re-using the expression printer so the
        // analysis cannot diverge from the emitted output. Registers and input
        // pins have no implementation expression and use no other signals.
        match signal {
            SignalRef::Bit(bit_signal) => match bit_signal.data {
                BitSignalData::InputPin { .. } | BitSignalData::Register { .. } => return Ok(()),
                _ => (),
            },
            SignalRef::Vector(vector_signal) => match vector_signal.data {
                VectorSignalData::InputPin { .. } | VectorSignalData::Register { .. } => {
                    return Ok(())
                }
                _ => (),
            },
        }
        let mut fake = FakeExpressionWriter { analysis: self };
        print_implementation_expression(signal, &mut fake)
    }

    fn declare(&mut self, signal: SignalRef<'a>) {
        if !self.declarations.contains(signal.index()) {
            let name = self.names.assign_generated_name(signal.index());
            self.declarations
                .push(signal, name, DeclarationKeyword::Wire, true);
        }
    }
}

struct FakeExpressionWriter<'f, 'n, 'a> {
    analysis: &'f mut UsageAnalysis<'n, 'a>,
}

impl<'f, 'n, 'a> ExpressionWriter<'a> for FakeExpressionWriter<'f, 'n, 'a> {
    fn write_str(&mut self, _s: &str) -> Result<(), GenerateError> {
        Ok(())
    }

    fn write_signal(
        &mut self,
        signal: SignalRef<'a>,
        nesting: Nesting,
    ) -> Result<(), GenerateError> {
        self.analysis.consume_signal_usage(signal, nesting)
    }

    fn write_memory(&mut self, _memory: &'a Memory<'a>) -> Result<(), GenerateError> {
        Ok(())
    }
}

/// The writer used during emission: named signals print their name, everything
/// else recursively prints its implementation expression.
pub(crate) struct RealExpressionWriter<'w, W: io::Write> {
    pub(crate) w: &'w mut CodeWriter<W>,
    pub(crate) names: &'w Names,
}

impl<'w, 'a, W: io::Write> ExpressionWriter<'a> for RealExpressionWriter<'w, W> {
    fn write_str(&mut self, s: &str) -> Result<(), GenerateError> {
        self.w.append(s)?;
        Ok(())
    }

    fn write_signal(
        &mut self,
        signal: SignalRef<'a>,
        _nesting: Nesting,
    ) -> Result<(), GenerateError> {
        // The nesting cannot be taken into account here; it already had its
        // effect when the usage analysis decided which signals to extract.
        match self.names.name_of(signal.index()) {
            Some(name) => {
                self.w.append(name)?;
                Ok(())
            }
            None => print_implementation_expression(signal, self),
        }
    }

    fn write_memory(&mut self, memory: &'a Memory<'a>) -> Result<(), GenerateError> {
        match self.names.name_of(memory.as_item().index()) {
            Some(name) => {
                self.w.append(name)?;
                Ok(())
            }
            None => Err(GenerateError::SynthesisNotSupported {
                item: memory.as_item().description(),
                message: "no name has been assigned to this memory".to_string(),
            }),
        }
    }
}

/// Prints the expression to use for `signal` at a point where it gets used:
/// its name if it has one, its implementation expression otherwise.
pub(crate) fn print_signal<'a, W: io::Write>(
    w: &mut CodeWriter<W>,
    names: &Names,
    signal: SignalRef<'a>,
) -> Result<(), GenerateError> {
    let mut real = RealExpressionWriter { w, names };
    real.write_signal(signal, Nesting::All)
}
