use super::expression::{print_signal, Nesting, UsageAnalysis};
use super::names::Names;
use super::{AuxiliaryFileFactory, DeclarationKeyword, Declarations, GenerateError};
use crate::code_writer::CodeWriter;
use crate::graph::*;

use std::io;

/// What phase 1 of the synthesis backend exposes to the contributions: name
/// assignment, signal declaration registration and the auxiliary file sink.
pub(crate) struct PreparationContext<'c, 'a> {
    pub(crate) names: &'c mut Names,
    pub(crate) declarations: &'c mut Declarations<'a>,
    pub(crate) auxiliary_files: &'c dyn AuxiliaryFileFactory,
}

impl<'c, 'a> PreparationContext<'c, 'a> {
    fn declare_signal(
        &mut self,
        signal: SignalRef<'a>,
        keyword: DeclarationKeyword,
        assignment: bool,
    ) -> String {
        let name = self.names.assign_generated_name(signal.index());
        self.declarations
            .push(signal, name.clone(), keyword, assignment);
        name
    }

    fn declare_fixed_name_signal(
        &mut self,
        signal: SignalRef<'a>,
        name: &str,
        keyword: DeclarationKeyword,
        assignment: bool,
    ) -> Result<(), GenerateError> {
        self.names.assign_fixed_name(name, signal.index())?;
        self.declarations
            .push(signal, name.to_string(), keyword, assignment);
        Ok(())
    }
}

/// A top-level port of the generated module.
pub(crate) struct ToplevelPort {
    pub(crate) direction: &'static str,
    pub(crate) name: String,
    pub(crate) width: Option<u32>,
}

/// The synthesis behavior a graph item supplies to participate in code
/// emission. The item set is closed, so the contributions are too; most items
/// contribute nothing.
pub(crate) enum Contribution<'a> {
    Empty,
    /// A selection whose container is a constant. Verilog cannot select from a
    /// literal, and a constant complies with every nesting and would be
    /// embedded, so the container is forced into a named wire here.
    DeclaredConstant { container: &'a VectorSignal<'a> },
    Register { signal: SignalRef<'a> },
    BitInputPin { signal: &'a BitSignal<'a> },
    VectorInputPin { signal: &'a VectorSignal<'a> },
    BitOutputPin { pin: &'a BitOutputPin<'a> },
    VectorOutputPin { pin: &'a VectorOutputPin<'a> },
    Memory { memory: &'a Memory<'a> },
    ClockedBlock { block: &'a ClockedBlock<'a> },
}

fn is_constant(signal: &VectorSignal<'_>) -> bool {
    matches!(signal.data, VectorSignalData::Constant { .. })
}

impl<'a> Contribution<'a> {
    pub(crate) fn of_item(item: ItemRef<'a>) -> Contribution<'a> {
        match item {
            ItemRef::BitSignal(signal) => match signal.data {
                BitSignalData::InputPin { .. } => Contribution::BitInputPin { signal },
                BitSignalData::Register { .. } => Contribution::Register {
                    signal: SignalRef::Bit(signal),
                },
                BitSignalData::IndexSelection { container, .. }
                | BitSignalData::ConstantIndexSelection { container, .. }
                    if is_constant(container) =>
                {
                    Contribution::DeclaredConstant { container }
                }
                _ => Contribution::Empty,
            },
            ItemRef::VectorSignal(signal) => match signal.data {
                VectorSignalData::InputPin { .. } => Contribution::VectorInputPin { signal },
                VectorSignalData::Register { .. } => Contribution::Register {
                    signal: SignalRef::Vector(signal),
                },
                VectorSignalData::RangeSelection { container, .. } if is_constant(container) => {
                    Contribution::DeclaredConstant { container }
                }
                _ => Contribution::Empty,
            },
            ItemRef::BitOutputPin(pin) => Contribution::BitOutputPin { pin },
            ItemRef::VectorOutputPin(pin) => Contribution::VectorOutputPin { pin },
            ItemRef::Memory(memory) => Contribution::Memory { memory },
            ItemRef::ClockedBlock(block) => Contribution::ClockedBlock { block },
            ItemRef::Clock(_)
            | ItemRef::Interval(_)
            | ItemRef::TimeLimit(_)
            | ItemRef::ClockStepper(_) => Contribution::Empty,
        }
    }

    pub(crate) fn prepare_synthesis(
        &self,
        context: &mut PreparationContext<'_, 'a>,
    ) -> Result<(), GenerateError> {
        match *self {
            Contribution::Empty => Ok(()),
            Contribution::DeclaredConstant { container } => {
                context.declare_signal(SignalRef::Vector(container), DeclarationKeyword::Wire, true);
                Ok(())
            }
            Contribution::Register { signal } => {
                context.declare_signal(signal, DeclarationKeyword::Reg, false);
                Ok(())
            }
            Contribution::BitInputPin { signal } => match signal.data {
                BitSignalData::InputPin { ref port_name, .. } => context.declare_fixed_name_signal(
                    SignalRef::Bit(signal),
                    port_name,
                    DeclarationKeyword::None,
                    false,
                ),
                _ => unreachable!(),
            },
            Contribution::VectorInputPin { signal } => match signal.data {
                VectorSignalData::InputPin { ref port_name, .. } => context
                    .declare_fixed_name_signal(
                        SignalRef::Vector(signal),
                        port_name,
                        DeclarationKeyword::None,
                        false,
                    ),
                _ => unreachable!(),
            },
            Contribution::BitOutputPin { pin } => context
                .names
                .assign_fixed_name(pin.port_name(), pin.as_item().index()),
            Contribution::VectorOutputPin { pin } => context
                .names
                .assign_fixed_name(pin.port_name(), pin.as_item().index()),
            Contribution::Memory { memory } => {
                let name = context
                    .names
                    .assign_generated_name(memory.as_item().index());
                context.auxiliary_files.create(
                    &format!("{}.mif", name),
                    &memory.initialization_file_contents(),
                )?;
                Ok(())
            }
            Contribution::ClockedBlock { .. } => Ok(()),
        }
    }

    pub(crate) fn analyze_signal_usage(
        &self,
        consumer: &mut UsageAnalysis<'_, 'a>,
    ) -> Result<(), GenerateError> {
        match *self {
            Contribution::BitOutputPin { pin } => {
                consumer.consume_signal_usage(SignalRef::Bit(pin.source()), Nesting::All)
            }
            Contribution::VectorOutputPin { pin } => {
                consumer.consume_signal_usage(SignalRef::Vector(pin.source()), Nesting::All)
            }
            Contribution::ClockedBlock { block } => {
                consumer.consume_signal_usage(
                    SignalRef::Bit(block.clock().input_signal()),
                    Nesting::All,
                )?;
                analyze_statements(block.statements(), consumer)
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn analyze_toplevel_ports(&self, ports: &mut Vec<ToplevelPort>) {
        match *self {
            Contribution::BitInputPin { signal } => {
                if let BitSignalData::InputPin { ref port_name, .. } = signal.data {
                    ports.push(ToplevelPort {
                        direction: "input",
                        name: port_name.clone(),
                        width: None,
                    });
                }
            }
            Contribution::VectorInputPin { signal } => {
                if let VectorSignalData::InputPin {
                    ref port_name,
                    width,
                    ..
                } = signal.data
                {
                    ports.push(ToplevelPort {
                        direction: "input",
                        name: port_name.clone(),
                        width: Some(width),
                    });
                }
            }
            Contribution::BitOutputPin { pin } => ports.push(ToplevelPort {
                direction: "output",
                name: pin.port_name().to_string(),
                width: None,
            }),
            Contribution::VectorOutputPin { pin } => ports.push(ToplevelPort {
                direction: "output",
                name: pin.port_name().to_string(),
                width: Some(pin.width()),
            }),
            _ => (),
        }
    }

    pub(crate) fn print_declarations<W: io::Write>(
        &self,
        w: &mut CodeWriter<W>,
        names: &Names,
    ) -> Result<(), GenerateError> {
        if let Contribution::Memory { memory } = *self {
            let name = memory_name(memory, names)?;
            w.append_line(&format!(
                "reg [{}:0] {} [{}:0];",
                memory.column_count() - 1,
                name,
                memory.row_count() - 1
            ))?;
        }
        Ok(())
    }

    pub(crate) fn print_implementation<W: io::Write>(
        &self,
        w: &mut CodeWriter<W>,
        names: &Names,
    ) -> Result<(), GenerateError> {
        match *self {
            Contribution::Register { signal } => print_register_initializer(signal, w, names),
            Contribution::BitOutputPin { pin } => {
                w.append_indent()?;
                w.append(&format!("assign {} = ", pin.port_name()))?;
                print_signal(w, names, SignalRef::Bit(pin.source()))?;
                w.append(";")?;
                w.append_newline()?;
                Ok(())
            }
            Contribution::VectorOutputPin { pin } => {
                w.append_indent()?;
                w.append(&format!("assign {} = ", pin.port_name()))?;
                print_signal(w, names, SignalRef::Vector(pin.source()))?;
                w.append(";")?;
                w.append_newline()?;
                Ok(())
            }
            Contribution::Memory { memory } => {
                let name = memory_name(memory, names)?;
                w.append_line("initial begin")?;
                w.indent();
                w.append_line(&format!(
                    "$readmemh(\"{}.mif\", {}, 0, {});",
                    name,
                    name,
                    memory.row_count() - 1
                ))?;
                w.unindent()?;
                w.append_line("end")?;
                Ok(())
            }
            Contribution::ClockedBlock { block } => {
                w.append_indent()?;
                w.append("always @(posedge ")?;
                print_signal(w, names, SignalRef::Bit(block.clock().input_signal()))?;
                w.append(") begin")?;
                w.append_newline()?;
                w.indent();
                print_statements(block.statements(), w, names)?;
                w.unindent()?;
                w.append_line("end")?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn memory_name<'s>(memory: &Memory<'_>, names: &'s Names) -> Result<&'s str, GenerateError> {
    names
        .name_of(memory.as_item().index())
        .ok_or_else(|| GenerateError::SynthesisNotSupported {
            item: memory.as_item().description(),
            message: "no name has been assigned to this memory".to_string(),
        })
}

fn analyze_statements<'a>(
    sequence: &StatementSequence<'a>,
    consumer: &mut UsageAnalysis<'_, 'a>,
) -> Result<(), GenerateError> {
    for statement in sequence.statement_list().iter() {
        match *statement {
            Statement::AssignBit { source, .. } => {
                consumer.consume_signal_usage(SignalRef::Bit(source), Nesting::All)?;
            }
            Statement::AssignVector { source, .. } => {
                consumer.consume_signal_usage(SignalRef::Vector(source), Nesting::All)?;
            }
            Statement::WriteMemory { index, source, .. } => {
                consumer
                    .consume_signal_usage(SignalRef::Vector(index), Nesting::SignalsAndConstants)?;
                consumer.consume_signal_usage(SignalRef::Vector(source), Nesting::All)?;
            }
            Statement::When(when) => {
                consumer.consume_signal_usage(SignalRef::Bit(when.condition()), Nesting::All)?;
                analyze_statements(when.then_branch_ref(), consumer)?;
                analyze_statements(when.otherwise_branch_ref(), consumer)?;
            }
        }
    }
    Ok(())
}

fn print_statements<'a, W: io::Write>(
    sequence: &StatementSequence<'a>,
    w: &mut CodeWriter<W>,
    names: &Names,
) -> Result<(), GenerateError> {
    for statement in sequence.statement_list().iter() {
        match *statement {
            Statement::AssignBit { register, source } => {
                w.append_indent()?;
                print_signal(w, names, SignalRef::Bit(register.signal))?;
                w.append(" <= ")?;
                print_signal(w, names, SignalRef::Bit(source))?;
                w.append(";")?;
                w.append_newline()?;
            }
            Statement::AssignVector { register, source } => {
                w.append_indent()?;
                print_signal(w, names, SignalRef::Vector(register.signal))?;
                w.append(" <= ")?;
                print_signal(w, names, SignalRef::Vector(source))?;
                w.append(";")?;
                w.append_newline()?;
            }
            Statement::WriteMemory {
                memory,
                index,
                source,
            } => {
                w.append_indent()?;
                w.append(memory_name(memory, names)?)?;
                w.append("[")?;
                print_signal(w, names, SignalRef::Vector(index))?;
                w.append("] <= ")?;
                print_signal(w, names, SignalRef::Vector(source))?;
                w.append(";")?;
                w.append_newline()?;
            }
            Statement::When(when) => {
                w.append_indent()?;
                w.append("if (")?;
                print_signal(w, names, SignalRef::Bit(when.condition()))?;
                w.append(") begin")?;
                w.append_newline()?;
                w.indent();
                print_statements(when.then_branch_ref(), w, names)?;
                if !when.otherwise_branch_ref().is_effectively_nop() {
                    w.unindent()?;
                    w.append_line("end else begin")?;
                    w.indent();
                    print_statements(when.otherwise_branch_ref(), w, names)?;
                }
                w.unindent()?;
                w.append_line("end")?;
            }
        }
    }
    Ok(())
}

fn print_register_initializer<'a, W: io::Write>(
    signal: SignalRef<'a>,
    w: &mut CodeWriter<W>,
    names: &Names,
) -> Result<(), GenerateError> {
    let initializer = match signal {
        SignalRef::Bit(bit_signal) => match bit_signal.data {
            BitSignalData::Register { data } => data
                .is_initialized()
                .then(|| (if data.initial_value() { "1'b1" } else { "1'b0" }).to_string()),
            _ => unreachable!(),
        },
        SignalRef::Vector(vector_signal) => match vector_signal.data {
            VectorSignalData::Register { data } => data
                .is_initialized()
                .then(|| data.initial_value().to_string()),
            _ => unreachable!(),
        },
    };
    let initializer = match initializer {
        Some(initializer) => initializer,
        None => return Ok(()),
    };
    w.append_line("initial begin")?;
    w.indent();
    w.append_indent()?;
    print_signal(w, names, signal)?;
    w.append(&format!(" <= {};", initializer))?;
    w.append_newline()?;
    w.unindent()?;
    w.append_line("end")?;
    Ok(())
}
