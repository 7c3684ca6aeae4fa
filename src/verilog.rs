//! Verilog code generation.
//!
//! [`generate`] turns a finalized [`Design`] into the text of one synthesizable
//! Verilog module, plus one auxiliary memory initialization file per memory
//! (written through an [`AuxiliaryFileFactory`]). [`generate_files`] is the
//! file-system convenience wrapper around it.
//!
//! Generation runs in three phases over the design graph:
//!
//! 1. **Preparation**: every item's contribution may claim fixed names (port
//!    names), request generated names, register signal declarations (registers
//!    become `reg`, input pins are named but not declared) and produce
//!    auxiliary files.
//! 2. **Usage analysis**: every contribution reports the signals it consumes;
//!    the analysis recursively walks their definitions and extracts a signal
//!    into a named `wire` with a generated `assign` when the same signal object
//!    is used in more than one place, or when its expression doesn't comply
//!    with the nesting of a use site. Everything else is inlined at its single
//!    use site.
//! 3. **Emission**: the module header, ports, declarations, generated
//!    assignments and per-item implementation blocks are printed, honoring the
//!    phase 2 decisions.
//!
//! Given the same finalized design, generation is deterministic: two runs
//! produce byte-identical output.
//!
//! # Examples
//!
//! ```
//! use ripple::*;
//!
//! let design = Design::new();
//!
//! let a = design.bit_input_pin("a");
//! let b = design.bit_input_pin("b");
//! design.bit_output_pin("o", a.signal & b.signal);
//!
//! let mut output = Vec::new();
//! let auxiliary_files = verilog::InMemoryAuxiliaryFileFactory::new();
//! verilog::generate(&design, "and_gate", &mut output, &auxiliary_files).unwrap();
//! assert!(String::from_utf8(output).unwrap().contains("assign o = a & b;"));
//! ```
//!
//! [`generate`]: ./fn.generate.html
//! [`generate_files`]: ./fn.generate_files.html
//! [`Design`]: ../struct.Design.html
//! [`AuxiliaryFileFactory`]: ./trait.AuxiliaryFileFactory.html

mod contribution;
mod expression;
mod names;

use contribution::{Contribution, PreparationContext};
use expression::{print_implementation_expression, RealExpressionWriter, UsageAnalysis};
use names::{AbsoluteNames, Names};

use crate::code_writer::{self, CodeWriter};
use crate::graph::{Design, SignalRef, ValidationError};

use thiserror::Error;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The error returned when Verilog generation fails.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Writing the module text or an auxiliary file failed.
    #[error("I/O error during Verilog generation: {0}")]
    Io(#[from] io::Error),
    /// Internal writer misuse; indicates a bug in the generator.
    #[error("unbalanced indentation in the generated code")]
    IndentUnderflow,
    /// The design failed validation when generation finalized its construction.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A fixed name (usually a port name) was requested but is already taken by
    /// another fixed or generated name.
    #[error("fixed name is already used: {name}")]
    FixedNameCollision {
        /// The colliding name.
        name: String,
    },
    /// Emission reached an item or signal shape that has no valid textual
    /// representation at that point.
    #[error("cannot synthesize {item}: {message}")]
    SynthesisNotSupported {
        /// Description of the offending item.
        item: String,
        /// Why the item cannot be synthesized.
        message: String,
    },
}

impl From<code_writer::Error> for GenerateError {
    fn from(error: code_writer::Error) -> GenerateError {
        match error {
            code_writer::Error::Io(error) => GenerateError::Io(error),
            code_writer::Error::IndentUnderflow => GenerateError::IndentUnderflow,
        }
    }
}

/// Distinguishes how a signal gets declared: as a wire, a reg, or not at all.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclarationKeyword {
    None,
    Wire,
    Reg,
}

impl DeclarationKeyword {
    fn keyword(&self) -> Option<&'static str> {
        match self {
            DeclarationKeyword::None => None,
            DeclarationKeyword::Wire => Some("wire"),
            DeclarationKeyword::Reg => Some("reg"),
        }
    }
}

pub(crate) struct SignalDeclaration<'a> {
    pub(crate) signal: SignalRef<'a>,
    pub(crate) name: String,
    pub(crate) keyword: DeclarationKeyword,
    pub(crate) assignment: bool,
}

/// The signal declaration records collected by phases 1 and 2, kept in
/// insertion order so that repeated runs emit identical output.
pub(crate) struct Declarations<'a> {
    records: Vec<SignalDeclaration<'a>>,
    by_signal: HashMap<usize, usize>,
}

impl<'a> Declarations<'a> {
    fn new() -> Declarations<'a> {
        Declarations {
            records: Vec::new(),
            by_signal: HashMap::new(),
        }
    }

    pub(crate) fn contains(&self, signal_index: usize) -> bool {
        self.by_signal.contains_key(&signal_index)
    }

    pub(crate) fn push(
        &mut self,
        signal: SignalRef<'a>,
        name: String,
        keyword: DeclarationKeyword,
        assignment: bool,
    ) {
        let record = SignalDeclaration {
            signal,
            name,
            keyword,
            assignment,
        };
        // A re-declaration replaces the old record, like the name table, so a
        // signal never gets two declaration lines.
        match self.by_signal.get(&signal.index()) {
            Some(&index) => self.records[index] = record,
            None => {
                self.by_signal.insert(signal.index(), self.records.len());
                self.records.push(record);
            }
        }
    }

    fn records(&self) -> &[SignalDeclaration<'a>] {
        &self.records
    }
}

/// A sink for the auxiliary files that accompany the generated module, such as
/// memory initialization files loaded with `$readmemh`.
pub trait AuxiliaryFileFactory {
    /// Creates the auxiliary file `filename` with the given contents.
    fn create(&self, filename: &str, contents: &str) -> io::Result<()>;
}

/// An [`AuxiliaryFileFactory`] that writes files into a directory.
///
/// [`AuxiliaryFileFactory`]: ./trait.AuxiliaryFileFactory.html
pub struct DirectoryAuxiliaryFileFactory {
    directory: PathBuf,
}

impl DirectoryAuxiliaryFileFactory {
    /// Creates a factory that writes into `directory`, which must already exist.
    pub fn new(directory: impl Into<PathBuf>) -> DirectoryAuxiliaryFileFactory {
        DirectoryAuxiliaryFileFactory {
            directory: directory.into(),
        }
    }
}

impl AuxiliaryFileFactory for DirectoryAuxiliaryFileFactory {
    fn create(&self, filename: &str, contents: &str) -> io::Result<()> {
        fs::write(self.directory.join(filename), contents)
    }
}

/// An [`AuxiliaryFileFactory`] that keeps the files in memory, mainly for
/// tests.
///
/// [`AuxiliaryFileFactory`]: ./trait.AuxiliaryFileFactory.html
#[derive(Default)]
pub struct InMemoryAuxiliaryFileFactory {
    files: RefCell<HashMap<String, String>>,
}

impl InMemoryAuxiliaryFileFactory {
    /// Creates an empty factory.
    pub fn new() -> InMemoryAuxiliaryFileFactory {
        InMemoryAuxiliaryFileFactory::default()
    }

    /// Returns the contents of the file `filename`, if it has been created.
    pub fn contents(&self, filename: &str) -> Option<String> {
        self.files.borrow().get(filename).cloned()
    }

    /// Returns the names of all created files, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl AuxiliaryFileFactory for InMemoryAuxiliaryFileFactory {
    fn create(&self, filename: &str, contents: &str) -> io::Result<()> {
        self.files
            .borrow_mut()
            .insert(filename.to_string(), contents.to_string());
        Ok(())
    }
}

/// Generates a Verilog module for the design, writing the module text to `w`
/// and auxiliary files through `auxiliary_files`.
///
/// Finalizes the design's construction first if that hasn't happened yet.
pub fn generate<'a, W: Write>(
    design: &'a Design<'a>,
    toplevel_module_name: &str,
    w: W,
    auxiliary_files: &dyn AuxiliaryFileFactory,
) -> Result<(), GenerateError> {
    design.finalize_construction()?;
    let items = design.items();
    let contributions: Vec<Contribution<'a>> = items
        .iter()
        .map(|item| Contribution::of_item(*item))
        .collect();

    let mut names = Names::new(AbsoluteNames::new(&items));
    let mut declarations = Declarations::new();

    // Phase 1: preparation. This also collects the signals that must be
    // declared regardless of usage, and produces the auxiliary files.
    {
        let mut context = PreparationContext {
            names: &mut names,
            declarations: &mut declarations,
            auxiliary_files,
        };
        for contribution in &contributions {
            contribution.prepare_synthesis(&mut context)?;
        }
    }

    // Phase 2: usage analysis. Signals used in more than one place, or in a
    // position their expression doesn't comply with, get declared too.
    {
        let mut analysis = UsageAnalysis::new(&mut names, &mut declarations);
        for contribution in &contributions {
            contribution.analyze_signal_usage(&mut analysis)?;
        }
    }

    let mut ports = Vec::new();
    for contribution in &contributions {
        contribution.analyze_toplevel_ports(&mut ports);
    }

    // Phase 3: emission.
    let mut w = CodeWriter::new(w);
    w.append_line("`default_nettype none")?;
    w.append_line("`timescale 1ns / 1ps")?;
    w.append_newline()?;
    w.append_line(&format!("module {}(", toplevel_module_name))?;
    if !ports.is_empty() {
        w.indent();
        for (i, port) in ports.iter().enumerate() {
            if i > 0 {
                w.append(",")?;
                w.append_newline()?;
            }
            w.append_indent()?;
            w.append(&port.name)?;
        }
        w.append_newline()?;
        w.unindent()?;
    }
    w.append_line(");")?;
    w.append_newline()?;
    if !ports.is_empty() {
        for port in &ports {
            match port.width {
                Some(width) => w.append_line(&format!(
                    "{}[{}:0] {};",
                    port.direction,
                    width - 1,
                    port.name
                ))?,
                None => w.append_line(&format!("{} {};", port.direction, port.name))?,
            }
        }
        w.append_newline()?;
    }
    w.append_newline()?;
    for record in declarations.records() {
        if let Some(keyword) = record.keyword.keyword() {
            match record.signal.vector_width() {
                Some(width) => {
                    w.append_line(&format!("{}[{}:0] {};", keyword, width - 1, record.name))?
                }
                None => w.append_line(&format!("{} {};", keyword, record.name))?,
            }
        }
    }
    w.append_newline()?;
    for contribution in &contributions {
        contribution.print_declarations(&mut w, &names)?;
    }
    w.append_newline()?;
    for record in declarations.records() {
        if record.assignment {
            w.append_indent()?;
            w.append(&format!("assign {} = ", record.name))?;
            let mut real = RealExpressionWriter {
                w: &mut w,
                names: &names,
            };
            print_implementation_expression(record.signal, &mut real)?;
            w.append(";")?;
            w.append_newline()?;
        }
    }
    w.append_newline()?;
    for contribution in &contributions {
        contribution.print_implementation(&mut w, &names)?;
    }
    w.append_newline()?;
    w.append_line("endmodule")?;
    w.append_newline()?;
    Ok(())
}

/// Generates `<name>.v` plus all auxiliary files into `output_directory`,
/// creating the directory first if needed.
pub fn generate_files<'a>(
    design: &'a Design<'a>,
    name: &str,
    output_directory: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let output_directory = output_directory.as_ref();
    fs::create_dir_all(output_directory)?;
    let auxiliary_files = DirectoryAuxiliaryFileFactory::new(output_directory);
    let file = fs::File::create(output_directory.join(format!("{}.v", name)))?;
    let mut writer = io::BufWriter::new(file);
    generate(design, name, &mut writer, &auxiliary_files)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_to_string<'a>(design: &'a Design<'a>, name: &str) -> String {
        let mut output = Vec::new();
        let auxiliary_files = InMemoryAuxiliaryFileFactory::new();
        generate(design, name, &mut output, &auxiliary_files).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn empty_design_produces_a_module_skeleton() {
        let design = Design::new();

        let output = generate_to_string(&design, "empty");
        assert_eq!(
            output,
            "`default_nettype none\n`timescale 1ns / 1ps\n\nmodule empty(\n);\n\n\n\n\n\n\nendmodule\n\n"
        );
    }

    #[test]
    fn ports_are_declared_in_registration_order() {
        let design = Design::new();

        let a = design.bit_input_pin("a");
        let b = design.vector_input_pin("b", 8);
        design.vector_output_pin("o", b.signal & b.signal);
        let _ = a;

        let output = generate_to_string(&design, "ports");
        assert!(output.contains("module ports(\n\ta,\n\tb,\n\to\n);\n"));
        assert!(output.contains("input a;\n"));
        assert!(output.contains("input[7:0] b;\n"));
        assert!(output.contains("output[7:0] o;\n"));
    }

    #[test]
    fn memory_contents_are_written_as_an_auxiliary_file() {
        let design = Design::new();

        let table = design.memory(4, 8);
        table.set_name("table");
        for row in 0..4 {
            table.set_row(row, crate::Vector::of(8, row as u64 + 1));
        }
        let index = design.vector_input_pin("index", 2);
        design.vector_output_pin("entry", table.select(index.signal));

        let mut output = Vec::new();
        let auxiliary_files = InMemoryAuxiliaryFileFactory::new();
        generate(&design, "rom", &mut output, &auxiliary_files).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_eq!(auxiliary_files.file_names(), vec!["table.mif"]);
        assert_eq!(
            auxiliary_files.contents("table.mif").unwrap(),
            "01\n02\n03\n04\n"
        );
        assert!(output.contains("reg [7:0] table [3:0];\n"));
        assert!(output.contains("$readmemh(\"table.mif\", table, 0, 3);"));
        assert!(output.contains("assign entry = table[index];"));
    }

    #[test]
    fn selection_from_a_constant_extracts_the_constant() {
        let design = Design::new();

        let constant = design.lit(0xa5, 8);
        design.bit_output_pin("o", constant.bit(2));

        let output = generate_to_string(&design, "const_select");
        assert!(output.contains("wire[7:0] o_container;\n"));
        assert!(output.contains("assign o_container = 8'ha5;\n"));
        assert!(output.contains("assign o = o_container[2];\n"));
    }

    #[test]
    fn validation_failure_aborts_generation() {
        let design = Design::new();

        let connector = design.bit_connector();
        connector.set_name("dangling");

        let mut output = Vec::new();
        let auxiliary_files = InMemoryAuxiliaryFileFactory::new();
        let error = generate(&design, "invalid", &mut output, &auxiliary_files).unwrap_err();
        assert!(matches!(error, GenerateError::Validation(_)));
    }
}
