use ripple::verilog::{generate, GenerateError, InMemoryAuxiliaryFileFactory};
use ripple::*;

fn generate_to_string<'a>(design: &'a Design<'a>, name: &str) -> String {
    let mut output = Vec::new();
    let auxiliary_files = InMemoryAuxiliaryFileFactory::new();
    generate(design, name, &mut output, &auxiliary_files).unwrap();
    String::from_utf8(output).unwrap()
}

#[test]
fn counter_end_to_end() {
    let design = Design::new();

    let clk = design.bit_input_pin("clk");
    let clock = design.clock(clk.signal);
    let counter = design.vector_register(4);
    counter.set_name("counter");
    counter.set_initial_value(Vector::of(4, 0));
    let block = clock.clocked_block();
    block
        .statements()
        .assign(counter, counter.signal + design.lit(1, 4));
    let top_bit = counter.signal.bit(3);
    design.bit_output_pin("out", top_bit);
    let stepper = design.clock_stepper(clock, 2);

    // Simulate 32 ticks (16 cycles of period 2). The output must toggle
    // low-to-high exactly once in that window, when the counter reaches 8.
    design.prepare_simulation().unwrap();
    assert!(!top_bit.value());
    let mut rising_edges = 0;
    let mut previous = top_bit.value();
    for _ in 0..16 {
        stepper.step(1);
        let current = top_bit.value();
        if current && !previous {
            rising_edges += 1;
        }
        previous = current;
    }
    assert_eq!(rising_edges, 1);
    assert_eq!(design.simulation_time(), 32);
    assert_eq!(counter.signal.value(), Vector::of(4, 0));

    // Synthesize the same design: exactly one reg declaration for the counter,
    // and the top-bit selection is inlined, not extracted into a wire.
    let output = generate_to_string(&design, "counter");
    assert_eq!(
        output,
        "`default_nettype none\n\
         `timescale 1ns / 1ps\n\
         \n\
         module counter(\n\
         \tclk,\n\
         \tout\n\
         );\n\
         \n\
         input clk;\n\
         output out;\n\
         \n\
         \n\
         reg[3:0] counter;\n\
         \n\
         \n\
         \n\
         initial begin\n\
         \tcounter <= 4'h0;\n\
         end\n\
         always @(posedge clk) begin\n\
         \tcounter <= counter + 4'h1;\n\
         end\n\
         assign out = counter[3];\n\
         \n\
         endmodule\n\
         \n"
    );
    assert!(!output.contains("wire"));
}

#[test]
fn shared_signals_are_declared_once_and_referenced_by_name() {
    let design = Design::new();

    let a = design.bit_input_pin("a");
    let b = design.bit_input_pin("b");
    let c = design.bit_input_pin("c");
    let d = design.bit_input_pin("d");
    let shared = a.signal & b.signal;
    design.bit_output_pin("out1", shared | c.signal);
    design.bit_output_pin("out2", shared ^ d.signal);

    let output = generate_to_string(&design, "dedup");

    // The shared sub-expression appears exactly once, as the defining
    // assignment of a declared wire; both consumers use the wire's name.
    assert_eq!(output.matches("a & b").count(), 1);
    assert!(output.contains("wire out2_xorL;\n"));
    assert!(output.contains("assign out2_xorL = a & b;\n"));
    assert!(output.contains("assign out1 = out2_xorL | c;\n"));
    assert!(output.contains("assign out2 = out2_xorL ^ d;\n"));
}

#[test]
fn generation_is_deterministic() {
    fn build_design<'a>(design: &'a Design<'a>) {
        let clk = design.bit_input_pin("clk");
        let clock = design.clock(clk.signal);
        let mode = design.bit_input_pin("mode");
        let value = design.vector_input_pin("value", 8);

        let table = design.memory(4, 8);
        table.set_name("table");
        for row in 0..4 {
            table.set_row(row, Vector::of(8, 17 * (row as u64 + 1)));
        }

        let accumulator = design.vector_register(8);
        accumulator.set_name("accumulator");
        accumulator.set_initial_value(Vector::of(8, 0));
        let address = accumulator.signal.bits(1, 0);
        let loaded = table.select(address);
        let next = mode
            .signal
            .mux(accumulator.signal + value.signal, loaded);

        let block = clock.clocked_block();
        let when = block.statements().when(accumulator.signal.lt(value.signal));
        when.then_branch().assign(accumulator, next);

        design.vector_output_pin("result", accumulator.signal);
        design.bit_output_pin("wrapped", accumulator.signal.eq(design.lit(0, 8)));
    }

    let design_a = Design::new();
    build_design(&design_a);
    let mut output_a = Vec::new();
    let files_a = InMemoryAuxiliaryFileFactory::new();
    generate(&design_a, "alu", &mut output_a, &files_a).unwrap();

    // A second run over the same finalized design is byte-identical.
    let mut output_b = Vec::new();
    let files_b = InMemoryAuxiliaryFileFactory::new();
    generate(&design_a, "alu", &mut output_b, &files_b).unwrap();
    assert_eq!(output_a, output_b);
    assert_eq!(files_a.file_names(), files_b.file_names());
    for name in files_a.file_names() {
        assert_eq!(files_a.contents(&name), files_b.contents(&name));
    }

    // And so is a run over a freshly built copy of the same design.
    let design_c = Design::new();
    build_design(&design_c);
    let mut output_c = Vec::new();
    generate(&design_c, "alu", &mut output_c, &InMemoryAuxiliaryFileFactory::new()).unwrap();
    assert_eq!(output_a, output_c);
}

#[test]
fn generated_names_are_disambiguated() {
    let design = Design::new();

    let clk = design.bit_input_pin("clk");
    let clock = design.clock(clk.signal);
    let a = design.bit_register();
    let b = design.bit_register();
    let block = clock.clocked_block();
    block.statements().assign_bit_value(a, true);
    block.statements().assign_bit_value(b, false);

    let output = generate_to_string(&design, "regs");
    assert!(output.contains("reg register;\n"));
    assert!(output.contains("reg register__1;\n"));
}

#[test]
fn generated_names_never_collide_with_fixed_names() {
    let design = Design::new();

    // The input pin takes the fixed name "register"; the two unnamed registers
    // get numbered variants past it.
    let pin = design.bit_input_pin("register");
    let clock = design.clock(pin.signal);
    let a = design.bit_register();
    let b = design.bit_register();
    let block = clock.clocked_block();
    block.statements().assign_bit_value(a, true);
    block.statements().assign_bit_value(b, false);

    let output = generate_to_string(&design, "collide");
    assert!(output.contains("input register;\n"));
    assert!(output.contains("reg register__1;\n"));
    assert!(output.contains("reg register__2;\n"));
}

#[test]
fn fixed_name_collision_is_an_error() {
    let design = Design::new();

    let table = design.memory(2, 4);
    table.set_name("foo");
    let index = design.vector_input_pin("i", 1);
    design.vector_output_pin("foo", table.select(index.signal));

    let mut output = Vec::new();
    let error = generate(
        &design,
        "collision",
        &mut output,
        &InMemoryAuxiliaryFileFactory::new(),
    )
    .unwrap_err();
    assert!(matches!(error, GenerateError::FixedNameCollision { name } if name == "foo"));
}

#[test]
fn validation_reports_all_problems_at_once() {
    let design = Design::new();

    let first = design.bit_connector();
    first.set_name("first");
    let second = design.vector_connector(4);
    second.set_name("second");
    let third = design.bit_register();
    third.set_name("third");

    let error = design.finalize_construction().unwrap_err();
    assert_eq!(error.problems.len(), 3);
    assert_eq!(error.problems[0].item, "first");
    assert_eq!(error.problems[0].message, "no signal connected");
    assert_eq!(error.problems[1].item, "second");
    assert_eq!(error.problems[1].message, "no signal connected");
    assert_eq!(error.problems[2].item, "third");
    assert!(error.problems[2].message.contains("no clocked block assigns"));
}

#[test]
fn connectors_are_transparent_to_synthesis() {
    let design = Design::new();

    let a = design.bit_input_pin("a");
    let b = design.bit_input_pin("b");
    let feedback = design.bit_connector();
    let gated = feedback.signal & b.signal;
    design.bit_output_pin("o", gated);
    feedback.set_connected(a.signal);

    let output = generate_to_string(&design, "connectors");

    // Usage of the connector is usage of the connected signal; no extra wire
    // appears for the indirection.
    assert!(output.contains("assign o = a & b;\n"));
    assert!(!output.contains("wire"));
}

#[test]
fn when_statements_emit_if_blocks() {
    let design = Design::new();

    let clk = design.bit_input_pin("clk");
    let enable = design.bit_input_pin("enable");
    let clock = design.clock(clk.signal);
    let counter = design.vector_register(4);
    counter.set_name("counter");
    let block = clock.clocked_block();
    let when = block.statements().when(enable.signal);
    when.then_branch()
        .assign(counter, counter.signal + design.lit(1, 4));
    when.otherwise_branch().assign_value(counter, Vector::of(4, 0));

    let output = generate_to_string(&design, "gated");
    assert!(output.contains(
        "always @(posedge clk) begin\n\
         \tif (enable) begin\n\
         \t\tcounter <= counter + 4'h1;\n\
         \tend else begin\n\
         \t\tcounter <= 4'h0;\n\
         \tend\n\
         end\n"
    ));
}

#[test]
fn elseless_when_statements_omit_the_else_block() {
    let design = Design::new();

    let clk = design.bit_input_pin("clk");
    let enable = design.bit_input_pin("enable");
    let clock = design.clock(clk.signal);
    let flag = design.bit_register();
    flag.set_name("flag");
    let block = clock.clocked_block();
    let when = block.statements().when(enable.signal);
    when.then_branch().assign_bit_value(flag, true);

    let output = generate_to_string(&design, "latch");
    assert!(output.contains(
        "\tif (enable) begin\n\
         \t\tflag <= 1'b1;\n\
         \tend\n"
    ));
    assert!(!output.contains("else"));
}

#[test]
fn generate_files_writes_the_module_and_auxiliary_files() {
    let design = Design::new();

    let table = design.memory(2, 8);
    table.set_name("table");
    table.set_row(0, Vector::of(8, 0xab));
    table.set_row(1, Vector::of(8, 0xcd));
    let index = design.vector_input_pin("index", 1);
    design.vector_output_pin("entry", table.select(index.signal));

    let directory = std::env::temp_dir().join("ripple_generate_files_test");
    let _ = std::fs::remove_dir_all(&directory);
    verilog::generate_files(&design, "rom", &directory).unwrap();

    let module = std::fs::read_to_string(directory.join("rom.v")).unwrap();
    assert!(module.contains("module rom("));
    assert!(module.contains("$readmemh(\"table.mif\", table, 0, 1);"));
    let mif = std::fs::read_to_string(directory.join("table.mif")).unwrap();
    assert_eq!(mif, "ab\ncd\n");
    std::fs::remove_dir_all(&directory).unwrap();
}
