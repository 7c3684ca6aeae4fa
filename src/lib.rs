//! An embedded hardware description and simulation toolkit.
//!
//! ripple provides an API to describe a [`Design`] composed of signals,
//! registers, memories and clocked blocks, which can then be simulated with a
//! built-in [delta-cycle event engine](sim/index.html) or turned into a
//! [synthesizable Verilog module](verilog/fn.generate.html). No hardware
//! description text is parsed; the design graph is built by calling constructor
//! methods directly, and the same graph drives both backends.
//!
//! The API is designed to catch mistakes at the earliest possible point:
//! structural errors such as width mismatches or combining signals from
//! different designs fail at the constructor call, while graph-wide problems
//! are collected by a validation pass that reports every problem of a design in
//! one run.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! ripple = "0.1"
//! ```
//!
//! # Examples
//!
//! ```rust
//! use ripple::*;
//!
//! // Create a design: a 4-bit counter with a carry-out bit.
//! let design = Design::new();
//!
//! let clk = design.bit_input_pin("clk");
//! let clock = design.clock(clk.signal);
//! let counter = design.vector_register(4);
//! counter.set_name("counter");
//! counter.set_initial_value(Vector::of(4, 0));
//!
//! let block = clock.clocked_block();
//! block.statements().assign(counter, counter.signal + design.lit(1, 4));
//! design.bit_output_pin("carry", counter.signal.eq(design.lit(0xf, 4)));
//!
//! // Simulate 8 clock cycles.
//! let stepper = design.clock_stepper(clock, 2);
//! design.prepare_simulation().unwrap();
//! stepper.step(8);
//! assert_eq!(counter.signal.value(), Vector::of(4, 8));
//!
//! // Generate a Verilog module for the same design.
//! let mut output = Vec::new();
//! let auxiliary_files = verilog::InMemoryAuxiliaryFileFactory::new();
//! verilog::generate(&design, "counter", &mut output, &auxiliary_files).unwrap();
//! ```
//!
//! [`Design`]: ./struct.Design.html

// Must be kept up-to-date with version in Cargo.toml
#![doc(html_root_url = "https://docs.rs/ripple/0.1.0")]

mod code_writer;
mod graph;
pub mod sim;
mod vector;
pub mod verilog;

pub use graph::*;
pub use vector::*;
