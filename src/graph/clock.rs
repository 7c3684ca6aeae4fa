use super::bit_signal::*;
use super::design::*;
use super::item::*;
use super::procedural::*;

use std::cell::RefCell;
use std::ptr;

/// A clock network, wrapping the bit signal that drives it.
///
/// A synthesized clock network reacts to real edges of its input signal. In
/// simulation, clock edges must be produced by calling [`simulate_edge`] (usually
/// through a [`ClockGenerator`] or [`ClockStepper`]), since the engine doesn't
/// simulate asynchronous signal edges; the input signal is ignored during
/// simulation. This is no restriction for synchronous designs, but it means
/// manually-generated clock signals don't work.
///
/// Per edge, a clock first runs the compute-next-state step of all its clocked
/// blocks, then their update-state step. No signal changes value until every
/// block has sampled its inputs.
///
/// # Examples
///
/// ```
/// use ripple::*;
///
/// let design = Design::new();
///
/// let clk = design.bit_input_pin("clk");
/// let clock = design.clock(clk.signal);
/// let counter = design.vector_register(8);
/// let block = clock.clocked_block();
/// block.statements().assign(counter, counter.signal + design.lit(1, 8));
/// ```
///
/// [`simulate_edge`]: #method.simulate_edge
/// [`ClockGenerator`]: ./sim/struct.ClockGenerator.html
/// [`ClockStepper`]: ./sim/struct.ClockStepper.html
#[must_use]
pub struct Clock<'a> {
    pub(crate) core: ItemCore<'a>,
    input_signal: &'a BitSignal<'a>,
    simulation_targets: RefCell<Vec<&'a ClockedBlock<'a>>>,
}

impl<'a> Design<'a> {
    /// Creates a clock network driven by `input_signal`.
    ///
    /// Don't create two clocks for the same input signal; their blocks would be
    /// simulated independently.
    ///
    /// # Panics
    ///
    /// Panics if `input_signal` belongs to a different design.
    pub fn clock(&'a self, input_signal: &'a BitSignal<'a>) -> &'a Clock<'a> {
        let clock = self.clock_arena.alloc(Clock {
            core: ItemCore::new(self),
            input_signal,
            simulation_targets: RefCell::new(Vec::new()),
        });
        check_same_design(&clock.core, &input_signal.core);
        self.register_item(ItemRef::Clock(clock));
        clock
    }
}

impl<'a> Clock<'a> {
    /// Returns this clock as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::Clock(self)
    }

    /// Returns the bit signal that drives this clock network.
    pub fn input_signal(&self) -> &'a BitSignal<'a> {
        self.input_signal
    }

    /// Sets the display name of this clock.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core.set_name(name);
    }

    /// Creates a [`ClockedBlock`] triggered by this clock.
    ///
    /// [`ClockedBlock`]: ./struct.ClockedBlock.html
    pub fn clocked_block(&'a self) -> &'a ClockedBlock<'a> {
        ClockedBlock::new(self.core.design(), self)
    }

    pub(crate) fn initialize_simulation(&self) {
        let mut targets = self.simulation_targets.borrow_mut();
        targets.clear();
        for block in self.core.design().clocked_blocks() {
            if ptr::eq(block.clock(), self) {
                targets.push(block);
            }
        }
    }

    /// Simulates a single active edge of this clock: computes the next state of
    /// every clocked block, then commits all of them.
    ///
    /// Must only be called after the design's simulation has been prepared.
    pub fn simulate_edge(&self) {
        let targets = self.simulation_targets.borrow();
        for block in targets.iter() {
            block.compute_next_state();
        }
        for block in targets.iter() {
            block.update_state();
        }
    }
}
