use super::bit_signal::*;
use super::clock::*;
use super::item::*;
use super::memory::*;
use super::pin::*;
use super::procedural::*;
use super::register::*;
use super::validation::*;
use super::vector_signal::*;
use crate::sim::{ClockStepper, EventQueue, IntervalItem, SimulationTimeLimit};

use typed_arena::Arena;

use std::cell::{Cell, RefCell};

/// The owner of a design graph.
///
/// A `Design` owns every node of the graph through per-type arenas and keeps an
/// ordered, append-only list of all registered items. Nodes are created through
/// constructor methods on the `Design` (or on other nodes) and handed out as
/// shared references; the whole graph is released together when the `Design`
/// goes out of scope.
///
/// A `Design` also runs the construction lifecycle (see [`finalize_construction`])
/// and drives the discrete-event simulation of its graph (see
/// [`prepare_simulation`], [`continue_simulation`] and [`fire`]).
///
/// # Examples
///
/// ```
/// use ripple::*;
///
/// let design = Design::new();
///
/// let a = design.bit_input_pin("a");
/// let b = design.bit_input_pin("b");
/// design.bit_output_pin("o", a.signal & b.signal);
/// design.finalize_construction().unwrap();
/// ```
///
/// [`finalize_construction`]: #method.finalize_construction
/// [`prepare_simulation`]: #method.prepare_simulation
/// [`continue_simulation`]: #method.continue_simulation
/// [`fire`]: #method.fire
#[must_use]
pub struct Design<'a> {
    pub(crate) bit_signal_arena: Arena<BitSignal<'a>>,
    pub(crate) vector_signal_arena: Arena<VectorSignal<'a>>,
    pub(crate) bit_register_data_arena: Arena<BitRegisterData<'a>>,
    pub(crate) vector_register_data_arena: Arena<VectorRegisterData<'a>>,
    pub(crate) bit_output_pin_arena: Arena<BitOutputPin<'a>>,
    pub(crate) vector_output_pin_arena: Arena<VectorOutputPin<'a>>,
    pub(crate) clock_arena: Arena<Clock<'a>>,
    pub(crate) clocked_block_arena: Arena<ClockedBlock<'a>>,
    pub(crate) memory_arena: Arena<Memory<'a>>,
    pub(crate) when_arena: Arena<WhenStatement<'a>>,
    pub(crate) interval_arena: Arena<IntervalItem<'a>>,
    pub(crate) time_limit_arena: Arena<SimulationTimeLimit<'a>>,
    pub(crate) clock_stepper_arena: Arena<ClockStepper<'a>>,

    items: RefCell<Vec<ItemRef<'a>>>,
    item_counter: Cell<usize>,
    construction_finalized: Cell<bool>,
    simulation_prepared: Cell<bool>,
    pub(crate) events: EventQueue<'a>,
}

impl<'a> Design<'a> {
    /// Creates a new, empty `Design`.
    pub fn new() -> Design<'a> {
        Design {
            bit_signal_arena: Arena::new(),
            vector_signal_arena: Arena::new(),
            bit_register_data_arena: Arena::new(),
            vector_register_data_arena: Arena::new(),
            bit_output_pin_arena: Arena::new(),
            vector_output_pin_arena: Arena::new(),
            clock_arena: Arena::new(),
            clocked_block_arena: Arena::new(),
            memory_arena: Arena::new(),
            when_arena: Arena::new(),
            interval_arena: Arena::new(),
            time_limit_arena: Arena::new(),
            clock_stepper_arena: Arena::new(),

            items: RefCell::new(Vec::new()),
            item_counter: Cell::new(0),
            construction_finalized: Cell::new(false),
            simulation_prepared: Cell::new(false),
            events: EventQueue::new(),
        }
    }

    pub(crate) fn allocate_item_index(&self) -> usize {
        let index = self.item_counter.get();
        self.item_counter.set(index + 1);
        index
    }

    pub(crate) fn register_item(&'a self, item: ItemRef<'a>) {
        self.items.borrow_mut().push(item);
    }

    /// Returns all items of this design, in registration order.
    pub fn items(&self) -> Vec<ItemRef<'a>> {
        self.items.borrow().clone()
    }

    /// Returns all items whose display name contains `substring`, in registration order.
    pub fn find_items_by_name_substring(&self, substring: &str) -> Vec<ItemRef<'a>> {
        self.items
            .borrow()
            .iter()
            .copied()
            .filter(|item| match item.name() {
                Some(name) => name.contains(substring),
                None => false,
            })
            .collect()
    }

    pub(crate) fn clocked_blocks(&self) -> Vec<&'a ClockedBlock<'a>> {
        self.items
            .borrow()
            .iter()
            .filter_map(|item| match *item {
                ItemRef::ClockedBlock(block) => Some(block),
                _ => None,
            })
            .collect()
    }

    /// Returns whether [`finalize_construction`] has completed for this design.
    ///
    /// [`finalize_construction`]: #method.finalize_construction
    pub fn is_construction_finalized(&self) -> bool {
        self.construction_finalized.get()
    }

    /// Finalizes the construction of this design and validates it.
    ///
    /// The call sequence is: every item's pre-validation finalize hook runs in
    /// registration order; a design-wide validator visits every item and collects
    /// all reported problems; if any problem is an error, the whole aggregate is
    /// returned as a [`ValidationError`]; otherwise every item's post-validation
    /// finalize hook runs in registration order and the structural shape of the
    /// graph is frozen.
    ///
    /// This method is idempotent: a second call is a no-op.
    ///
    /// [`ValidationError`]: ./struct.ValidationError.html
    pub fn finalize_construction(&'a self) -> Result<(), ValidationError> {
        self.finalize_construction_with(|_| {})
    }

    /// Like [`finalize_construction`], but passes the full validation result to
    /// `observer` even when the design is valid.
    ///
    /// [`finalize_construction`]: #method.finalize_construction
    pub fn finalize_construction_with(
        &'a self,
        observer: impl FnOnce(&DesignValidationResult),
    ) -> Result<(), ValidationError> {
        if self.construction_finalized.get() {
            return Ok(());
        }
        let items = self.items();
        for item in &items {
            item.finalize_before_validation();
        }
        let result = DesignValidationResult::collect(&items);
        observer(&result);
        if !result.is_valid() {
            return Err(result.into_error());
        }
        for item in &items {
            item.finalize_after_validation();
        }
        self.construction_finalized.set(true);
        Ok(())
    }

    /// Prepares this design for simulation: finalizes construction if that hasn't
    /// happened yet, then runs every item's simulation-initialization hook once,
    /// in registration order.
    ///
    /// # Panics
    ///
    /// Panics if simulation has already been prepared for this design.
    pub fn prepare_simulation(&'a self) -> Result<(), ValidationError> {
        if self.simulation_prepared.get() {
            panic!("Simulation has already been prepared for this design.");
        }
        self.finalize_construction()?;
        self.simulation_prepared.set(true);
        for item in self.items() {
            item.initialize_simulation();
        }
        Ok(())
    }

    /// Convenience method that prepares the simulation and runs it until the
    /// event queue is empty or [`stop_simulation`] is called.
    ///
    /// [`stop_simulation`]: #method.stop_simulation
    pub fn simulate(&'a self) -> Result<(), ValidationError> {
        self.prepare_simulation()?;
        self.continue_simulation();
        Ok(())
    }

    /// Runs the simulation until the event queue is empty or [`stop_simulation`]
    /// is called from within an event callback.
    ///
    /// # Panics
    ///
    /// Panics if simulation has not been prepared for this design.
    ///
    /// [`stop_simulation`]: #method.stop_simulation
    pub fn continue_simulation(&self) {
        self.need_simulation();
        self.events.run();
    }

    /// Requests the running simulation to stop. The request is checked between
    /// delta-cycle batches, never inside one.
    ///
    /// # Panics
    ///
    /// Panics if simulation has not been prepared for this design.
    pub fn stop_simulation(&self) {
        self.need_simulation();
        self.events.stop();
    }

    /// Schedules `callback` to run `ticks` ticks from the current simulation time.
    ///
    /// # Panics
    ///
    /// Panics if simulation has not been prepared for this design.
    pub fn fire(&'a self, callback: impl FnOnce() + 'a, ticks: u64) {
        self.need_simulation();
        self.events.fire(Box::new(callback), ticks);
    }

    /// Returns the current simulation time in ticks.
    pub fn simulation_time(&self) -> u64 {
        self.events.now()
    }

    fn need_simulation(&self) {
        if !self.simulation_prepared.get() {
            panic!("Simulation has not been prepared for this design.");
        }
    }
}

impl<'a> Default for Design<'a> {
    fn default() -> Design<'a> {
        Design::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_design_has_no_items() {
        let design = Design::new();

        assert!(design.items().is_empty());
    }

    #[test]
    fn items_are_registered_in_creation_order() {
        let design = Design::new();

        let a = design.low();
        a.set_name("a");
        let b = design.high();
        b.set_name("b");

        let items = design.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name().as_deref(), Some("a"));
        assert_eq!(items[1].name().as_deref(), Some("b"));
    }

    #[test]
    fn find_items_by_name_substring_matches_named_items_only() {
        let design = Design::new();

        design.low().set_name("first_counter");
        design.low().set_name("other");
        let _ = design.low();

        assert_eq!(design.find_items_by_name_substring("counter").len(), 1);
        assert_eq!(design.find_items_by_name_substring("o").len(), 2);
    }

    #[test]
    fn finalize_construction_is_idempotent() {
        let design = Design::new();

        let _ = design.low();
        design.finalize_construction().unwrap();
        design.finalize_construction().unwrap();
        assert!(design.is_construction_finalized());
    }

    #[test]
    fn observer_sees_the_validation_result_even_when_valid() {
        let design = Design::new();

        let _ = design.low();
        let mut item_count = 0;
        design
            .finalize_construction_with(|result| item_count = result.item_results().len())
            .unwrap();
        assert_eq!(item_count, 1);
    }

    #[test]
    fn observer_sees_warnings_without_failing_validation() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let block = clock.clocked_block();
        block.set_name("idle");

        let mut warnings = Vec::new();
        design
            .finalize_construction_with(|result| {
                for item in result.item_results() {
                    for warning in item.warnings() {
                        warnings.push((item.item().to_string(), warning.clone()));
                    }
                }
            })
            .unwrap();
        assert_eq!(
            warnings,
            vec![("idle".to_string(), "this clocked block has no effect".to_string())]
        );
    }

    #[test]
    #[should_panic(expected = "Simulation has already been prepared for this design.")]
    fn prepare_simulation_twice_error() {
        let design = Design::new();

        design.prepare_simulation().unwrap();

        // Panic
        let _ = design.prepare_simulation();
    }

    #[test]
    #[should_panic(expected = "Simulation has not been prepared for this design.")]
    fn fire_before_prepare_error() {
        let design = Design::new();

        // Panic
        design.fire(|| {}, 0);
    }

    #[test]
    #[should_panic(expected = "Simulation has not been prepared for this design.")]
    fn continue_before_prepare_error() {
        let design = Design::new();

        // Panic
        design.continue_simulation();
    }

    #[test]
    #[should_panic(expected = "Simulation has not been prepared for this design.")]
    fn stop_before_prepare_error() {
        let design = Design::new();

        // Panic
        design.stop_simulation();
    }
}
