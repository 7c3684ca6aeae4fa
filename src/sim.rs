//! Discrete-event simulation: the delta-cycle event queue driven through
//! [`Design`], plus simulation-only helper items ([`IntervalItem`],
//! [`ClockGenerator`], [`SimulationTimeLimit`], [`ClockStepper`]).
//!
//! The engine batches delta-cycles the way HDL simulators do: all events that
//! are scheduled for "now" when the loop comes around are taken off the queue as
//! a whole and processed as a whole. If processing schedules new events for
//! "now", the whole old batch still finishes before the new events are looked
//! at. No batching is done for events scheduled for later: an event scheduled by
//! a second "now"-batch for a future tick may run before an event scheduled by
//! the first "now"-batch for the same tick. Within one tick, events run in the
//! order they were fired, but this is an implementation detail, not a contract.
//!
//! [`Design`]: ../struct.Design.html
//! [`IntervalItem`]: ./struct.IntervalItem.html
//! [`ClockGenerator`]: ./struct.ClockGenerator.html
//! [`SimulationTimeLimit`]: ./struct.SimulationTimeLimit.html
//! [`ClockStepper`]: ./struct.ClockStepper.html

use crate::graph::*;

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub(crate) type EventCallback<'a> = Box<dyn FnOnce() + 'a>;

struct ScheduledEvent<'a> {
    when: u64,
    sequence: u64,
    callback: EventCallback<'a>,
}

impl<'a> PartialEq for ScheduledEvent<'a> {
    fn eq(&self, other: &ScheduledEvent<'a>) -> bool {
        self.when == other.when && self.sequence == other.sequence
    }
}

impl<'a> Eq for ScheduledEvent<'a> {}

impl<'a> PartialOrd for ScheduledEvent<'a> {
    fn partial_cmp(&self, other: &ScheduledEvent<'a>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for ScheduledEvent<'a> {
    // Reversed so that the std max-heap pops the earliest event first. The
    // sequence number keeps events of one tick in fire order.
    fn cmp(&self, other: &ScheduledEvent<'a>) -> Ordering {
        other
            .when
            .cmp(&self.when)
            .then(other.sequence.cmp(&self.sequence))
    }
}

pub(crate) struct EventQueue<'a> {
    queue: RefCell<BinaryHeap<ScheduledEvent<'a>>>,
    next_sequence: Cell<u64>,
    now: Cell<u64>,
    stopped: Cell<bool>,
}

impl<'a> EventQueue<'a> {
    pub(crate) fn new() -> EventQueue<'a> {
        EventQueue {
            queue: RefCell::new(BinaryHeap::new()),
            next_sequence: Cell::new(0),
            now: Cell::new(0),
            stopped: Cell::new(false),
        }
    }

    pub(crate) fn now(&self) -> u64 {
        self.now.get()
    }

    pub(crate) fn fire(&self, callback: EventCallback<'a>, ticks: u64) {
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);
        self.queue.borrow_mut().push(ScheduledEvent {
            when: self.now.get() + ticks,
            sequence,
            callback,
        });
    }

    pub(crate) fn run(&self) {
        self.stopped.set(false);
        let mut batch = Vec::new();
        loop {
            if self.stopped.get() {
                break;
            }
            {
                // The queue borrow must end before the callbacks run, since they
                // may fire new events.
                let mut queue = self.queue.borrow_mut();
                let now = match queue.peek() {
                    Some(event) => event.when,
                    None => break,
                };
                self.now.set(now);
                while queue.peek().map(|event| event.when) == Some(now) {
                    batch.push(queue.pop().unwrap());
                }
            }
            for event in batch.drain(..) {
                (event.callback)();
            }
        }
    }

    pub(crate) fn stop(&self) {
        self.stopped.set(true);
    }
}

/// A simulation-only item that runs an action periodically.
///
/// The first action runs `initial_offset` ticks after the simulation starts
/// (zero by default), then once per `period` ticks, forever. Use a
/// [`SimulationTimeLimit`] or [`Design::stop_simulation`] to end the simulation.
///
/// Interval items contribute nothing to synthesis.
///
/// [`SimulationTimeLimit`]: ./struct.SimulationTimeLimit.html
/// [`Design::stop_simulation`]: ../struct.Design.html#method.stop_simulation
#[must_use]
pub struct IntervalItem<'a> {
    pub(crate) core: ItemCore<'a>,
    period: u64,
    initial_offset: u64,
    action: RefCell<Box<dyn FnMut() + 'a>>,
}

impl<'a> IntervalItem<'a> {
    /// Returns this item as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::Interval(self)
    }

    /// Returns the period of this item, in ticks.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Sets the display name of this item.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core.set_name(name);
    }

    pub(crate) fn initialize_simulation(&'a self) {
        self.core
            .design()
            .fire(move || self.run_action(), self.initial_offset);
    }

    fn run_action(&'a self) {
        (self.action.borrow_mut())();
        self.core.design().fire(move || self.run_action(), self.period);
    }
}

/// A simulation-only item that produces the clock edges of a [`Clock`], one
/// active edge per `period` ticks.
///
/// The engine doesn't simulate asynchronous signal edges, so a synchronous
/// design needs either a clock generator or a [`ClockStepper`] to make its
/// clocks tick.
///
/// [`Clock`]: ../struct.Clock.html
/// [`ClockStepper`]: ./struct.ClockStepper.html
#[derive(Clone, Copy)]
#[must_use]
pub struct ClockGenerator<'a> {
    /// The interval item that produces the edges.
    pub interval_item: &'a IntervalItem<'a>,
}

/// A simulation-only item that stops the simulation once a fixed tick count is
/// reached.
///
/// The stop request is checked between delta-cycle batches, so all events of the
/// batch at the limit tick still run.
#[must_use]
pub struct SimulationTimeLimit<'a> {
    pub(crate) core: ItemCore<'a>,
    ticks: u64,
}

impl<'a> SimulationTimeLimit<'a> {
    /// Returns this item as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::TimeLimit(self)
    }

    /// Returns the tick count at which the simulation stops.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn initialize_simulation(&'a self) {
        let design = self.core.design();
        design.fire(move || design.stop_simulation(), self.ticks);
    }
}

/// A simulation-only item that single-steps a [`Clock`] by whole cycles.
///
/// Each [`step`] schedules the requested number of clock edges, one per clock
/// period, then drives [`Design::continue_simulation`] until they have run and
/// stops. This gives test code cycle-accurate control: between two steps, the
/// whole design is quiescent and can be inspected.
///
/// [`Clock`]: ../struct.Clock.html
/// [`step`]: #method.step
/// [`Design::continue_simulation`]: ../struct.Design.html#method.continue_simulation
#[must_use]
pub struct ClockStepper<'a> {
    pub(crate) core: ItemCore<'a>,
    clock: &'a Clock<'a>,
    clock_period: u64,
}

impl<'a> ClockStepper<'a> {
    /// Returns this item as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::ClockStepper(self)
    }

    /// Returns the clock this stepper drives.
    pub fn clock(&self) -> &'a Clock<'a> {
        self.clock
    }

    /// Returns the clock period of this stepper, in ticks.
    pub fn clock_period(&self) -> u64 {
        self.clock_period
    }

    /// Simulates `cycles` whole clock cycles, advancing the simulation time by
    /// `cycles * clock_period` ticks, then returns.
    ///
    /// # Panics
    ///
    /// Panics if simulation has not been prepared for this design.
    pub fn step(&'a self, cycles: u64) {
        self.schedule(cycles);
        self.core.design().continue_simulation();
    }

    fn schedule(&'a self, remaining: u64) {
        let design = self.core.design();
        if remaining == 0 {
            design.stop_simulation();
        } else {
            design.fire(
                move || {
                    self.clock.simulate_edge();
                    self.schedule(remaining - 1);
                },
                self.clock_period,
            );
        }
    }
}

impl<'a> Design<'a> {
    /// Creates an [`IntervalItem`] that runs `action` once per `period` ticks,
    /// starting at tick zero.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    ///
    /// [`IntervalItem`]: ./sim/struct.IntervalItem.html
    pub fn interval_item(
        &'a self,
        period: u64,
        action: impl FnMut() + 'a,
    ) -> &'a IntervalItem<'a> {
        self.interval_item_with_offset(period, 0, action)
    }

    /// Creates an [`IntervalItem`] whose first action runs `initial_offset`
    /// ticks into the simulation, then once per `period` ticks.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero; such an item would keep the simulation at
    /// one tick forever.
    ///
    /// [`IntervalItem`]: ./sim/struct.IntervalItem.html
    pub fn interval_item_with_offset(
        &'a self,
        period: u64,
        initial_offset: u64,
        action: impl FnMut() + 'a,
    ) -> &'a IntervalItem<'a> {
        if period == 0 {
            panic!("Cannot create an interval item with a period of 0 ticks.");
        }
        let item = self.interval_arena.alloc(IntervalItem {
            core: ItemCore::new(self),
            period,
            initial_offset,
            action: RefCell::new(Box::new(action)),
        });
        self.register_item(ItemRef::Interval(item));
        item
    }

    /// Creates a [`ClockGenerator`] that simulates one active edge of `clock`
    /// per `period` ticks, starting at tick zero.
    ///
    /// # Panics
    ///
    /// Panics if `clock` belongs to a different design.
    ///
    /// [`ClockGenerator`]: ./sim/struct.ClockGenerator.html
    pub fn clock_generator(&'a self, clock: &'a Clock<'a>, period: u64) -> ClockGenerator<'a> {
        if !std::ptr::eq(clock.core.design(), self) {
            panic!("Attempted to combine items from different designs.");
        }
        ClockGenerator {
            interval_item: self.interval_item(period, move || clock.simulate_edge()),
        }
    }

    /// Creates a [`SimulationTimeLimit`] that stops the simulation at tick
    /// `ticks`.
    ///
    /// [`SimulationTimeLimit`]: ./sim/struct.SimulationTimeLimit.html
    pub fn simulation_time_limit(&'a self, ticks: u64) -> &'a SimulationTimeLimit<'a> {
        let item = self.time_limit_arena.alloc(SimulationTimeLimit {
            core: ItemCore::new(self),
            ticks,
        });
        self.register_item(ItemRef::TimeLimit(item));
        item
    }

    /// Creates a [`ClockStepper`] for `clock` with the given clock period.
    ///
    /// # Panics
    ///
    /// Panics if `clock` belongs to a different design.
    ///
    /// [`ClockStepper`]: ./sim/struct.ClockStepper.html
    pub fn clock_stepper(
        &'a self,
        clock: &'a Clock<'a>,
        clock_period: u64,
    ) -> &'a ClockStepper<'a> {
        if !std::ptr::eq(clock.core.design(), self) {
            panic!("Attempted to combine items from different designs.");
        }
        let item = self.clock_stepper_arena.alloc(ClockStepper {
            core: ItemCore::new(self),
            clock,
            clock_period,
        });
        self.register_item(ItemRef::ClockStepper(item));
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn events_run_in_time_order() {
        let log = RefCell::new(Vec::new());
        let design = Design::new();

        design.prepare_simulation().unwrap();
        design.fire(|| log.borrow_mut().push(5), 5);
        design.fire(|| log.borrow_mut().push(0), 0);
        design.fire(|| log.borrow_mut().push(3), 3);
        design.continue_simulation();

        assert_eq!(*log.borrow(), vec![0, 3, 5]);
        assert_eq!(design.simulation_time(), 5);
    }

    #[test]
    fn same_tick_events_run_in_fire_order() {
        let log = RefCell::new(Vec::new());
        let design = Design::new();

        design.prepare_simulation().unwrap();
        let log_ref = &log;
        for i in 0..4 {
            design.fire(move || log_ref.borrow_mut().push(i), 2);
        }
        design.continue_simulation();

        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn events_fired_for_now_wait_for_the_next_batch() {
        let log = RefCell::new(Vec::new());
        let design = Design::new();

        design.prepare_simulation().unwrap();
        let log_ref = &log;
        let design_ref = &design;
        design.fire(
            move || {
                log_ref.borrow_mut().push("first");
                design_ref.fire(move || log_ref.borrow_mut().push("rescheduled"), 0);
            },
            0,
        );
        design.fire(move || log_ref.borrow_mut().push("second"), 0);
        design.continue_simulation();

        // Both original tick-0 events finish before the event one of them fired
        // for the same tick.
        assert_eq!(*log.borrow(), vec!["first", "second", "rescheduled"]);
        assert_eq!(design.simulation_time(), 0);
    }

    #[test]
    fn stop_is_checked_between_batches() {
        let log = RefCell::new(Vec::new());
        let design = Design::new();

        design.prepare_simulation().unwrap();
        let log_ref = &log;
        let design_ref = &design;
        design.fire(
            move || {
                log_ref.borrow_mut().push("stop");
                design_ref.stop_simulation();
            },
            0,
        );
        design.fire(move || log_ref.borrow_mut().push("same batch"), 0);
        design.fire(move || log_ref.borrow_mut().push("next batch"), 0);
        design.continue_simulation();

        // The whole batch runs, including the event fired after the stopping
        // one; only the follow-up batch is cut off.
        assert_eq!(*log.borrow(), vec!["stop", "same batch"]);
    }

    #[test]
    fn interval_item_runs_periodically_until_the_time_limit() {
        let count = std::cell::Cell::new(0u32);
        let design = Design::new();

        let _ = design.interval_item(10, || count.set(count.get() + 1));
        let _ = design.simulation_time_limit(35);
        design.simulate().unwrap();

        // Actions at ticks 0, 10, 20, 30; the stop at 35 ends the run.
        assert_eq!(count.get(), 4);
        assert_eq!(design.simulation_time(), 35);
    }

    #[test]
    fn interval_item_honors_its_initial_offset() {
        let count = std::cell::Cell::new(0u32);
        let design = Design::new();

        let _ = design.interval_item_with_offset(10, 5, || count.set(count.get() + 1));
        let _ = design.simulation_time_limit(30);
        design.simulate().unwrap();

        // Actions at ticks 5, 15, 25.
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn clock_stepper_advances_one_cycle_at_a_time() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let counter = design.vector_register(8);
        counter.set_name("counter");
        let block = clock.clocked_block();
        block
            .statements()
            .assign(counter, counter.signal + design.lit(1, 8));
        let stepper = design.clock_stepper(clock, 2);

        design.prepare_simulation().unwrap();
        stepper.step(1);
        assert_eq!(counter.signal.value().to_u64(), 1);
        assert_eq!(design.simulation_time(), 2);
        stepper.step(3);
        assert_eq!(counter.signal.value().to_u64(), 4);
        assert_eq!(design.simulation_time(), 8);
    }

    #[test]
    #[should_panic(expected = "Cannot create an interval item with a period of 0 ticks.")]
    fn interval_period_zero_error() {
        let design = Design::new();

        // Panic
        let _ = design.interval_item(0, || {});
    }

    #[test]
    fn clock_generator_drives_clock_edges() {
        let design = Design::new();

        let clock = design.clock(design.low());
        let counter = design.vector_register(8);
        counter.set_name("counter");
        let block = clock.clocked_block();
        block
            .statements()
            .assign(counter, counter.signal + design.lit(1, 8));
        let _ = design.clock_generator(clock, 2);
        let _ = design.simulation_time_limit(10);

        design.simulate().unwrap();

        // Edges at ticks 0, 2, 4, 6, 8, 10.
        assert_eq!(counter.signal.value().to_u64(), 6);
    }
}
