use super::bit_signal::*;
use super::clock::*;
use super::design::*;
use super::memory::*;
use super::pin::*;
use super::procedural::*;
use super::validation::*;
use crate::sim::{ClockStepper, IntervalItem, SimulationTimeLimit};

use std::cell::{Cell, RefCell};
use std::ptr;

use super::vector_signal::*;

/// Per-item data shared by every graph node: the owning design, the registration
/// index (which doubles as the node's identity), an optional display name and an
/// optional non-owning hierarchy parent.
///
/// The hierarchy parent is used only to make diagnostics and generated names more
/// readable; it is never traversed for ownership or correctness.
pub(crate) struct ItemCore<'a> {
    design: &'a Design<'a>,
    index: usize,
    name: RefCell<Option<String>>,
    hierarchy_parent: Cell<Option<ItemRef<'a>>>,
}

impl<'a> ItemCore<'a> {
    pub(crate) fn new(design: &'a Design<'a>) -> ItemCore<'a> {
        ItemCore {
            design,
            index: design.allocate_item_index(),
            name: RefCell::new(None),
            hierarchy_parent: Cell::new(None),
        }
    }

    pub(crate) fn design(&self) -> &'a Design<'a> {
        self.design
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub(crate) fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = Some(name.into());
    }

    pub(crate) fn hierarchy_parent(&self) -> Option<ItemRef<'a>> {
        self.hierarchy_parent.get()
    }

    pub(crate) fn set_hierarchy_parent(&self, parent: ItemRef<'a>) {
        self.hierarchy_parent.set(Some(parent));
    }
}

pub(crate) fn check_same_design<'a>(a: &ItemCore<'a>, b: &ItemCore<'a>) {
    if !ptr::eq(a.design, b.design) {
        panic!("Attempted to combine items from different designs.");
    }
}

pub(crate) fn check_same_design_signal<'a>(a: &ItemCore<'a>, b: &ItemCore<'a>) {
    if !ptr::eq(a.design, b.design) {
        panic!("Attempted to combine signals from different designs.");
    }
}

/// A reference to any node of the design graph.
///
/// This is the closed set of node kinds the toolkit knows about. Most client code
/// holds references to the concrete node types instead and only meets `ItemRef`
/// when iterating a [`Design`]'s items.
///
/// [`Design`]: ./struct.Design.html
#[derive(Clone, Copy)]
pub enum ItemRef<'a> {
    BitSignal(&'a BitSignal<'a>),
    VectorSignal(&'a VectorSignal<'a>),
    BitOutputPin(&'a BitOutputPin<'a>),
    VectorOutputPin(&'a VectorOutputPin<'a>),
    Clock(&'a Clock<'a>),
    ClockedBlock(&'a ClockedBlock<'a>),
    Memory(&'a Memory<'a>),
    Interval(&'a IntervalItem<'a>),
    TimeLimit(&'a SimulationTimeLimit<'a>),
    ClockStepper(&'a ClockStepper<'a>),
}

impl<'a> ItemRef<'a> {
    pub(crate) fn core(&self) -> &ItemCore<'a> {
        match *self {
            ItemRef::BitSignal(item) => &item.core,
            ItemRef::VectorSignal(item) => &item.core,
            ItemRef::BitOutputPin(item) => &item.core,
            ItemRef::VectorOutputPin(item) => &item.core,
            ItemRef::Clock(item) => &item.core,
            ItemRef::ClockedBlock(item) => &item.core,
            ItemRef::Memory(item) => &item.core,
            ItemRef::Interval(item) => &item.core,
            ItemRef::TimeLimit(item) => &item.core,
            ItemRef::ClockStepper(item) => &item.core,
        }
    }

    /// Returns the design this item belongs to.
    pub fn design(&self) -> &'a Design<'a> {
        self.core().design()
    }

    /// Returns the registration index of this item, which is unique within its design.
    pub fn index(&self) -> usize {
        self.core().index()
    }

    /// Returns the display name of this item, if one has been set.
    pub fn name(&self) -> Option<String> {
        self.core().name()
    }

    /// Sets the display name of this item.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core().set_name(name);
    }

    /// Returns the hierarchy parent of this item, if one has been set.
    pub fn hierarchy_parent(&self) -> Option<ItemRef<'a>> {
        self.core().hierarchy_parent()
    }

    /// Sets the hierarchy parent of this item. The parent is a non-owning reference
    /// used only to make diagnostics and generated names more readable.
    pub fn set_hierarchy_parent(&self, parent: ItemRef<'a>) {
        self.core().set_hierarchy_parent(parent);
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match *self {
            ItemRef::BitSignal(_) => "bit signal",
            ItemRef::VectorSignal(_) => "vector signal",
            ItemRef::BitOutputPin(_) => "output pin",
            ItemRef::VectorOutputPin(_) => "output pin",
            ItemRef::Clock(_) => "clock",
            ItemRef::ClockedBlock(_) => "clocked block",
            ItemRef::Memory(_) => "memory",
            ItemRef::Interval(_) => "interval item",
            ItemRef::TimeLimit(_) => "time limit",
            ItemRef::ClockStepper(_) => "clock stepper",
        }
    }

    /// Returns a human-readable label for this item, for use in diagnostics.
    /// Includes the hierarchy parent's name as a prefix when available.
    pub fn description(&self) -> String {
        let core = self.core();
        let own = match core.name() {
            Some(name) => name,
            None => format!("<unnamed {} #{}>", self.kind_name(), core.index()),
        };
        match core.hierarchy_parent().and_then(|parent| parent.core().name()) {
            Some(parent_name) => format!("{}.{}", parent_name, own),
            None => own,
        }
    }

    pub(crate) fn finalize_before_validation(&self) {
        if let ItemRef::ClockedBlock(block) = *self {
            block.determine_assigned_state();
        }
    }

    pub(crate) fn validate(&self, context: &mut ValidationContext) {
        match *self {
            ItemRef::BitSignal(signal) => signal.validate(context),
            ItemRef::VectorSignal(signal) => signal.validate(context),
            ItemRef::Memory(memory) => memory.validate(context),
            ItemRef::ClockedBlock(block) => block.validate(context),
            _ => (),
        }
    }

    pub(crate) fn finalize_after_validation(&self) {
        match *self {
            ItemRef::BitSignal(signal) => signal.finalize_after_validation(),
            ItemRef::VectorSignal(signal) => signal.finalize_after_validation(),
            ItemRef::Memory(memory) => memory.finalize_after_validation(),
            _ => (),
        }
    }

    pub(crate) fn initialize_simulation(&self) {
        match *self {
            ItemRef::Clock(clock) => clock.initialize_simulation(),
            ItemRef::Interval(interval) => interval.initialize_simulation(),
            ItemRef::TimeLimit(limit) => limit.initialize_simulation(),
            _ => (),
        }
    }
}

/// A reference to any graph node that can report a current value: a bit signal or
/// a vector signal.
#[derive(Clone, Copy)]
pub enum SignalRef<'a> {
    Bit(&'a BitSignal<'a>),
    Vector(&'a VectorSignal<'a>),
}

impl<'a> SignalRef<'a> {
    /// Returns this signal as a graph item.
    pub fn item(&self) -> ItemRef<'a> {
        match *self {
            SignalRef::Bit(signal) => ItemRef::BitSignal(signal),
            SignalRef::Vector(signal) => ItemRef::VectorSignal(signal),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.item().index()
    }

    /// Returns the width of this signal for vector signals, or `None` for bit signals.
    pub fn vector_width(&self) -> Option<u32> {
        match *self {
            SignalRef::Bit(_) => None,
            SignalRef::Vector(signal) => Some(signal.width()),
        }
    }

    /// Follows connector indirections until a non-connector signal (or an
    /// unconnected connector) is reached.
    pub(crate) fn resolve_connectors(self) -> SignalRef<'a> {
        let mut current = self;
        loop {
            let next = match current {
                SignalRef::Bit(signal) => match signal.data {
                    BitSignalData::Connector { ref connected } => connected.get().map(SignalRef::Bit),
                    _ => None,
                },
                SignalRef::Vector(signal) => match signal.data {
                    VectorSignalData::Connector { ref connected, .. } => {
                        connected.get().map(SignalRef::Vector)
                    }
                    _ => None,
                },
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }
}
