use super::bit_signal::*;
use super::design::*;
use super::item::*;
use super::procedural::*;
use super::validation::*;
use super::vector_signal::*;
use crate::vector::Vector;

use std::cell::Cell;

pub(crate) struct BitRegisterData<'a> {
    value: Cell<bool>,
    next: Cell<bool>,
    initialized: Cell<bool>,
    error_if_not_assigned: Cell<bool>,
    clocked_block: Cell<Option<&'a ClockedBlock<'a>>>,
}

impl<'a> BitRegisterData<'a> {
    fn new() -> BitRegisterData<'a> {
        BitRegisterData {
            value: Cell::new(false),
            next: Cell::new(false),
            initialized: Cell::new(false),
            error_if_not_assigned: Cell::new(true),
            clocked_block: Cell::new(None),
        }
    }

    pub(crate) fn value(&self) -> bool {
        self.value.get()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub(crate) fn initial_value(&self) -> bool {
        self.value.get()
    }

    pub(crate) fn validate_driving_blocks(
        &self,
        design: &Design<'a>,
        register_index: usize,
        context: &mut ValidationContext,
    ) {
        let driving_blocks = design
            .clocked_blocks()
            .iter()
            .filter(|block| block.assigns_bit_register(register_index))
            .count();
        if driving_blocks > 1 {
            context.report_error("multiple clocked blocks assign to this register");
        }
        if driving_blocks == 0 && self.error_if_not_assigned.get() {
            context.report_error("no clocked block assigns to this register; if this is intentional, call disable_error_if_not_assigned()");
        }
    }

    pub(crate) fn determine_clocked_block(&self, design: &Design<'a>, register_index: usize) {
        for block in design.clocked_blocks() {
            if block.assigns_bit_register(register_index) {
                self.clocked_block.set(Some(block));
            }
        }
    }
}

pub(crate) struct VectorRegisterData<'a> {
    width: u32,
    value: Cell<Vector>,
    next: Cell<Vector>,
    initialized: Cell<bool>,
    error_if_not_assigned: Cell<bool>,
    clocked_block: Cell<Option<&'a ClockedBlock<'a>>>,
}

impl<'a> VectorRegisterData<'a> {
    fn new(width: u32) -> VectorRegisterData<'a> {
        VectorRegisterData {
            width,
            value: Cell::new(Vector::of(width, 0)),
            next: Cell::new(Vector::of(width, 0)),
            initialized: Cell::new(false),
            error_if_not_assigned: Cell::new(true),
            clocked_block: Cell::new(None),
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn value(&self) -> Vector {
        self.value.get()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub(crate) fn initial_value(&self) -> Vector {
        self.value.get()
    }

    pub(crate) fn validate_driving_blocks(
        &self,
        design: &Design<'a>,
        register_index: usize,
        context: &mut ValidationContext,
    ) {
        let driving_blocks = design
            .clocked_blocks()
            .iter()
            .filter(|block| block.assigns_vector_register(register_index))
            .count();
        if driving_blocks > 1 {
            context.report_error("multiple clocked blocks assign to this register");
        }
        if driving_blocks == 0 && self.error_if_not_assigned.get() {
            context.report_error("no clocked block assigns to this register; if this is intentional, call disable_error_if_not_assigned()");
        }
    }

    pub(crate) fn determine_clocked_block(&self, design: &Design<'a>, register_index: usize) {
        for block in design.clocked_blocks() {
            if block.assigns_vector_register(register_index) {
                self.clocked_block.set(Some(block));
            }
        }
    }
}

/// A single-bit register with a current value and a pending next value.
///
/// The current value is read through the register's [`signal`]; the next value is
/// written by assignment statements inside the [`ClockedBlock`] that drives the
/// register, and becomes current at the end of that block's update step.
///
/// A register that no clocked block assigns to is treated as a validation error
/// unless [`disable_error_if_not_assigned`] is called.
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
/// let toggle = design.bit_register();
/// toggle.signal.set_name("toggle");
/// toggle.set_initial_value(false);
/// clock.clocked_block().statements().assign_bit(toggle, !toggle.signal);
/// design.bit_output_pin("out", toggle.signal);
/// design.finalize_construction().unwrap();
/// ```
///
/// [`signal`]: #structfield.signal
/// [`ClockedBlock`]: ./struct.ClockedBlock.html
/// [`disable_error_if_not_assigned`]: #method.disable_error_if_not_assigned
#[derive(Clone, Copy)]
#[must_use]
pub struct BitRegister<'a> {
    /// The signal that reports the register's current value.
    pub signal: &'a BitSignal<'a>,
}

impl<'a> BitRegister<'a> {
    fn data(&self) -> &'a BitRegisterData<'a> {
        match self.signal.data {
            BitSignalData::Register { data } => data,
            _ => unreachable!(),
        }
    }

    /// Sets the initial value of this register, emitted as an `initial` statement
    /// by the synthesis backend and used as the starting value in simulation.
    pub fn set_initial_value(&self, value: bool) {
        let data = self.data();
        data.value.set(value);
        data.next.set(value);
        data.initialized.set(true);
    }

    /// Directly overrides the current value, for example to override the initial
    /// value of a register for simulation.
    ///
    /// Do not call this from within a clock handler; doing so makes the behavior
    /// dependent on the order in which clock handlers execute, which is undefined.
    pub fn override_current_value(&self, value: bool) {
        let data = self.data();
        data.value.set(value);
        data.next.set(value);
    }

    /// Suppresses the validation error normally reported when no clocked block
    /// assigns to this register.
    pub fn disable_error_if_not_assigned(&self) {
        self.data().error_if_not_assigned.set(false);
    }

    /// Returns the clocked block that drives this register. Returns `None` before
    /// construction is finalized.
    pub fn clocked_block(&self) -> Option<&'a ClockedBlock<'a>> {
        self.data().clocked_block.get()
    }

    /// Sets the display name of this register.
    pub fn set_name(&self, name: impl Into<String>) {
        self.signal.set_name(name);
    }

    pub(crate) fn set_next(&self, value: bool) {
        self.data().next.set(value);
    }

    pub(crate) fn update_value(&self) {
        let data = self.data();
        data.value.set(data.next.get());
    }
}

/// A vector register with a current value and a pending next value.
///
/// See [`BitRegister`] for the update discipline; this type additionally carries
/// a fixed bit width that all assigned values must match.
///
/// [`BitRegister`]: ./struct.BitRegister.html
#[derive(Clone, Copy)]
#[must_use]
pub struct VectorRegister<'a> {
    /// The signal that reports the register's current value.
    pub signal: &'a VectorSignal<'a>,
}

impl<'a> VectorRegister<'a> {
    fn data(&self) -> &'a VectorRegisterData<'a> {
        match self.signal.data {
            VectorSignalData::Register { data } => data,
            _ => unreachable!(),
        }
    }

    /// Returns the bit width of this register.
    pub fn width(&self) -> u32 {
        self.data().width
    }

    /// Sets the initial value of this register, emitted as an `initial` statement
    /// by the synthesis backend and used as the starting value in simulation.
    ///
    /// # Panics
    ///
    /// Panics if `value`'s width doesn't match this register's width.
    pub fn set_initial_value(&self, value: Vector) {
        let data = self.data();
        if value.width() != data.width {
            panic!("Attempted to specify an initial value with a width of {} bits for a register with a width of {} bits.", value.width(), data.width);
        }
        data.value.set(value);
        data.next.set(value);
        data.initialized.set(true);
    }

    /// Directly overrides the current value, for example to override the initial
    /// value of a register for simulation.
    ///
    /// Do not call this from within a clock handler; doing so makes the behavior
    /// dependent on the order in which clock handlers execute, which is undefined.
    ///
    /// # Panics
    ///
    /// Panics if `value`'s width doesn't match this register's width.
    pub fn override_current_value(&self, value: Vector) {
        let data = self.data();
        if value.width() != data.width {
            panic!("Attempted to specify an initial value with a width of {} bits for a register with a width of {} bits.", value.width(), data.width);
        }
        data.value.set(value);
        data.next.set(value);
    }

    /// Suppresses the validation error normally reported when no clocked block
    /// assigns to this register.
    pub fn disable_error_if_not_assigned(&self) {
        self.data().error_if_not_assigned.set(false);
    }

    /// Returns the clocked block that drives this register. Returns `None` before
    /// construction is finalized.
    pub fn clocked_block(&self) -> Option<&'a ClockedBlock<'a>> {
        self.data().clocked_block.get()
    }

    /// Sets the display name of this register.
    pub fn set_name(&self, name: impl Into<String>) {
        self.signal.set_name(name);
    }

    pub(crate) fn set_next(&self, value: Vector) {
        self.data().next.set(value);
    }

    pub(crate) fn update_value(&self) {
        let data = self.data();
        data.value.set(data.next.get());
    }
}

impl<'a> Design<'a> {
    /// Creates a single-bit register with an initial value of `0`.
    pub fn bit_register(&'a self) -> BitRegister<'a> {
        let data = self.bit_register_data_arena.alloc(BitRegisterData::new());
        let signal = self.alloc_bit_signal(BitSignalData::Register { data });
        BitRegister { signal }
    }

    /// Creates a vector register with `bit_width` bits and an initial value of `0`.
    ///
    /// # Panics
    ///
    /// Panics if `bit_width` is less than [`MIN_SIGNAL_BIT_WIDTH`] or greater than
    /// [`MAX_SIGNAL_BIT_WIDTH`].
    ///
    /// [`MIN_SIGNAL_BIT_WIDTH`]: ./constant.MIN_SIGNAL_BIT_WIDTH.html
    /// [`MAX_SIGNAL_BIT_WIDTH`]: ./constant.MAX_SIGNAL_BIT_WIDTH.html
    pub fn vector_register(&'a self, bit_width: u32) -> VectorRegister<'a> {
        if bit_width < MIN_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create a register with {} bit(s). Signals must not be narrower than {} bit(s).",
                bit_width, MIN_SIGNAL_BIT_WIDTH
            );
        }
        if bit_width > MAX_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create a register with {} bit(s). Signals must not be wider than {} bit(s).",
                bit_width, MAX_SIGNAL_BIT_WIDTH
            );
        }
        let data = self
            .vector_register_data_arena
            .alloc(VectorRegisterData::new(bit_width));
        let signal = self.alloc_vector_signal(VectorSignalData::Register { data });
        VectorRegister { signal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_report_their_current_value() {
        let design = Design::new();

        let bit = design.bit_register();
        assert!(!bit.signal.value());
        bit.set_initial_value(true);
        assert!(bit.signal.value());

        let vector = design.vector_register(4);
        assert_eq!(vector.signal.value(), Vector::of(4, 0));
        vector.set_initial_value(Vector::of(4, 9));
        assert_eq!(vector.signal.value(), Vector::of(4, 9));
    }

    #[test]
    fn next_value_is_not_visible_until_update() {
        let design = Design::new();

        let reg = design.vector_register(4);
        reg.set_next(Vector::of(4, 5));
        assert_eq!(reg.signal.value(), Vector::of(4, 0));
        reg.update_value();
        assert_eq!(reg.signal.value(), Vector::of(4, 5));
    }

    #[test]
    #[should_panic(
        expected = "Attempted to specify an initial value with a width of 3 bits for a register with a width of 4 bits."
    )]
    fn initial_value_width_mismatch_error() {
        let design = Design::new();

        let reg = design.vector_register(4);

        // Panic
        reg.set_initial_value(Vector::of(3, 0));
    }

    #[test]
    #[should_panic(
        expected = "Cannot create a register with 0 bit(s). Signals must not be narrower than 1 bit(s)."
    )]
    fn register_width_lt_min_error() {
        let design = Design::new();

        // Panic
        let _ = design.vector_register(0);
    }
}
