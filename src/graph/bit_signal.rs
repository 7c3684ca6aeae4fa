use super::design::*;
use super::item::*;
use super::register::*;
use super::validation::*;
use super::vector_signal::*;
use crate::vector::Vector;

use std::cell::Cell;
use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A signal that carries a single bit.
///
/// `BitSignal`s are created by [`Design`] methods (eg. [`low`], [`bit_input_pin`])
/// or by combining existing signals (eg. `a & b`, [`xnor`]). All signals are
/// shared references into their design's arena; using the same reference as an
/// operand in several places shares the node instead of duplicating it.
///
/// # Examples
///
/// ```
/// use ripple::*;
///
/// let design = Design::new();
///
/// let a = design.bit_input_pin("a").signal;
/// let b = design.high();
/// let c = !(a ^ b);
/// design.bit_output_pin("o", c);
/// ```
///
/// [`Design`]: ./struct.Design.html
/// [`low`]: ./struct.Design.html#method.low
/// [`bit_input_pin`]: ./struct.Design.html#method.bit_input_pin
/// [`xnor`]: #method.xnor
#[must_use]
pub struct BitSignal<'a> {
    pub(crate) core: ItemCore<'a>,
    pub(crate) data: BitSignalData<'a>,
}

pub(crate) enum BitSignalData<'a> {
    Constant {
        value: bool,
    },

    InputPin {
        port_name: String,
        value: Cell<bool>,
    },

    Op {
        op: BitOp,
        lhs: &'a BitSignal<'a>,
        rhs: &'a BitSignal<'a>,
    },
    Not {
        operand: &'a BitSignal<'a>,
    },
    Conditional {
        condition: &'a BitSignal<'a>,
        on_true: &'a BitSignal<'a>,
        on_false: &'a BitSignal<'a>,
    },

    Comparison {
        op: ComparisonOp,
        lhs: &'a VectorSignal<'a>,
        rhs: &'a VectorSignal<'a>,
    },

    IndexSelection {
        container: &'a VectorSignal<'a>,
        index: &'a VectorSignal<'a>,
    },
    ConstantIndexSelection {
        container: &'a VectorSignal<'a>,
        index: u32,
    },

    Register {
        data: &'a BitRegisterData<'a>,
    },

    Connector {
        connected: Cell<Option<&'a BitSignal<'a>>>,
    },
}

#[derive(Clone, Copy)]
pub(crate) enum BitOp {
    And,
    Or,
    Xor,
    Xnor,
}

impl BitOp {
    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            BitOp::And => "&",
            BitOp::Or => "|",
            BitOp::Xor => "^",
            BitOp::Xnor => "==",
        }
    }

    pub(crate) fn suggestion_suffix(&self) -> &'static str {
        match self {
            BitOp::And => "and",
            BitOp::Or => "or",
            BitOp::Xor => "xor",
            BitOp::Xnor => "xnor",
        }
    }

    pub(crate) fn evaluate(&self, lhs: bool, rhs: bool) -> bool {
        match self {
            BitOp::And => lhs & rhs,
            BitOp::Or => lhs | rhs,
            BitOp::Xor => lhs ^ rhs,
            BitOp::Xnor => lhs == rhs,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl ComparisonOp {
    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "==",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanEqual => ">=",
        }
    }

    pub(crate) fn suggestion_suffix(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "equal",
            ComparisonOp::NotEqual => "not_equal",
            ComparisonOp::LessThan => "less_than",
            ComparisonOp::LessThanEqual => "less_than_or_equal",
            ComparisonOp::GreaterThan => "greater_than",
            ComparisonOp::GreaterThanEqual => "greater_than_or_equal",
        }
    }

    pub(crate) fn evaluate(&self, lhs: Vector, rhs: Vector) -> bool {
        match self {
            ComparisonOp::Equal => lhs == rhs,
            ComparisonOp::NotEqual => lhs != rhs,
            ComparisonOp::LessThan => lhs.compare_unsigned(rhs) == Ordering::Less,
            ComparisonOp::LessThanEqual => lhs.compare_unsigned(rhs) != Ordering::Greater,
            ComparisonOp::GreaterThan => lhs.compare_unsigned(rhs) == Ordering::Greater,
            ComparisonOp::GreaterThanEqual => lhs.compare_unsigned(rhs) != Ordering::Less,
        }
    }
}

impl<'a> Design<'a> {
    pub(crate) fn alloc_bit_signal(&'a self, data: BitSignalData<'a>) -> &'a BitSignal<'a> {
        let signal = self.bit_signal_arena.alloc(BitSignal {
            core: ItemCore::new(self),
            data,
        });
        self.register_item(ItemRef::BitSignal(signal));
        signal
    }

    /// Creates a `BitSignal` that represents the constant `value`.
    pub fn bit_constant(&'a self, value: bool) -> &'a BitSignal<'a> {
        self.alloc_bit_signal(BitSignalData::Constant { value })
    }

    /// Convenience method to create a `BitSignal` that represents a constant `0` bit.
    pub fn low(&'a self) -> &'a BitSignal<'a> {
        self.bit_constant(false)
    }

    /// Convenience method to create a `BitSignal` that represents a constant `1` bit.
    pub fn high(&'a self) -> &'a BitSignal<'a> {
        self.bit_constant(true)
    }
}

impl<'a> BitSignal<'a> {
    /// Returns this signal as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::BitSignal(self)
    }

    /// Returns the display name of this signal, if one has been set.
    pub fn name(&self) -> Option<String> {
        self.core.name()
    }

    /// Sets the display name of this signal. The name is used for diagnostics and
    /// to derive generated names in the synthesis output.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core.set_name(name);
    }

    /// Sets the hierarchy parent of this signal (see [`ItemRef::set_hierarchy_parent`]).
    ///
    /// [`ItemRef::set_hierarchy_parent`]: ./enum.ItemRef.html#method.set_hierarchy_parent
    pub fn set_hierarchy_parent(&self, parent: ItemRef<'a>) {
        self.core.set_hierarchy_parent(parent);
    }

    /// Returns the current value of this signal by re-reading the design graph.
    ///
    /// # Panics
    ///
    /// Panics if an unconnected connector is reached.
    pub fn value(&self) -> bool {
        match self.data {
            BitSignalData::Constant { value } => value,
            BitSignalData::InputPin { ref value, .. } => value.get(),
            BitSignalData::Op { op, lhs, rhs } => op.evaluate(lhs.value(), rhs.value()),
            BitSignalData::Not { operand } => !operand.value(),
            BitSignalData::Conditional {
                condition,
                on_true,
                on_false,
            } => {
                if condition.value() {
                    on_true.value()
                } else {
                    on_false.value()
                }
            }
            BitSignalData::Comparison { op, lhs, rhs } => op.evaluate(lhs.value(), rhs.value()),
            BitSignalData::IndexSelection { container, index } => {
                container.value().select_dynamic(index.value())
            }
            BitSignalData::ConstantIndexSelection { container, index } => {
                container.value().select(index)
            }
            BitSignalData::Register { data } => data.value(),
            BitSignalData::Connector { ref connected } => match connected.get() {
                Some(connected) => connected.value(),
                None => {
                    panic!("Attempted to read the value of a connector which has no connected signal.")
                }
            },
        }
    }

    fn check_same_design(&self, other: &BitSignal<'a>) {
        if !std::ptr::eq(self.core.design(), other.core.design()) {
            panic!("Attempted to combine signals from different designs.");
        }
    }

    /// Creates a `BitSignal` that represents the bitwise XNOR of this signal and `rhs`.
    ///
    /// # Panics
    ///
    /// Panics if `self` and `rhs` belong to different designs.
    pub fn xnor(&'a self, rhs: &'a BitSignal<'a>) -> &'a BitSignal<'a> {
        self.check_same_design(rhs);
        self.core.design().alloc_bit_signal(BitSignalData::Op {
            op: BitOp::Xnor,
            lhs: self,
            rhs,
        })
    }

    /// Creates a `BitSignal` that represents the boolean equality of this signal and `rhs`.
    ///
    /// This is the same operation as [`xnor`].
    ///
    /// [`xnor`]: #method.xnor
    pub fn eq(&'a self, rhs: &'a BitSignal<'a>) -> &'a BitSignal<'a> {
        self.xnor(rhs)
    }

    /// Creates a `BitSignal` that represents the boolean inequality of this signal and `rhs`.
    pub fn ne(&'a self, rhs: &'a BitSignal<'a>) -> &'a BitSignal<'a> {
        self.check_same_design(rhs);
        self.core.design().alloc_bit_signal(BitSignalData::Op {
            op: BitOp::Xor,
            lhs: self,
            rhs,
        })
    }

    /// Creates a 2:1 multiplexer that represents `when_true`'s value when this
    /// signal is high, and `when_false`'s value when this signal is low.
    ///
    /// # Panics
    ///
    /// Panics if the operands belong to different designs, or if the bit widths of
    /// `when_true` and `when_false` aren't equal.
    pub fn mux(
        &'a self,
        when_true: &'a VectorSignal<'a>,
        when_false: &'a VectorSignal<'a>,
    ) -> &'a VectorSignal<'a> {
        check_same_design_signal(&self.core, &when_true.core);
        check_same_design_signal(&self.core, &when_false.core);
        if when_true.width() != when_false.width() {
            panic!(
                "Cannot multiplex signals with different bit widths ({} and {}, respectively).",
                when_true.width(),
                when_false.width()
            );
        }
        self.core
            .design()
            .alloc_vector_signal(VectorSignalData::Conditional {
                condition: self,
                on_true: when_true,
                on_false: when_false,
            })
    }

    /// Creates a 2:1 multiplexer over bit signals (see [`mux`]).
    ///
    /// # Panics
    ///
    /// Panics if the operands belong to different designs.
    ///
    /// [`mux`]: #method.mux
    pub fn mux_bit(
        &'a self,
        when_true: &'a BitSignal<'a>,
        when_false: &'a BitSignal<'a>,
    ) -> &'a BitSignal<'a> {
        self.check_same_design(when_true);
        self.check_same_design(when_false);
        self.core.design().alloc_bit_signal(BitSignalData::Conditional {
            condition: self,
            on_true: when_true,
            on_false: when_false,
        })
    }

    /// Creates a `VectorSignal` that represents this signal repeated `count` times.
    ///
    /// # Panics
    ///
    /// Panics if `count` is less than [`MIN_SIGNAL_BIT_WIDTH`] or greater than
    /// [`MAX_SIGNAL_BIT_WIDTH`].
    ///
    /// [`MIN_SIGNAL_BIT_WIDTH`]: ./constant.MIN_SIGNAL_BIT_WIDTH.html
    /// [`MAX_SIGNAL_BIT_WIDTH`]: ./constant.MAX_SIGNAL_BIT_WIDTH.html
    pub fn repeat(&'a self, count: u32) -> &'a VectorSignal<'a> {
        if count < MIN_SIGNAL_BIT_WIDTH {
            panic!("Attempted to repeat a 1-bit signal {} times, but this would result in a bit width of {}, which is less than the minimal signal bit width of {} bit(s).", count, count, MIN_SIGNAL_BIT_WIDTH);
        }
        if count > MAX_SIGNAL_BIT_WIDTH {
            panic!("Attempted to repeat a 1-bit signal {} times, but this would result in a bit width of {}, which is greater than the maximum signal bit width of {} bit(s).", count, count, MAX_SIGNAL_BIT_WIDTH);
        }
        self.core
            .design()
            .alloc_vector_signal(VectorSignalData::Repeat {
                source: self,
                count,
            })
    }

    /// Creates a 1-bit `VectorSignal` view of this signal, for use where a vector
    /// operand is required.
    pub fn as_vector(&'a self) -> &'a VectorSignal<'a> {
        self.core
            .design()
            .alloc_vector_signal(VectorSignalData::FromBit { bit: self })
    }

    pub(crate) fn validate(&self, context: &mut ValidationContext) {
        match self.data {
            BitSignalData::Connector { ref connected } => {
                if connected.get().is_none() {
                    context.report_error("no signal connected");
                }
            }
            BitSignalData::Register { data } => {
                data.validate_driving_blocks(self.core.design(), self.core.index(), context);
            }
            _ => (),
        }
    }

    pub(crate) fn finalize_after_validation(&self) {
        if let BitSignalData::Register { data } = self.data {
            data.determine_clocked_block(self.core.design(), self.core.index());
        }
    }
}

impl<'a> BitAnd for &'a BitSignal<'a> {
    type Output = Self;

    /// Combines two `BitSignal`s, producing a new `BitSignal` that represents the
    /// bitwise AND of the original two signals.
    ///
    /// # Panics
    ///
    /// Panics if `lhs` and `rhs` belong to different designs.
    fn bitand(self, rhs: Self) -> Self {
        self.check_same_design(rhs);
        self.core.design().alloc_bit_signal(BitSignalData::Op {
            op: BitOp::And,
            lhs: self,
            rhs,
        })
    }
}

impl<'a> BitOr for &'a BitSignal<'a> {
    type Output = Self;

    /// Combines two `BitSignal`s, producing a new `BitSignal` that represents the
    /// bitwise OR of the original two signals.
    ///
    /// # Panics
    ///
    /// Panics if `lhs` and `rhs` belong to different designs.
    fn bitor(self, rhs: Self) -> Self {
        self.check_same_design(rhs);
        self.core.design().alloc_bit_signal(BitSignalData::Op {
            op: BitOp::Or,
            lhs: self,
            rhs,
        })
    }
}

impl<'a> BitXor for &'a BitSignal<'a> {
    type Output = Self;

    /// Combines two `BitSignal`s, producing a new `BitSignal` that represents the
    /// bitwise XOR of the original two signals.
    ///
    /// # Panics
    ///
    /// Panics if `lhs` and `rhs` belong to different designs.
    fn bitxor(self, rhs: Self) -> Self {
        self.check_same_design(rhs);
        self.core.design().alloc_bit_signal(BitSignalData::Op {
            op: BitOp::Xor,
            lhs: self,
            rhs,
        })
    }
}

impl<'a> Not for &'a BitSignal<'a> {
    type Output = Self;

    /// Produces a new `BitSignal` that represents the inverse of the original signal.
    fn not(self) -> Self {
        self.core
            .design()
            .alloc_bit_signal(BitSignalData::Not { operand: self })
    }
}
