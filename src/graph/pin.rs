use super::bit_signal::*;
use super::design::*;
use super::item::*;
use super::vector_signal::*;
use crate::vector::Vector;

use std::cell::Cell;

/// A single-bit input pin: a top-level `input` port of the synthesized module.
///
/// In simulation, an input pin's value is whatever was last set with
/// [`set_value`] (initially `0`); the synthesis backend never drives it.
///
/// The port name is a *fixed* name: it appears verbatim in the generated module
/// and must not collide with any other name.
///
/// # Examples
///
/// ```
/// use ripple::*;
///
/// let design = Design::new();
///
/// let enable = design.bit_input_pin("enable");
/// design.bit_output_pin("out", !enable.signal);
/// design.prepare_simulation().unwrap();
/// enable.set_value(true);
/// ```
///
/// [`set_value`]: #method.set_value
#[derive(Clone, Copy)]
#[must_use]
pub struct BitInputPin<'a> {
    /// The signal that reports the pin's current value.
    pub signal: &'a BitSignal<'a>,
}

impl<'a> BitInputPin<'a> {
    /// Returns the port name of this pin.
    pub fn port_name(&self) -> String {
        match self.signal.data {
            BitSignalData::InputPin { ref port_name, .. } => port_name.clone(),
            _ => unreachable!(),
        }
    }

    /// Sets the value this pin reports during simulation.
    pub fn set_value(&self, value: bool) {
        match self.signal.data {
            BitSignalData::InputPin { value: ref cell, .. } => cell.set(value),
            _ => unreachable!(),
        }
    }
}

/// A vector input pin: a top-level `input` port with a `[width-1:0]` range.
///
/// See [`BitInputPin`]; this type additionally carries a fixed bit width that
/// all set values must match.
///
/// [`BitInputPin`]: ./struct.BitInputPin.html
#[derive(Clone, Copy)]
#[must_use]
pub struct VectorInputPin<'a> {
    /// The signal that reports the pin's current value.
    pub signal: &'a VectorSignal<'a>,
}

impl<'a> VectorInputPin<'a> {
    /// Returns the port name of this pin.
    pub fn port_name(&self) -> String {
        match self.signal.data {
            VectorSignalData::InputPin { ref port_name, .. } => port_name.clone(),
            _ => unreachable!(),
        }
    }

    /// Returns the bit width of this pin.
    pub fn width(&self) -> u32 {
        self.signal.width()
    }

    /// Sets the value this pin reports during simulation.
    ///
    /// # Panics
    ///
    /// Panics if `value`'s width doesn't match this pin's width.
    pub fn set_value(&self, value: Vector) {
        match self.signal.data {
            VectorSignalData::InputPin {
                width,
                value: ref cell,
                ..
            } => {
                if value.width() != width {
                    panic!("Attempted to set an input pin with a width of {} bits to a value with a width of {} bits.", width, value.width());
                }
                cell.set(value);
            }
            _ => unreachable!(),
        }
    }
}

/// A single-bit output pin: a top-level `output` port driven by a signal of the
/// design.
///
/// The synthesis backend emits one port declaration and one `assign` statement
/// per output pin. Output pins have no value of their own; read the source
/// signal instead.
#[must_use]
pub struct BitOutputPin<'a> {
    pub(crate) core: ItemCore<'a>,
    port_name: String,
    source: &'a BitSignal<'a>,
}

impl<'a> BitOutputPin<'a> {
    /// Returns this pin as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::BitOutputPin(self)
    }

    /// Returns the port name of this pin.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Returns the signal that drives this pin.
    pub fn source(&self) -> &'a BitSignal<'a> {
        self.source
    }
}

/// A vector output pin: a top-level `output` port with a `[width-1:0]` range.
///
/// See [`BitOutputPin`].
///
/// [`BitOutputPin`]: ./struct.BitOutputPin.html
#[must_use]
pub struct VectorOutputPin<'a> {
    pub(crate) core: ItemCore<'a>,
    port_name: String,
    source: &'a VectorSignal<'a>,
}

impl<'a> VectorOutputPin<'a> {
    /// Returns this pin as a graph item.
    pub fn as_item(&'a self) -> ItemRef<'a> {
        ItemRef::VectorOutputPin(self)
    }

    /// Returns the port name of this pin.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Returns the bit width of this pin.
    pub fn width(&self) -> u32 {
        self.source.width()
    }

    /// Returns the signal that drives this pin.
    pub fn source(&self) -> &'a VectorSignal<'a> {
        self.source
    }
}

impl<'a> Design<'a> {
    fn check_port_name(&self, port_name: &str) {
        if port_name.is_empty() {
            panic!("Cannot create a pin with an empty port name.");
        }
        for item in self.items() {
            let existing = match item {
                ItemRef::BitSignal(signal) => match signal.data {
                    BitSignalData::InputPin { ref port_name, .. } => Some(port_name.as_str()),
                    _ => None,
                },
                ItemRef::VectorSignal(signal) => match signal.data {
                    VectorSignalData::InputPin { ref port_name, .. } => Some(port_name.as_str()),
                    _ => None,
                },
                ItemRef::BitOutputPin(pin) => Some(pin.port_name()),
                ItemRef::VectorOutputPin(pin) => Some(pin.port_name()),
                _ => None,
            };
            if existing == Some(port_name) {
                panic!(
                    "The port name \"{}\" is already used by another pin of this design.",
                    port_name
                );
            }
        }
    }

    /// Creates a single-bit input pin with the given port name.
    ///
    /// # Panics
    ///
    /// Panics if `port_name` is empty or already used by another pin of this
    /// design.
    pub fn bit_input_pin(&'a self, port_name: impl Into<String>) -> BitInputPin<'a> {
        let port_name = port_name.into();
        self.check_port_name(&port_name);
        let signal = self.alloc_bit_signal(BitSignalData::InputPin {
            port_name: port_name.clone(),
            value: Cell::new(false),
        });
        signal.set_name(port_name);
        BitInputPin { signal }
    }

    /// Creates a vector input pin with the given port name and `bit_width` bits.
    ///
    /// # Panics
    ///
    /// Panics if `port_name` is empty or already used by another pin of this
    /// design, or if `bit_width` is less than [`MIN_SIGNAL_BIT_WIDTH`] or greater
    /// than [`MAX_SIGNAL_BIT_WIDTH`].
    ///
    /// [`MIN_SIGNAL_BIT_WIDTH`]: ./constant.MIN_SIGNAL_BIT_WIDTH.html
    /// [`MAX_SIGNAL_BIT_WIDTH`]: ./constant.MAX_SIGNAL_BIT_WIDTH.html
    pub fn vector_input_pin(
        &'a self,
        port_name: impl Into<String>,
        bit_width: u32,
    ) -> VectorInputPin<'a> {
        let port_name = port_name.into();
        self.check_port_name(&port_name);
        if bit_width < MIN_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create an input pin with {} bit(s). Signals must not be narrower than {} bit(s).",
                bit_width, MIN_SIGNAL_BIT_WIDTH
            );
        }
        if bit_width > MAX_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create an input pin with {} bit(s). Signals must not be wider than {} bit(s).",
                bit_width, MAX_SIGNAL_BIT_WIDTH
            );
        }
        let signal = self.alloc_vector_signal(VectorSignalData::InputPin {
            port_name: port_name.clone(),
            width: bit_width,
            value: Cell::new(Vector::of(bit_width, 0)),
        });
        signal.set_name(port_name);
        VectorInputPin { signal }
    }

    /// Creates a single-bit output pin with the given port name, driven by
    /// `source`.
    ///
    /// # Panics
    ///
    /// Panics if `port_name` is empty or already used by another pin of this
    /// design, or if `source` belongs to a different design.
    pub fn bit_output_pin(
        &'a self,
        port_name: impl Into<String>,
        source: &'a BitSignal<'a>,
    ) -> &'a BitOutputPin<'a> {
        let port_name = port_name.into();
        self.check_port_name(&port_name);
        let pin = self.bit_output_pin_arena.alloc(BitOutputPin {
            core: ItemCore::new(self),
            port_name,
            source,
        });
        check_same_design_signal(&pin.core, &source.core);
        pin.core.set_name(pin.port_name.clone());
        self.register_item(ItemRef::BitOutputPin(pin));
        pin
    }

    /// Creates a vector output pin with the given port name, driven by `source`.
    /// The pin's width is the width of `source`.
    ///
    /// # Panics
    ///
    /// Panics if `port_name` is empty or already used by another pin of this
    /// design, or if `source` belongs to a different design.
    pub fn vector_output_pin(
        &'a self,
        port_name: impl Into<String>,
        source: &'a VectorSignal<'a>,
    ) -> &'a VectorOutputPin<'a> {
        let port_name = port_name.into();
        self.check_port_name(&port_name);
        let pin = self.vector_output_pin_arena.alloc(VectorOutputPin {
            core: ItemCore::new(self),
            port_name,
            source,
        });
        check_same_design_signal(&pin.core, &source.core);
        pin.core.set_name(pin.port_name.clone());
        self.register_item(ItemRef::VectorOutputPin(pin));
        pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_pins_report_their_set_value() {
        let design = Design::new();

        let bit = design.bit_input_pin("a");
        assert!(!bit.signal.value());
        bit.set_value(true);
        assert!(bit.signal.value());

        let vector = design.vector_input_pin("b", 8);
        assert_eq!(vector.signal.value(), Vector::of(8, 0));
        vector.set_value(Vector::of(8, 0x5a));
        assert_eq!(vector.signal.value(), Vector::of(8, 0x5a));
    }

    #[test]
    fn output_pins_expose_their_source() {
        let design = Design::new();

        let source = design.lit(3, 4);
        let pin = design.vector_output_pin("o", source);
        assert_eq!(pin.port_name(), "o");
        assert_eq!(pin.width(), 4);
        assert_eq!(pin.source().value(), Vector::of(4, 3));
    }

    #[test]
    #[should_panic(expected = "The port name \"x\" is already used by another pin of this design.")]
    fn duplicate_port_name_error() {
        let design = Design::new();

        let _ = design.bit_input_pin("x");

        // Panic
        let _ = design.vector_output_pin("x", design.lit(0, 4));
    }

    #[test]
    #[should_panic(expected = "Cannot create a pin with an empty port name.")]
    fn empty_port_name_error() {
        let design = Design::new();

        // Panic
        let _ = design.bit_input_pin("");
    }

    #[test]
    #[should_panic(
        expected = "Attempted to set an input pin with a width of 4 bits to a value with a width of 8 bits."
    )]
    fn set_value_width_mismatch_error() {
        let design = Design::new();

        let pin = design.vector_input_pin("p", 4);

        // Panic
        pin.set_value(Vector::of(8, 0));
    }
}
