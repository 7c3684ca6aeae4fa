use super::bit_signal::*;
use super::design::*;
use super::item::*;
use super::vector_signal::*;

use std::cell::Cell;

/// A pass-through connector for bit signals.
///
/// A connector is a signal whose value is whatever signal it currently forwards
/// to. Connectors allow a signal to be used before the signal that drives it has
/// been built, for example to wire up mutually-dependent components. The
/// synthesis backend treats connectors as fully transparent.
///
/// An unconnected connector is a validation error.
///
/// # Examples
///
/// ```
/// use ripple::*;
///
/// let design = Design::new();
///
/// let feedback = design.bit_connector();
/// let gated = feedback.signal & design.high();
/// feedback.set_connected(design.low());
/// design.finalize_construction().unwrap();
/// assert!(!gated.value());
/// ```
#[derive(Clone, Copy)]
#[must_use]
pub struct BitConnector<'a> {
    /// The pass-through signal of this connector.
    pub signal: &'a BitSignal<'a>,
}

impl<'a> BitConnector<'a> {
    fn connected_cell(&self) -> &'a Cell<Option<&'a BitSignal<'a>>> {
        match self.signal.data {
            BitSignalData::Connector { ref connected } => connected,
            _ => unreachable!(),
        }
    }

    /// Returns the signal this connector currently forwards to, if any.
    pub fn connected(&self) -> Option<&'a BitSignal<'a>> {
        self.connected_cell().get()
    }

    /// Sets the signal this connector forwards to.
    ///
    /// # Panics
    ///
    /// Panics if `connected` belongs to a different design.
    pub fn set_connected(&self, connected: &'a BitSignal<'a>) {
        check_same_design_signal(&self.signal.core, &connected.core);
        self.connected_cell().set(Some(connected));
    }

    /// Sets the display name of this connector.
    pub fn set_name(&self, name: impl Into<String>) {
        self.signal.set_name(name);
    }
}

/// A pass-through connector for vector signals. See [`BitConnector`] for details;
/// this type additionally carries a fixed bit width that the connected signal
/// must match.
///
/// [`BitConnector`]: ./struct.BitConnector.html
#[derive(Clone, Copy)]
#[must_use]
pub struct VectorConnector<'a> {
    /// The pass-through signal of this connector.
    pub signal: &'a VectorSignal<'a>,
}

impl<'a> VectorConnector<'a> {
    fn connected_cell(&self) -> (&'a Cell<Option<&'a VectorSignal<'a>>>, u32) {
        match self.signal.data {
            VectorSignalData::Connector {
                ref connected,
                width,
            } => (connected, width),
            _ => unreachable!(),
        }
    }

    /// Returns the bit width of this connector.
    pub fn width(&self) -> u32 {
        self.connected_cell().1
    }

    /// Returns the signal this connector currently forwards to, if any.
    pub fn connected(&self) -> Option<&'a VectorSignal<'a>> {
        self.connected_cell().0.get()
    }

    /// Sets the signal this connector forwards to.
    ///
    /// # Panics
    ///
    /// Panics if `connected` belongs to a different design, or if its width
    /// doesn't match this connector's width.
    pub fn set_connected(&self, connected: &'a VectorSignal<'a>) {
        check_same_design_signal(&self.signal.core, &connected.core);
        let (cell, width) = self.connected_cell();
        if connected.width() != width {
            panic!(
                "Attempted to connect a signal with a width of {} bits to a connector with a width of {} bits.",
                connected.width(),
                width
            );
        }
        cell.set(Some(connected));
    }

    /// Sets the display name of this connector.
    pub fn set_name(&self, name: impl Into<String>) {
        self.signal.set_name(name);
    }
}

impl<'a> Design<'a> {
    /// Creates an unconnected bit connector.
    pub fn bit_connector(&'a self) -> BitConnector<'a> {
        let signal = self.alloc_bit_signal(BitSignalData::Connector {
            connected: Cell::new(None),
        });
        BitConnector { signal }
    }

    /// Creates an unconnected vector connector with `bit_width` bits.
    ///
    /// # Panics
    ///
    /// Panics if `bit_width` is less than [`MIN_SIGNAL_BIT_WIDTH`] or greater than
    /// [`MAX_SIGNAL_BIT_WIDTH`].
    ///
    /// [`MIN_SIGNAL_BIT_WIDTH`]: ./constant.MIN_SIGNAL_BIT_WIDTH.html
    /// [`MAX_SIGNAL_BIT_WIDTH`]: ./constant.MAX_SIGNAL_BIT_WIDTH.html
    pub fn vector_connector(&'a self, bit_width: u32) -> VectorConnector<'a> {
        if bit_width < MIN_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create a connector with {} bit(s). Signals must not be narrower than {} bit(s).",
                bit_width, MIN_SIGNAL_BIT_WIDTH
            );
        }
        if bit_width > MAX_SIGNAL_BIT_WIDTH {
            panic!(
                "Cannot create a connector with {} bit(s). Signals must not be wider than {} bit(s).",
                bit_width, MAX_SIGNAL_BIT_WIDTH
            );
        }
        let signal = self.alloc_vector_signal(VectorSignalData::Connector {
            width: bit_width,
            connected: Cell::new(None),
        });
        VectorConnector { signal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector;

    #[test]
    fn connector_forwards_its_connected_signal() {
        let design = Design::new();

        let connector = design.vector_connector(4);
        connector.set_connected(design.lit(7, 4));
        assert_eq!(connector.signal.value(), Vector::of(4, 7));
    }

    #[test]
    fn unconnected_connector_fails_validation() {
        let design = Design::new();

        let connector = design.bit_connector();
        connector.set_name("dangling");

        let error = design.finalize_construction().unwrap_err();
        assert_eq!(error.problems.len(), 1);
        assert_eq!(error.problems[0].item, "dangling");
        assert_eq!(error.problems[0].message, "no signal connected");
    }

    #[test]
    #[should_panic(
        expected = "Attempted to connect a signal with a width of 3 bits to a connector with a width of 4 bits."
    )]
    fn vector_connector_width_mismatch_error() {
        let design = Design::new();

        let connector = design.vector_connector(4);

        // Panic
        connector.set_connected(design.lit(0, 3));
    }

    #[test]
    #[should_panic(expected = "Attempted to read the value of a connector which has no connected signal.")]
    fn unconnected_connector_value_error() {
        let design = Design::new();

        let connector = design.bit_connector();

        // Panic
        let _ = connector.signal.value();
    }
}
