use std::cmp::Ordering;
use std::fmt;

/// The maximum allowed bit width for any given [`Vector`].
///
/// This is currently set to `64` so that a `Vector` can be backed by a single native integer. Larger widths may be supported in a future version of this library.
pub const MAX_VECTOR_BIT_WIDTH: u32 = 64;

/// An immutable bit vector with a fixed width between `0` and [`MAX_VECTOR_BIT_WIDTH`] bits, storing its bits as a two's complement pattern.
///
/// All arithmetic is exact and truncated to the vector's width. Two `Vector`s are equal if and only if both their widths and their bits are equal; leading zeros are significant, so vectors of different widths are never equal even when they are numerically equivalent.
///
/// # Examples
///
/// ```
/// use ripple::Vector;
///
/// let a = Vector::of(8, 0xff);
/// let b = Vector::of(8, 0x01);
/// assert_eq!(a.add(b), Vector::of(8, 0x00)); // Truncated to 8 bits
/// assert_ne!(Vector::of(8, 3), Vector::of(4, 3)); // Different widths are never equal
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vector {
    width: u32,
    bits: u64,
}

impl Vector {
    /// Creates a `Vector` with the specified width whose bits are the given two's complement pattern.
    ///
    /// # Panics
    ///
    /// Panics if `width` is greater than [`MAX_VECTOR_BIT_WIDTH`], or if `value` has bits set above `width`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ripple::Vector;
    ///
    /// let a = Vector::of(4, 0xa);
    /// let b = Vector::of(0, 0); // Zero-width vectors are allowed
    /// ```
    pub fn of(width: u32, value: u64) -> Vector {
        if width > MAX_VECTOR_BIT_WIDTH {
            panic!("Cannot create a vector with {} bit(s). Vectors must not be wider than {} bit(s).", width, MAX_VECTOR_BIT_WIDTH);
        }
        if value & mask(width) != value {
            panic!("Cannot fit the specified value '{}' into the specified bit width '{}'. The value '{}' requires a bit width of at least {} bit(s).", value, width, value, 64 - value.leading_zeros());
        }
        Vector { width, bits: value }
    }

    /// Creates a `Vector` with the specified width whose bits are all `bit`.
    pub fn repeat_bit(width: u32, bit: bool) -> Vector {
        Vector::of(width, if bit { mask(width) } else { 0 })
    }

    /// Creates a `Vector` with the specified width from a string of hexadecimal digits.
    ///
    /// # Panics
    ///
    /// Panics if `digits` is empty or contains a non-hexadecimal character, or if the parsed value doesn't fit into `width` bits.
    pub fn parse_hex(width: u32, digits: &str) -> Vector {
        if digits.is_empty() {
            panic!("Cannot parse a vector from an empty digit string.");
        }
        let mut value: u64 = 0;
        for c in digits.chars() {
            let digit = c.to_digit(16).unwrap_or_else(|| {
                panic!("Cannot parse a vector from the digit string \"{}\" because it contains the non-hexadecimal character '{}'.", digits, c)
            }) as u64;
            value = value.checked_mul(16).and_then(|v| v.checked_add(digit)).unwrap_or_else(|| {
                panic!("Cannot parse a vector from the digit string \"{}\" because its value doesn't fit into 64 bit(s).", digits)
            });
        }
        if width <= MAX_VECTOR_BIT_WIDTH && value & mask(width) != value {
            panic!("Cannot parse a vector from the digit string \"{}\" because its value doesn't fit into the specified bit width '{}'.", digits, width);
        }
        Vector::of(width, value)
    }

    /// Returns the bit width of this `Vector`.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    fn expect_same_width(&self, other: &Vector) -> u64 {
        if self.width != other.width {
            panic!("Vectors have different bit widths ({} and {}, respectively).", self.width, other.width);
        }
        other.bits
    }

    fn truncate(&self, bits: u64) -> Vector {
        Vector {
            width: self.width,
            bits: bits & mask(self.width),
        }
    }

    /// Adds this `Vector` and `other`, truncating the sum to their common width.
    ///
    /// Due to the truncation, the result is the same whether the operands are interpreted as signed or unsigned numbers. If a carry bit is desired, the operands can be [`prepend`]ed with a `0` bit before the operation.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    ///
    /// [`prepend`]: #method.prepend
    pub fn add(&self, other: Vector) -> Vector {
        let other_bits = self.expect_same_width(&other);
        self.truncate(self.bits.wrapping_add(other_bits))
    }

    /// Subtracts `other` from this `Vector`, truncating the difference to their common width.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    pub fn subtract(&self, other: Vector) -> Vector {
        let other_bits = self.expect_same_width(&other);
        self.truncate(self.bits.wrapping_sub(other_bits))
    }

    /// Multiplies this `Vector` and `other`, truncating the product to their common width.
    ///
    /// If the full, double-width product is needed, both operands must be extended to the full width before the operation. Signed/unsigned *does* make a difference then and must be taken into account when extending the operands.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    pub fn multiply(&self, other: Vector) -> Vector {
        let other_bits = self.expect_same_width(&other);
        self.truncate(self.bits.wrapping_mul(other_bits))
    }

    /// Returns the bitwise AND of this `Vector` and `other`.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    pub fn and(&self, other: Vector) -> Vector {
        let other_bits = self.expect_same_width(&other);
        self.truncate(self.bits & other_bits)
    }

    /// Returns the bitwise OR of this `Vector` and `other`.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    pub fn or(&self, other: Vector) -> Vector {
        let other_bits = self.expect_same_width(&other);
        self.truncate(self.bits | other_bits)
    }

    /// Returns the bitwise XOR of this `Vector` and `other`.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    pub fn xor(&self, other: Vector) -> Vector {
        let other_bits = self.expect_same_width(&other);
        self.truncate(self.bits ^ other_bits)
    }

    /// Returns the bitwise XNOR of this `Vector` and `other`.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    pub fn xnor(&self, other: Vector) -> Vector {
        let other_bits = self.expect_same_width(&other);
        self.truncate(!(self.bits ^ other_bits))
    }

    /// Returns the bitwise NOT of this `Vector`.
    pub fn not(&self) -> Vector {
        self.truncate(!self.bits)
    }

    /// Returns the two's complement negation of this `Vector`.
    pub fn negate(&self) -> Vector {
        self.truncate(self.bits.wrapping_neg())
    }

    /// Returns the value of the single bit at `index`, where `index` equal to `0` represents this `Vector`'s least significant bit.
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than or equal to this `Vector`'s width.
    pub fn select(&self, index: u32) -> bool {
        if index >= self.width {
            panic!("Attempted to select bit index {} from a vector with a width of {} bits. Bit indices must be in the range [0, {}] for a vector with a width of {} bits.", index, self.width, self.width - 1, self.width);
        }
        (self.bits >> index) & 1 != 0
    }

    /// Returns the value of the single bit addressed by the `index` vector, interpreted as an unsigned number.
    ///
    /// # Panics
    ///
    /// Panics if `index`'s address space doesn't fit into this `Vector`, that is, if `2^index.width()` is greater than this `Vector`'s width.
    pub fn select_dynamic(&self, index: Vector) -> bool {
        if index.width > 31 || (1u64 << index.width) > self.width as u64 {
            panic!("Attempted to select a bit from a vector with a width of {} bits using an index with a width of {} bits, but that index addresses {} bit(s).", self.width, index.width, 1u64 << index.width.min(63));
        }
        self.select(index.to_u32())
    }

    /// Returns the contiguous range of bits from `from` down to `to`, both inclusive, as a new `Vector` with `from - to + 1` bits.
    ///
    /// # Panics
    ///
    /// Panics if `from` is greater than or equal to this `Vector`'s width, or if `from` is less than `to`.
    pub fn select_range(&self, from: u32, to: u32) -> Vector {
        if from >= self.width || from < to {
            panic!("Attempted to select the bit range [{}:{}] from a vector with a width of {} bits. The bounds must satisfy width > from >= to.", from, to, self.width);
        }
        let selected_width = from - to + 1;
        Vector {
            width: selected_width,
            bits: (self.bits >> to) & mask(selected_width),
        }
    }

    /// Concatenates this `Vector` (upper bits) with `other` (lower bits).
    ///
    /// # Panics
    ///
    /// Panics if the combined width is greater than [`MAX_VECTOR_BIT_WIDTH`].
    pub fn concat(&self, other: Vector) -> Vector {
        let combined_width = self.width + other.width;
        if combined_width > MAX_VECTOR_BIT_WIDTH {
            panic!("Attempted to concatenate vectors with {} bit(s) and {} bit(s) respectively, but this would result in a bit width of {}, which is greater than the maximum vector bit width of {} bit(s).", self.width, other.width, combined_width, MAX_VECTOR_BIT_WIDTH);
        }
        Vector {
            width: combined_width,
            bits: if other.width == 64 { other.bits } else { (self.bits << other.width) | other.bits },
        }
    }

    /// Concatenates this `Vector` (upper bits) with a single bit (lowest bit).
    ///
    /// # Panics
    ///
    /// Panics if the combined width is greater than [`MAX_VECTOR_BIT_WIDTH`].
    pub fn concat_bit(&self, bit: bool) -> Vector {
        self.concat(Vector::of(1, bit as u64))
    }

    /// Concatenates a single bit (highest bit) with this `Vector` (lower bits).
    ///
    /// # Panics
    ///
    /// Panics if the combined width is greater than [`MAX_VECTOR_BIT_WIDTH`].
    pub fn prepend(&self, bit: bool) -> Vector {
        Vector::of(1, bit as u64).concat(*self)
    }

    /// Returns this `Vector` shifted left by `amount` bits, with the same width. Shifted-in bits are zero; shifted-out bits are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is greater than or equal to this `Vector`'s width.
    pub fn shift_left(&self, amount: u32) -> Vector {
        if amount >= self.width {
            panic!("Attempted to shift a vector with a width of {} bits by {} bit(s). Shift amounts must be in the range [0, {}] for a vector with a width of {} bits.", self.width, amount, self.width - 1, self.width);
        }
        self.truncate(self.bits << amount)
    }

    /// Returns this `Vector` shifted right by `amount` bits, with the same width. Shifted-in bits are zero; shifted-out bits are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is greater than or equal to this `Vector`'s width.
    pub fn shift_right(&self, amount: u32) -> Vector {
        if amount >= self.width {
            panic!("Attempted to shift a vector with a width of {} bits by {} bit(s). Shift amounts must be in the range [0, {}] for a vector with a width of {} bits.", self.width, amount, self.width - 1, self.width);
        }
        self.truncate(self.bits >> amount)
    }

    /// Numerically compares the unsigned meanings of this `Vector` and `other`.
    ///
    /// # Panics
    ///
    /// Panics if the bit widths of the operands aren't equal.
    pub fn compare_unsigned(&self, other: Vector) -> Ordering {
        let other_bits = self.expect_same_width(&other);
        self.bits.cmp(&other_bits)
    }

    /// Returns the value of this `Vector` as a `u32`, using unsigned representation.
    ///
    /// # Panics
    ///
    /// Panics if this `Vector` is wider than 32 bits.
    pub fn to_u32(&self) -> u32 {
        if self.width > 32 {
            panic!("Cannot convert a vector with a width of {} bits to a 32-bit integer.", self.width);
        }
        self.bits as u32
    }

    /// Returns the value of this `Vector` as a `u64`, using unsigned representation.
    #[must_use]
    pub fn to_u64(&self) -> u64 {
        self.bits
    }

    /// Returns the value of this `Vector` as an `i64`, using signed (sign-extended) representation.
    #[must_use]
    pub fn to_i64(&self) -> i64 {
        if self.width == 0 || self.width == 64 || (self.bits >> (self.width - 1)) & 1 == 0 {
            self.bits as i64
        } else {
            (self.bits | !mask(self.width)) as i64
        }
    }

    /// Returns this `Vector`'s bits as a zero-padded string of lowercase hexadecimal digits, one digit per 4 bits (rounded up).
    ///
    /// This is the row format used by memory initialization files.
    #[must_use]
    pub fn digits(&self) -> String {
        let digit_count = ((self.width + 3) / 4) as usize;
        format!("{:0>width$x}", self.bits, width = digit_count)
    }
}

/// Prints the Verilog literal form, `<width>'h<digits>`.
impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'h{}", self.width, self.digits())
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_subtract_round_trip() {
        for width in [1, 4, 8, 63, 64] {
            let a = Vector::of(width, 0xab & mask(width));
            let b = Vector::of(width, 0x35 & mask(width));
            assert_eq!(a.add(b).subtract(b), a);
        }
    }

    #[test]
    fn of_round_trips_through_to_u64() {
        for (width, value) in [(1, 1), (4, 9), (16, 0xffff), (64, u64::MAX)] {
            assert_eq!(Vector::of(width, value).to_u64(), value);
        }
    }

    #[test]
    fn add_truncates() {
        let a = Vector::of(8, 0xff);
        let b = Vector::of(8, 0x02);
        assert_eq!(a.add(b), Vector::of(8, 0x01));
    }

    #[test]
    fn widths_are_significant_for_equality() {
        assert_ne!(Vector::of(8, 3), Vector::of(4, 3));
        assert_eq!(Vector::of(4, 3), Vector::of(4, 3));
    }

    #[test]
    fn concat_width_law() {
        let x = Vector::of(5, 0x15);
        let y = Vector::of(7, 0x2a);
        let combined = x.concat(y);
        assert_eq!(combined.width(), x.width() + y.width());
        assert_eq!(combined.select_range(y.width() - 1, 0), y);
        assert_eq!(combined.select_range(combined.width() - 1, y.width()), x);
    }

    #[test]
    fn prepend_and_concat_bit() {
        let v = Vector::of(3, 0b101);
        assert_eq!(v.prepend(true), Vector::of(4, 0b1101));
        assert_eq!(v.concat_bit(true), Vector::of(4, 0b1011));
    }

    #[test]
    fn negate_is_twos_complement() {
        assert_eq!(Vector::of(4, 1).negate(), Vector::of(4, 0xf));
        assert_eq!(Vector::of(4, 0).negate(), Vector::of(4, 0));
    }

    #[test]
    fn xnor_is_not_xor() {
        let a = Vector::of(4, 0b1100);
        let b = Vector::of(4, 0b1010);
        assert_eq!(a.xnor(b), a.xor(b).not());
    }

    #[test]
    fn shifts_fill_with_zeros() {
        let v = Vector::of(4, 0b1001);
        assert_eq!(v.shift_left(1), Vector::of(4, 0b0010));
        assert_eq!(v.shift_right(1), Vector::of(4, 0b0100));
        assert_eq!(v.shift_left(0), v);
    }

    #[test]
    fn select_dynamic_uses_unsigned_index() {
        let v = Vector::of(4, 0b0100);
        assert!(v.select_dynamic(Vector::of(2, 2)));
        assert!(!v.select_dynamic(Vector::of(2, 3)));
    }

    #[test]
    fn compare_unsigned_orders_numerically() {
        let a = Vector::of(4, 3);
        let b = Vector::of(4, 9);
        assert_eq!(a.compare_unsigned(b), Ordering::Less);
        assert_eq!(b.compare_unsigned(a), Ordering::Greater);
        assert_eq!(a.compare_unsigned(a), Ordering::Equal);
    }

    #[test]
    fn to_i64_sign_extends() {
        assert_eq!(Vector::of(4, 0xf).to_i64(), -1);
        assert_eq!(Vector::of(4, 0x7).to_i64(), 7);
        assert_eq!(Vector::of(64, u64::MAX).to_i64(), -1);
    }

    #[test]
    fn digits_are_zero_padded() {
        assert_eq!(Vector::of(16, 0xbe).digits(), "00be");
        assert_eq!(Vector::of(7, 0x05).digits(), "05");
        assert_eq!(Vector::of(4, 0xa).digits(), "a");
    }

    #[test]
    fn display_is_a_verilog_literal() {
        assert_eq!(Vector::of(12, 0xaf).to_string(), "12'h0af");
        assert_eq!(Vector::of(1, 1).to_string(), "1'h1");
    }

    #[test]
    fn parse_hex_round_trips_digits() {
        let v = Vector::of(20, 0xbeef);
        assert_eq!(Vector::parse_hex(20, &v.digits()), v);
    }

    #[test]
    #[should_panic(expected = "Cannot create a vector with 65 bit(s). Vectors must not be wider than 64 bit(s).")]
    fn of_width_gt_max_error() {
        let _ = Vector::of(65, 0);
    }

    #[test]
    #[should_panic(
        expected = "Cannot fit the specified value '16' into the specified bit width '4'. The value '16' requires a bit width of at least 5 bit(s)."
    )]
    fn of_value_does_not_fit_error() {
        let _ = Vector::of(4, 16);
    }

    #[test]
    #[should_panic(expected = "Vectors have different bit widths (4 and 5, respectively).")]
    fn add_width_mismatch_error() {
        let _ = Vector::of(4, 0).add(Vector::of(5, 0));
    }

    #[test]
    #[should_panic(
        expected = "Attempted to select bit index 4 from a vector with a width of 4 bits. Bit indices must be in the range [0, 3] for a vector with a width of 4 bits."
    )]
    fn select_index_oob_error() {
        let _ = Vector::of(4, 0).select(4);
    }

    #[test]
    #[should_panic(
        expected = "Attempted to select the bit range [3:1] from a vector with a width of 3 bits. The bounds must satisfy width > from >= to."
    )]
    fn select_range_from_oob_error() {
        let _ = Vector::of(3, 0).select_range(3, 1);
    }

    #[test]
    #[should_panic(
        expected = "Attempted to shift a vector with a width of 4 bits by 4 bit(s). Shift amounts must be in the range [0, 3] for a vector with a width of 4 bits."
    )]
    fn shift_amount_oob_error() {
        let _ = Vector::of(4, 0).shift_left(4);
    }

    #[test]
    #[should_panic(
        expected = "Attempted to concatenate vectors with 64 bit(s) and 1 bit(s) respectively, but this would result in a bit width of 65, which is greater than the maximum vector bit width of 64 bit(s)."
    )]
    fn concat_width_oob_error() {
        let _ = Vector::of(64, 0).concat(Vector::of(1, 0));
    }

    #[test]
    #[should_panic(expected = "Cannot convert a vector with a width of 33 bits to a 32-bit integer.")]
    fn to_u32_width_oob_error() {
        let _ = Vector::of(33, 0).to_u32();
    }

    #[test]
    #[should_panic(
        expected = "Cannot parse a vector from the digit string \"0g\" because it contains the non-hexadecimal character 'g'."
    )]
    fn parse_hex_bad_digit_error() {
        let _ = Vector::parse_hex(8, "0g");
    }
}
