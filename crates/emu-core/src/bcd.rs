//! Packed BCD arithmetic.
//!
//! Two-digit packed BCD operands in the low byte of a `u16`. Sums carry into
//! bit 8. Digits are corrected in parallel: bias every nibble by 6, add, then
//! take the 6 back out of each nibble that did not produce a decimal carry.

/// Packed BCD addition. Bit 8 of the result is the decimal carry.
#[must_use]
pub const fn bcd_add(a: u16, b: u16) -> u16 {
    let t1 = a.wrapping_add(0x0666);
    let t2 = t1.wrapping_add(b);
    let t3 = t1 ^ b;
    let t4 = t2 ^ t3;
    let t5 = !t4 & 0x1110;
    let t6 = (t5 >> 2) | (t5 >> 3);
    t2.wrapping_sub(t6)
}

/// Ten's complement of a packed BCD value, for subtraction by addition.
#[must_use]
pub const fn bcd_ten_complement(a: u16) -> u16 {
    let t1 = 0xFFFF_u16.wrapping_sub(a);
    let t2 = 0_u16.wrapping_sub(a);
    let t3 = t1 ^ 0x0001;
    let t4 = t2 ^ t3;
    let t5 = !t4 & 0x1110;
    let t6 = (t5 >> 2) | (t5 >> 3);
    t2.wrapping_sub(t6)
}

/// Packed BCD subtraction `a - b`.
///
/// Bit 8 of the result is set when no borrow occurred, except when `b` is
/// zero: the complement of zero is zero, so nothing carries out even though
/// nothing was borrowed. Callers that need a no-borrow flag treat `b == 0`
/// as no borrow.
#[must_use]
pub const fn bcd_sub(a: u16, b: u16) -> u16 {
    bcd_add(a, bcd_ten_complement(b) & 0xFF)
}
