//! TMS7000 status register.
//!
//! The status register is 8 bits:
//! - Bit 7: Carry (C). After a subtract or compare, set means no borrow.
//! - Bit 6: Sign (N)
//! - Bit 5: Zero (Z)
//! - Bit 4: Global interrupt enable (I)
//! - Bits 0-3: Unused, always 0

use emu_core::FlagSet;

/// Carry flag.
pub const C: u8 = 0x80;
/// Sign flag.
pub const N: u8 = 0x40;
/// Zero flag.
pub const Z: u8 = 0x20;
/// Global interrupt enable.
pub const I: u8 = 0x10;

/// Bits that exist in the status register.
pub const ST_MASK: u8 = 0xF0;

/// Replace N and Z from `value`, clear C, keep I.
#[must_use]
pub const fn logical(st: u8, value: u8) -> u8 {
    let mut result = st & I;
    if value == 0 {
        result |= Z;
    }
    if value & 0x80 != 0 {
        result |= N;
    }
    result
}

/// Replace C, N and Z from an arithmetic result, keep I.
#[must_use]
pub const fn arithmetic(st: u8, flags: FlagSet) -> u8 {
    let mut result = st & I;
    if flags.carry {
        result |= C;
    }
    if flags.negative {
        result |= N;
    }
    if flags.zero {
        result |= Z;
    }
    result
}

/// Set or clear C, leaving everything else alone.
#[must_use]
pub const fn with_carry(st: u8, carry: bool) -> u8 {
    if carry { st | C } else { st & !C }
}
