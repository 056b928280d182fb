//! TMS9900 status register.
//!
//! The status register is 16 bits, MSB first:
//! - Bit 0 (0x8000): Logical greater than (L>)
//! - Bit 1 (0x4000): Arithmetic greater than (A>)
//! - Bit 2 (0x2000): Equal (EQ)
//! - Bit 3 (0x1000): Carry (C)
//! - Bit 4 (0x0800): Overflow (OV)
//! - Bit 5 (0x0400): Odd parity (OP), byte operations only
//! - Bit 6 (0x0200): Extended operation (X)
//! - Bit 10 (0x0020): Overflow interrupt enable (TMS9995 only)
//! - Bits 12-15: Interrupt mask

use emu_core::{FlagSet, Width};

/// Logical greater than.
pub const LGT: u16 = 0x8000;
/// Arithmetic greater than.
pub const AGT: u16 = 0x4000;
/// Equal.
pub const EQ: u16 = 0x2000;
/// Carry.
pub const C: u16 = 0x1000;
/// Overflow.
pub const OV: u16 = 0x0800;
/// Odd parity.
pub const OP: u16 = 0x0400;
/// XOP in progress.
pub const X: u16 = 0x0200;
/// Arithmetic overflow interrupt enable.
pub const OVIE: u16 = 0x0020;
/// Interrupt mask.
pub const MASK: u16 = 0x000F;

/// L>, A> and EQ from a result compared against zero.
#[must_use]
pub const fn lae(st: u16, value: u16, width: Width) -> u16 {
    let v = value & width.mask();
    let mut result = st & !(LGT | AGT | EQ);
    if v == 0 {
        result |= EQ;
    } else {
        result |= LGT;
        if v & width.sign_bit() == 0 {
            result |= AGT;
        }
    }
    result
}

/// L>, A>, EQ and, for bytes, OP from a result.
#[must_use]
pub const fn lae_p(st: u16, value: u16, width: Width) -> u16 {
    let st = lae(st, value, width);
    match width {
        Width::Byte => with(st, OP, (value as u8).count_ones() & 1 == 1),
        Width::Word => st,
    }
}

/// Full arithmetic update: L>, A>, EQ, C, OV and OP for bytes.
#[must_use]
pub const fn arithmetic(st: u16, result: u16, flags: FlagSet, width: Width) -> u16 {
    let st = lae_p(st, result, width);
    let st = with(st, C, flags.carry);
    with(st, OV, flags.overflow)
}

/// Compare `s` with `d`: L> when `s > d` unsigned, A> when signed, EQ when
/// equal.
#[must_use]
pub const fn compare(st: u16, s: u16, d: u16, width: Width) -> u16 {
    let s = s & width.mask();
    let d = d & width.mask();
    let mut result = st & !(LGT | AGT | EQ);
    if s == d {
        result |= EQ;
    }
    if s > d {
        result |= LGT;
    }
    let flip = width.sign_bit();
    if (s ^ flip) > (d ^ flip) {
        result |= AGT;
    }
    result
}

/// Set or clear `bit`.
#[must_use]
pub const fn with(st: u16, bit: u16, set: bool) -> u16 {
    if set { st | bit } else { st & !bit }
}
