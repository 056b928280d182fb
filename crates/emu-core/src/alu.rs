//! Status flag engine.
//!
//! Pure functions that derive carry, overflow, zero, negative and parity from
//! an operation's inputs and its already-computed result. Each CPU family maps
//! the [`FlagSet`] onto its own status register layout.
//!
//! All arithmetic wraps. Callers pass operands and results masked to the
//! operation width; bits above the width are ignored.

/// Operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    /// All-ones mask for the width.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Self::Byte => 0x00FF,
            Self::Word => 0xFFFF,
        }
    }

    /// The most significant bit for the width.
    #[must_use]
    pub const fn sign_bit(self) -> u16 {
        match self {
            Self::Byte => 0x0080,
            Self::Word => 0x8000,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Byte => 8,
            Self::Word => 16,
        }
    }
}

/// Flags produced by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagSet {
    /// Unsigned carry out (add) or no-borrow (subtract).
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
    pub zero: bool,
    pub negative: bool,
    /// Odd parity of the low byte of the result.
    pub parity: bool,
}

/// True if `value` has an odd number of set bits.
#[must_use]
pub const fn parity_odd(value: u8) -> bool {
    value.count_ones() & 1 == 1
}

fn result_flags(result: u16, width: Width) -> FlagSet {
    let r = result & width.mask();
    FlagSet {
        carry: false,
        overflow: false,
        zero: r == 0,
        negative: r & width.sign_bit() != 0,
        parity: parity_odd(r as u8),
    }
}

/// Flags after `result = a + b (+ carry in)`.
///
/// Carry is derived from the operand and result sign bits, so the same
/// function serves add-with-carry: the carry in is already folded into
/// `result`.
#[must_use]
pub fn flags_after_add(a: u16, b: u16, result: u16, width: Width) -> FlagSet {
    let sign = width.sign_bit();
    let carries = (a & b) | ((a | b) & !result);
    FlagSet {
        carry: carries & sign != 0,
        overflow: (a ^ result) & (b ^ result) & sign != 0,
        ..result_flags(result, width)
    }
}

/// Flags after `result = a - b (- borrow in)`.
///
/// Carry follows the "no borrow" convention: set when the subtraction did
/// not need to borrow, i.e. `a >= b` for a plain subtract.
#[must_use]
pub fn flags_after_sub(a: u16, b: u16, result: u16, width: Width) -> FlagSet {
    let sign = width.sign_bit();
    let borrows = (!a & b) | ((!a | b) & result);
    FlagSet {
        carry: borrows & sign == 0,
        overflow: (a ^ b) & (a ^ result) & sign != 0,
        ..result_flags(result, width)
    }
}

/// Flags after a logical operation or a move: zero, negative and parity.
#[must_use]
pub fn flags_after_logical(result: u16, width: Width) -> FlagSet {
    result_flags(result, width)
}
