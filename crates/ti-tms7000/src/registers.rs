//! TMS7000 registers.
//!
//! - PC: Program counter (16-bit)
//! - SP: Stack pointer (8-bit, indexes the register file)
//! - ST: Status register (8-bit)
//! - R0-R255: Register file, on chip at 0x0000. A is R0, B is R1.

use std::fmt;

use thiserror::Error;

/// A register the host can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Pc,
    Sp,
    St,
    A,
    B,
    /// Register file byte `n`. Only valid below the variant's file size.
    R(u16),
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pc => f.write_str("PC"),
            Self::Sp => f.write_str("SP"),
            Self::St => f.write_str("ST"),
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
            Self::R(n) => write!(f, "R{n}"),
        }
    }
}

/// The register id does not exist on this variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no register {0} on this variant")]
pub struct InvalidRegister(pub Register);

/// Snapshot of the programmer-visible registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub pc: u16,
    pub sp: u8,
    pub st: u8,
    pub a: u8,
    pub b: u8,
}
