//! TMS9900 registers.
//!
//! - PC: Program counter (16-bit, always even)
//! - WP: Workspace pointer (16-bit, always even)
//! - ST: Status register (16-bit)
//! - R0-R15: Workspace registers, memory words at WP + 2n

use std::fmt;

use thiserror::Error;

/// A register the host can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Pc,
    Wp,
    St,
    /// Workspace register `n`, 0-15.
    R(u8),
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pc => f.write_str("PC"),
            Self::Wp => f.write_str("WP"),
            Self::St => f.write_str("ST"),
            Self::R(n) => write!(f, "R{n}"),
        }
    }
}

/// The register id does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no register {0} on the TMS9900")]
pub struct InvalidRegister(pub Register);

/// Snapshot of the on-chip registers. Workspace registers live in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub pc: u16,
    pub wp: u16,
    pub st: u16,
}
