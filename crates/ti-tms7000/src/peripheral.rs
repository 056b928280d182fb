//! On-chip peripheral file: interrupt control and timer 1.
//!
//! The peripheral file occupies 0x0100-0x01FF. The core itself implements
//! the registers that feed its interrupt logic:
//!
//! - P0 (IOCNT0): interrupt enables (bits 0, 2, 4) and flags (bits 1, 3, 5).
//!   Writing 1 to a flag bit clears it.
//! - P2 (T1DATA): write sets the decrementer reload value, read returns the
//!   live decrementer.
//! - P3 (T1CTL): write sets start (bit 7), clock source (bit 6) and prescale
//!   reload (bits 0-4); read returns the capture latch.
//!
//! P4-P11 are the I/O ports and go to the bus I/O space. Everything else is
//! external peripheral expansion on the memory bus.

use serde::{Deserialize, Serialize};

/// Interrupt input numbering used by the core.
pub const INT1: u8 = 0;
pub const INT2: u8 = 1;
pub const INT3: u8 = 2;

/// IOCNT0 enable bit for each line.
#[must_use]
pub const fn enable_bit(line: u8) -> u8 {
    1 << (line * 2)
}

/// IOCNT0 flag bit for each line.
#[must_use]
pub const fn flag_bit(line: u8) -> u8 {
    2 << (line * 2)
}

const FLAG_BITS: u8 = 0x2A;
const ENABLE_BITS: u8 = 0x15;

/// Timer 1 control bits.
const T1_START: u8 = 0x80;
const T1_EXTERNAL: u8 = 0x40;
const T1_PRESCALE: u8 = 0x1F;

/// Timer 1: a 5-bit prescaler feeding an 8-bit decrementer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer1 {
    /// Decrementer reload value (T1DATA writes).
    pub reload: u8,
    /// Control register (T1CTL writes).
    pub control: u8,
    /// Live prescaler count.
    pub prescaler: u8,
    /// Live decrementer count.
    pub decrementer: u8,
    /// Decrementer value captured on the last INT3 edge.
    pub capture: u8,
}

impl Timer1 {
    pub fn write_control(&mut self, value: u8) {
        self.control = value;
        if value & T1_START != 0 {
            self.prescaler = value & T1_PRESCALE;
            self.decrementer = self.reload;
        }
    }

    #[must_use]
    pub fn running(&self) -> bool {
        self.control & T1_START != 0 && self.control & T1_EXTERNAL == 0
    }

    /// One timer clock. Returns true when the decrementer underflows.
    pub fn clock(&mut self) -> bool {
        if !self.running() {
            return false;
        }
        if self.prescaler > 0 {
            self.prescaler -= 1;
            return false;
        }
        self.prescaler = self.control & T1_PRESCALE;
        if self.decrementer > 0 {
            self.decrementer -= 1;
            return false;
        }
        self.decrementer = self.reload;
        true
    }
}

/// The peripheral registers owned by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralFile {
    /// IOCNT0 without its flag bits, which live in the interrupt latches.
    pub iocnt0: u8,
    pub timer1: Timer1,
}

/// Where a peripheral-file access goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Iocnt0,
    T1Data,
    T1Ctl,
    /// I/O port `n` (P4-P11).
    Port(u8),
    /// External memory at 0x0100 + n.
    External,
}

impl PeripheralFile {
    #[must_use]
    pub const fn route(n: u8) -> Route {
        match n {
            0 => Route::Iocnt0,
            2 => Route::T1Data,
            3 => Route::T1Ctl,
            4..=11 => Route::Port(n),
            _ => Route::External,
        }
    }

    /// Compose IOCNT0 from the stored bits and the current interrupt flags.
    #[must_use]
    pub fn read_iocnt0(&self, flags: [bool; 3]) -> u8 {
        let mut value = self.iocnt0 & !FLAG_BITS;
        for (line, set) in flags.into_iter().enumerate() {
            if set {
                value |= flag_bit(line as u8);
            }
        }
        value
    }

    /// Store an IOCNT0 write. Returns, per line, whether the write clears
    /// its flag.
    pub fn write_iocnt0(&mut self, value: u8) -> [bool; 3] {
        self.iocnt0 = value & !FLAG_BITS;
        std::array::from_fn(|line| value & flag_bit(line as u8) != 0)
    }

    #[must_use]
    pub fn enabled(&self, line: u8) -> bool {
        self.iocnt0 & ENABLE_BITS & enable_bit(line) != 0
    }
}
