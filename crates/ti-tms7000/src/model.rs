//! Variant definitions for the TMS7000 family.
//!
//! The members differ in register file size and on-chip ROM. ROM contents
//! are the host's business (it sits behind the bus like any other memory),
//! so only the register file size reaches the core.

use std::fmt;

use emu_core::IllegalOpcode;
use serde::{Deserialize, Serialize};

/// Selected TMS7000 family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tms7000Model {
    /// TMS7000: ROM-less, 128-byte register file.
    Tms7000,
    /// TMS7020: 2 KB ROM, 128-byte register file.
    Tms7020,
    /// TMS7040: 4 KB ROM, 256-byte register file.
    Tms7040,
    /// TMS70C40: CMOS 4 KB ROM, 256-byte register file.
    Tms70C40,
}

/// Core configuration for one TMS7000 variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// On-chip register file size in bytes (128 or 256). The core clamps
    /// it to `2..=256` so A and B exist and the peripheral file at 0x0100
    /// stays visible.
    pub rf_size: u16,
    /// What an unassigned opcode does. `Trap` vectors through TRAP 0.
    pub illegal: IllegalOpcode,
    /// CPU cycles per timer 1 clock.
    pub tick_divider: u32,
}

impl Tms7000Model {
    #[must_use]
    pub const fn config(self) -> Config {
        let rf_size = match self {
            Self::Tms7000 | Self::Tms7020 => 128,
            Self::Tms7040 | Self::Tms70C40 => 256,
        };
        Config {
            rf_size,
            illegal: IllegalOpcode::Ignore { cycles: 4 },
            tick_divider: 16,
        }
    }
}

impl fmt::Display for Tms7000Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tms7000 => "TMS7000",
            Self::Tms7020 => "TMS7020",
            Self::Tms7040 => "TMS7040",
            Self::Tms70C40 => "TMS70C40",
        };
        f.write_str(name)
    }
}
