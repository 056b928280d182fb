//! TMS9995 on-chip resources.
//!
//! - 256 bytes of RAM at F000-F0FB plus the NMI vector at FFFC-FFFF
//! - The decrementer, a 16-bit down counter at FFFA
//! - The internal flag register at CRU bit addresses F70-F7F
//! - The MID (macro instruction detected) flag at CRU bit address FED
//!
//! None of these ever reach the external bus.

use serde::{Deserialize, Serialize};

/// Line numbers of the TMS9995 interrupt sources.
pub const INT1: u8 = 1;
/// Arithmetic overflow and illegal opcode (MID) trap.
pub const INTERNAL: u8 = 2;
pub const DECREMENTER: u8 = 3;
pub const INT4: u8 = 4;

/// Decrementer register address.
pub const DECREMENTER_ADDR: u16 = 0xFFFA;
/// First CRU bit of the flag register.
pub const FLAG_BASE: u16 = 0x0F70;
/// CRU bit of the MID flag.
pub const MID_BIT: u16 = 0x0FED;

/// Flag register bit 0: decrementer counts INT4 edges instead of time.
pub const FLAG_EVENT_COUNTER: u16 = 0x0001;
/// Flag register bit 1: decrementer enabled.
pub const FLAG_DECREMENTER_ENABLE: u16 = 0x0002;

/// Flag register bits that mirror interrupt latches, and the line each one
/// mirrors.
pub const LATCH_FLAGS: [(u16, u8); 3] = [(2, INT1), (3, DECREMENTER), (4, INT4)];

/// What lives at an on-chip address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Byte offset into on-chip RAM.
    Ram(usize),
    /// Byte of the decrementer, 0 = MSB.
    Decrementer(u16),
    External,
}

/// Map an address to the on-chip resource behind it.
#[must_use]
pub const fn region(addr: u16) -> Region {
    match addr {
        0xF000..=0xF0FB => Region::Ram((addr - 0xF000) as usize),
        0xFFFC..=0xFFFF => Region::Ram((addr - 0xFFFC) as usize + 0xFC),
        0xFFFA..=0xFFFB => Region::Decrementer(addr - 0xFFFA),
        _ => Region::External,
    }
}

/// The 16-bit decrementer.
///
/// Writing the register sets both the start value and the count. The count
/// reloads from the start value when it reaches zero; a start value of zero
/// stops it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decrementer {
    pub start: u16,
    pub count: u16,
}

impl Decrementer {
    pub fn write(&mut self, value: u16) {
        self.start = value;
        self.count = value;
    }

    /// Write one byte of the start value. `byte` 0 is the MSB.
    pub fn write_byte(&mut self, byte: u16, value: u8) {
        let [hi, lo] = self.start.to_be_bytes();
        let word = if byte == 0 {
            u16::from_be_bytes([value, lo])
        } else {
            u16::from_be_bytes([hi, value])
        };
        self.write(word);
    }

    /// Count once. Returns true when the count reaches zero.
    pub fn clock(&mut self) -> bool {
        if self.start == 0 {
            return false;
        }
        self.count = self.count.wrapping_sub(1);
        if self.count == 0 {
            self.count = self.start;
            true
        } else {
            false
        }
    }
}

/// TMS9995 on-chip state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChip {
    pub ram: Vec<u8>,
    pub decrementer: Decrementer,
    /// Flag register bits other than the latch mirrors.
    pub flags: u16,
    pub mid: bool,
    /// Last level seen on INT4, for event counting.
    pub int4: bool,
}

impl Default for OnChip {
    fn default() -> Self {
        Self {
            ram: vec![0; 0x100],
            decrementer: Decrementer::default(),
            flags: 0,
            mid: false,
            int4: false,
        }
    }
}

impl OnChip {
    /// Whether the decrementer counts CPU time.
    #[must_use]
    pub const fn timer_running(&self) -> bool {
        self.flags & (FLAG_DECREMENTER_ENABLE | FLAG_EVENT_COUNTER) == FLAG_DECREMENTER_ENABLE
    }

    #[must_use]
    pub const fn event_counting(&self) -> bool {
        self.flags & FLAG_EVENT_COUNTER != 0
    }

    /// Clear everything except RAM, which keeps its contents over a reset.
    pub fn reset(&mut self) {
        self.decrementer = Decrementer::default();
        self.flags = 0;
        self.mid = false;
    }
}
