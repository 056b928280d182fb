//! Variant definitions for the TMS9900 family.
//!
//! The three members share one instruction set core but differ in bus width,
//! address range, interrupt wiring and how they treat unassigned opcodes.
//! The TMS9995 adds a handful of instructions and on-chip resources.

use std::fmt;

use emu_core::{IllegalOpcode, LatchPolicy};
use serde::{Deserialize, Serialize};

/// Selected TMS9900 family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tms9900Model {
    /// TMS9900: 16-bit data bus, 15 interrupt levels plus LOAD.
    Tms9900,
    /// TMS9980A: 8-bit data bus, 14-bit address bus, levels 1-4 plus LOAD.
    Tms9980A,
    /// TMS9995: 8-bit data bus, on-chip RAM and decrementer.
    Tms9995,
}

/// Which opcode table and cycle column a variant uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstructionSet {
    Tms9900,
    /// Adds LST, LWP, DIVS and MPYS and decodes don't-care bits strictly.
    Tms9995,
}

/// External data bus width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBus {
    /// Byte operands are read as whole words and written back with a
    /// read-modify-write.
    Word,
    /// Every byte operand is a single bus cycle.
    Byte,
}

/// Core configuration for one TMS9900 variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub instruction_set: InstructionSet,
    pub data_bus: DataBus,
    /// Mask applied to every address before it reaches the bus.
    pub address_mask: u16,
    /// Writable status bits.
    pub st_mask: u16,
    /// Number of maskable interrupt levels, counting level 0. Line `n` below
    /// this is level `n`; line `levels` is LOAD.
    pub levels: u8,
    pub latch: LatchPolicy,
    pub illegal: IllegalOpcode,
    /// Read the destination of MOV/MOVB before writing it.
    pub dummy_dest_read: bool,
    /// Extra cycles charged per external byte transfer.
    pub byte_access_cycles: u8,
    /// On-chip RAM, decrementer, flag register and MID flag.
    pub on_chip: bool,
    /// CPU cycles per decrementer clock.
    pub tick_divider: u32,
}

impl Config {
    /// Interrupt line number of the non-maskable LOAD input.
    #[must_use]
    pub const fn load_line(&self) -> u8 {
        self.levels
    }
}

/// Fixed cycle costs that are not part of an opcode's table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Word operand overhead for register, indirect, symbolic/indexed and
    /// autoincrement modes.
    pub mode_word: [u8; 4],
    /// Byte operand overhead, same order.
    pub mode_byte: [u8; 4],
    pub jump_taken: u8,
    pub shift_per_bit: u8,
    /// Extra cost when a shift count comes from R0.
    pub shift_from_r0: u8,
    pub cru_per_bit: u8,
    pub abs_negative: u8,
    /// Added to a DIV/DIVS entry (the overflow cost) when it divides.
    pub div_extra: u8,
    /// Added per set bit of the quotient.
    pub div_per_bit: u8,
    /// BLWP-style context switch taken for an interrupt or LOAD.
    pub interrupt: u8,
    pub reset: u8,
}

impl InstructionSet {
    #[must_use]
    pub const fn timing(self) -> Timing {
        match self {
            Self::Tms9900 => Timing {
                mode_word: [0, 4, 8, 8],
                mode_byte: [0, 4, 8, 6],
                jump_taken: 2,
                shift_per_bit: 2,
                shift_from_r0: 8,
                cru_per_bit: 2,
                abs_negative: 2,
                div_extra: 76,
                div_per_bit: 2,
                interrupt: 22,
                reset: 26,
            },
            Self::Tms9995 => Timing {
                mode_word: [0, 1, 2, 2],
                mode_byte: [0, 1, 2, 2],
                jump_taken: 0,
                shift_per_bit: 1,
                shift_from_r0: 2,
                cru_per_bit: 1,
                abs_negative: 0,
                div_extra: 22,
                div_per_bit: 0,
                interrupt: 14,
                reset: 14,
            },
        }
    }
}

impl Tms9900Model {
    #[must_use]
    pub const fn config(self) -> Config {
        match self {
            Self::Tms9900 => Config {
                instruction_set: InstructionSet::Tms9900,
                data_bus: DataBus::Word,
                address_mask: 0xFFFF,
                st_mask: 0xFE0F,
                levels: 16,
                latch: LatchPolicy::Combinatorial,
                illegal: IllegalOpcode::Ignore { cycles: 6 },
                dummy_dest_read: true,
                byte_access_cycles: 0,
                on_chip: false,
                tick_divider: 4,
            },
            Self::Tms9980A => Config {
                instruction_set: InstructionSet::Tms9900,
                data_bus: DataBus::Byte,
                address_mask: 0x3FFF,
                st_mask: 0xFE0F,
                levels: 5,
                latch: LatchPolicy::Combinatorial,
                illegal: IllegalOpcode::Ignore { cycles: 6 },
                dummy_dest_read: true,
                byte_access_cycles: 1,
                on_chip: false,
                tick_divider: 4,
            },
            Self::Tms9995 => Config {
                instruction_set: InstructionSet::Tms9995,
                data_bus: DataBus::Byte,
                address_mask: 0xFFFF,
                st_mask: 0xFE2F,
                levels: 5,
                latch: LatchPolicy::EdgeLatched,
                illegal: IllegalOpcode::Trap,
                dummy_dest_read: false,
                byte_access_cycles: 0,
                on_chip: true,
                tick_divider: 4,
            },
        }
    }
}

impl fmt::Display for Tms9900Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tms9900 => "TMS9900",
            Self::Tms9980A => "TMS9980A",
            Self::Tms9995 => "TMS9995",
        };
        f.write_str(name)
    }
}
