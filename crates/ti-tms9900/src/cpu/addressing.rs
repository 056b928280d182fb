//! General addressing modes.
//!
//! Format I, III, IV, VI and IX operands are a 2-bit mode and a 4-bit
//! register number:
//!
//! | T | Syntax          | Address                                 |
//! |---|-----------------|-----------------------------------------|
//! | 0 | `Rn`            | `WP + 2n`                               |
//! | 1 | `*Rn`           | contents of Rn                          |
//! | 2 | `@addr` / `@addr(Rn)` | extension word, plus Rn when n != 0 |
//! | 3 | `*Rn+`          | contents of Rn, then Rn += 1 or 2       |

use emu_core::{Bus, Width};

use super::Tms9900;

/// Mode and register fields of a source (bits 0-5) or destination
/// (bits 6-11) operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Operand {
    pub mode: u16,
    pub reg: u16,
}

impl Operand {
    pub(crate) const fn source(opcode: u16) -> Self {
        Self {
            mode: (opcode >> 4) & 3,
            reg: opcode & 0xF,
        }
    }

    pub(crate) const fn destination(opcode: u16) -> Self {
        Self {
            mode: (opcode >> 10) & 3,
            reg: (opcode >> 6) & 0xF,
        }
    }
}

impl Tms9900 {
    /// Work out an operand's address, fetching any extension word and
    /// applying autoincrement. Returns the address and the mode's cycle
    /// overhead.
    pub(crate) fn resolve<B: Bus>(&mut self, bus: &mut B, operand: Operand, width: Width) -> (u16, u32) {
        let overhead = match width {
            Width::Byte => self.timing.mode_byte,
            Width::Word => self.timing.mode_word,
        }[usize::from(operand.mode)];
        let addr = match operand.mode {
            0 => self.reg_addr(operand.reg),
            1 => self.reg(bus, operand.reg),
            2 => {
                let base = self.fetch(bus);
                if operand.reg == 0 {
                    base
                } else {
                    base.wrapping_add(self.reg(bus, operand.reg))
                }
            }
            _ => {
                let addr = self.reg(bus, operand.reg);
                let step = match width {
                    Width::Byte => 1,
                    Width::Word => 2,
                };
                self.set_reg(bus, operand.reg, addr.wrapping_add(step));
                addr
            }
        };
        (addr, u32::from(overhead))
    }
}
