//! Instruction execution.

use emu_core::alu::{flags_after_add, flags_after_sub};
use emu_core::bcd::{bcd_add, bcd_sub};
use emu_core::{Bus, IllegalOpcode, Width};
use tracing::warn;

use super::Tms7000;
use crate::decode::{Alu, Cond, Extended, Form, OPCODES, Op, PeriphOp, PeriphSource, Target, Unary};
use crate::flags::{self, C, I, N, Z};

/// Register numbers of the accumulators.
const REG_A: u8 = 0;
const REG_B: u8 = 1;

/// Extra cycles when a conditional branch is taken.
const TAKEN: u32 = 2;
/// Cost of a TRAP, also charged when an unassigned opcode traps.
const TRAP_CYCLES: u32 = 14;

impl Tms7000 {
    fn carry(&self) -> bool {
        self.st & C != 0
    }

    /// Branch by a signed offset from the end of the instruction.
    fn jump_relative(&mut self, offset: u8) {
        self.pc = self.pc.wrapping_add_signed(i16::from(offset as i8));
    }

    /// Fetch and execute one instruction. Returns its cycle cost, excluding
    /// wait states.
    pub(crate) fn execute<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let pc = self.pc;
        let opcode = self.fetch(bus);
        let entry = OPCODES.get(u32::from(opcode));
        let mut cycles = u32::from(entry.cycles);

        match entry.op {
            Op::Nop => {}
            Op::Idle => {
                self.idle = true;
                bus.idle_changed(true);
            }
            Op::Eint => self.st = C | N | Z | I,
            Op::Dint => self.st = 0,
            Op::Setc => self.st = (self.st & I) | C | Z,
            Op::PopSt => self.st = self.pop(bus) & flags::ST_MASK,
            Op::PushSt => self.push(bus, self.st),
            Op::Stsp => self.rf[usize::from(REG_B)] = self.sp,
            Op::Ldsp => self.sp = self.rf[usize::from(REG_B)],
            Op::Rets => self.pop_pc(bus),
            Op::Reti => {
                self.pop_pc(bus);
                self.st = self.pop(bus) & flags::ST_MASK;
            }
            Op::Dual(alu, form) => cycles += self.dual(bus, alu, form),
            Op::MovpToA | Op::MovpToB => {
                let n = self.fetch(bus);
                let value = self.read_periph(bus, n);
                let dest = if entry.op == Op::MovpToA { REG_A } else { REG_B };
                self.rf[usize::from(dest)] = value;
                self.st = flags::logical(self.st, value);
            }
            Op::Periph(op, source) => cycles += self.periph_op(bus, op, source),
            Op::Movd(mode) => self.movd(bus, mode),
            Op::Lda(mode) => {
                let addr = self.extended_address(bus, mode);
                let value = self.read(bus, addr);
                self.rf[usize::from(REG_A)] = value;
                self.st = flags::logical(self.st, value);
            }
            Op::Sta(mode) => {
                let addr = self.extended_address(bus, mode);
                let value = self.rf[usize::from(REG_A)];
                self.write(bus, addr, value);
                self.st = flags::logical(self.st, value);
            }
            Op::Br(mode) => self.pc = self.extended_address(bus, mode),
            Op::Cmpa(mode) => {
                let addr = self.extended_address(bus, mode);
                let m = self.read(bus, addr);
                let a = self.rf[usize::from(REG_A)];
                let r = a.wrapping_sub(m);
                let f = flags_after_sub(a.into(), m.into(), r.into(), Width::Byte);
                self.st = flags::arithmetic(self.st, f);
            }
            Op::Call(mode) => {
                let addr = self.extended_address(bus, mode);
                self.push_pc(bus);
                self.pc = addr;
            }
            Op::Clrc => self.st = flags::logical(self.st, self.rf[usize::from(REG_A)]),
            Op::MovAB => {
                let a = self.rf[usize::from(REG_A)];
                self.rf[usize::from(REG_B)] = a;
                self.st = flags::logical(self.st, a);
            }
            Op::Tstb => self.st = flags::logical(self.st, self.rf[usize::from(REG_B)]),
            Op::MovARn | Op::MovBRn => {
                let n = self.fetch(bus);
                let src = if entry.op == Op::MovARn { REG_A } else { REG_B };
                let value = self.rf[usize::from(src)];
                self.set_reg(bus, n, value);
                self.st = flags::logical(self.st, value);
            }
            Op::Unary(op, target) => cycles += self.unary(bus, op, target),
            Op::Jump(cond) => {
                let offset = self.fetch(bus);
                if self.condition(cond) {
                    self.jump_relative(offset);
                    if cond != Cond::Always {
                        cycles += TAKEN;
                    }
                }
            }
            Op::Trap(n) => self.trap(bus, n),
            Op::Illegal => cycles = self.illegal(bus, opcode, pc),
        }
        cycles
    }

    /// Push PC and jump through the vector of TRAP `n`.
    fn trap<B: Bus>(&mut self, bus: &mut B, n: u8) {
        let vector = 0xFFFE - 2 * u16::from(n);
        self.push_pc(bus);
        self.pc = self.read_word(bus, vector);
    }

    fn illegal<B: Bus>(&mut self, bus: &mut B, opcode: u8, pc: u16) -> u32 {
        match self.config.illegal {
            IllegalOpcode::Ignore { cycles } => {
                warn!(opcode, pc, "TMS7000 illegal opcode");
                u32::from(cycles)
            }
            IllegalOpcode::Trap => {
                warn!(opcode, pc, "TMS7000 illegal opcode trap");
                self.trap(bus, 0);
                TRAP_CYCLES
            }
        }
    }

    fn condition(&self, cond: Cond) -> bool {
        let st = self.st;
        match cond {
            Cond::Always => true,
            Cond::Negative => st & N != 0,
            Cond::Equal => st & Z != 0,
            Cond::Carry => st & C != 0,
            Cond::Positive => st & (N | Z) == 0,
            Cond::PositiveOrZero => st & N == 0,
            Cond::NotEqual => st & Z == 0,
            Cond::NoCarry => st & C == 0,
        }
    }

    /// Fetch the operands of a dual-operand form: source value and
    /// destination register number.
    fn dual_operands<B: Bus>(&mut self, bus: &mut B, form: Form) -> (u8, u8) {
        match form {
            Form::BA => (self.rf[usize::from(REG_B)], REG_A),
            Form::RnA | Form::RnB => {
                let n = self.fetch(bus);
                let dest = if form == Form::RnA { REG_A } else { REG_B };
                (self.reg(bus, n), dest)
            }
            Form::ImmA => (self.fetch(bus), REG_A),
            Form::ImmB => (self.fetch(bus), REG_B),
            Form::RnRn => {
                let s = self.fetch(bus);
                let d = self.fetch(bus);
                (self.reg(bus, s), d)
            }
            Form::ImmRn => {
                let s = self.fetch(bus);
                let d = self.fetch(bus);
                (s, d)
            }
        }
    }

    /// Dual-operand ALU instruction. Returns data-dependent extra cycles.
    fn dual<B: Bus>(&mut self, bus: &mut B, alu: Alu, form: Form) -> u32 {
        let (s, dest) = self.dual_operands(bus, form);
        if alu == Alu::Mov {
            self.set_reg(bus, dest, s);
            self.st = flags::logical(self.st, s);
            return 0;
        }
        let d = self.reg(bus, dest);
        let carry = u8::from(self.carry());

        let result = match alu {
            Alu::And => s & d,
            Alu::Or => s | d,
            Alu::Xor => s ^ d,
            Alu::Btjo | Alu::Btjz => {
                let bits = if alu == Alu::Btjo { s & d } else { s & !d };
                self.st = flags::logical(self.st, bits);
                let offset = self.fetch(bus);
                if bits != 0 {
                    self.jump_relative(offset);
                    return TAKEN;
                }
                return 0;
            }
            Alu::Add | Alu::Adc => {
                let c = if alu == Alu::Adc { carry } else { 0 };
                let r = d.wrapping_add(s).wrapping_add(c);
                let f = flags_after_add(d.into(), s.into(), r.into(), Width::Byte);
                self.st = flags::arithmetic(self.st, f);
                self.set_reg(bus, dest, r);
                return 0;
            }
            Alu::Sub | Alu::Sbb | Alu::Cmp => {
                let borrow = if alu == Alu::Sbb { 1 - carry } else { 0 };
                let r = d.wrapping_sub(s).wrapping_sub(borrow);
                let f = flags_after_sub(d.into(), s.into(), r.into(), Width::Byte);
                self.st = flags::arithmetic(self.st, f);
                if alu != Alu::Cmp {
                    self.set_reg(bus, dest, r);
                }
                return 0;
            }
            Alu::Mpy => {
                let [hi, lo] = (u16::from(s) * u16::from(d)).to_be_bytes();
                self.rf[usize::from(REG_A)] = hi;
                self.rf[usize::from(REG_B)] = lo;
                self.st = flags::logical(self.st, hi);
                return 0;
            }
            Alu::Dac => {
                let mut r = bcd_add(d.into(), s.into());
                if carry != 0 {
                    r = bcd_add(r, 1);
                }
                let value = r as u8;
                self.st = flags::with_carry(flags::logical(self.st, value), r > 0xFF);
                self.set_reg(bus, dest, value);
                return 0;
            }
            Alu::Dsb => {
                let r = bcd_sub(d.into(), s.into());
                // Subtracting zero complements to zero and never carries out.
                let mut no_borrow = r & 0x100 != 0 || s == 0;
                let mut value = r as u8;
                if carry == 0 {
                    let r = bcd_sub(value.into(), 1);
                    no_borrow &= r & 0x100 != 0;
                    value = r as u8;
                }
                self.st = flags::with_carry(flags::logical(self.st, value), no_borrow);
                self.set_reg(bus, dest, value);
                return 0;
            }
            Alu::Mov => s,
        };
        self.st = flags::logical(self.st, result);
        self.set_reg(bus, dest, result);
        0
    }

    fn periph_op<B: Bus>(&mut self, bus: &mut B, op: PeriphOp, source: PeriphSource) -> u32 {
        let s = match source {
            PeriphSource::A => self.rf[usize::from(REG_A)],
            PeriphSource::B => self.rf[usize::from(REG_B)],
            PeriphSource::Imm => self.fetch(bus),
        };
        let n = self.fetch(bus);
        let result = match op {
            PeriphOp::Mov => s,
            PeriphOp::And => s & self.read_periph(bus, n),
            PeriphOp::Or => s | self.read_periph(bus, n),
            PeriphOp::Xor => s ^ self.read_periph(bus, n),
            PeriphOp::Btjo | PeriphOp::Btjz => {
                let d = self.read_periph(bus, n);
                let bits = if op == PeriphOp::Btjo { s & d } else { s & !d };
                self.st = flags::logical(self.st, bits);
                let offset = self.fetch(bus);
                if bits != 0 {
                    self.jump_relative(offset);
                    return TAKEN;
                }
                return 0;
            }
        };
        self.write_periph(bus, n, result);
        self.st = flags::logical(self.st, result);
        0
    }

    /// Read the 16-bit register pair Rn-1:Rn.
    fn pair<B: Bus>(&mut self, bus: &mut B, n: u8) -> u16 {
        let hi = self.reg(bus, n.wrapping_sub(1));
        let lo = self.reg(bus, n);
        u16::from_be_bytes([hi, lo])
    }

    fn set_pair<B: Bus>(&mut self, bus: &mut B, n: u8, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.set_reg(bus, n.wrapping_sub(1), hi);
        self.set_reg(bus, n, lo);
    }

    fn extended_address<B: Bus>(&mut self, bus: &mut B, mode: Extended) -> u16 {
        match mode {
            Extended::Direct => self.fetch_word(bus),
            Extended::Indirect => {
                let n = self.fetch(bus);
                self.pair(bus, n)
            }
            Extended::Indexed => {
                let base = self.fetch_word(bus);
                base.wrapping_add(u16::from(self.rf[usize::from(REG_B)]))
            }
        }
    }

    fn movd<B: Bus>(&mut self, bus: &mut B, mode: Extended) {
        let value = match mode {
            Extended::Direct => self.fetch_word(bus),
            Extended::Indirect => {
                let s = self.fetch(bus);
                self.pair(bus, s)
            }
            Extended::Indexed => {
                let base = self.fetch_word(bus);
                base.wrapping_add(u16::from(self.rf[usize::from(REG_B)]))
            }
        };
        let n = self.fetch(bus);
        self.set_pair(bus, n, value);
        self.st = flags::logical(self.st, (value >> 8) as u8);
    }

    /// Single-operand instruction. Returns data-dependent extra cycles.
    fn unary<B: Bus>(&mut self, bus: &mut B, op: Unary, target: Target) -> u32 {
        let n = match target {
            Target::A => REG_A,
            Target::B => REG_B,
            Target::Rn => self.fetch(bus),
        };
        let carry = self.carry();

        let (result, carry_out) = match op {
            Unary::Dec => {
                let v = self.reg(bus, n);
                let r = v.wrapping_sub(1);
                let f = flags_after_sub(v.into(), 1, r.into(), Width::Byte);
                self.st = flags::arithmetic(self.st, f);
                self.set_reg(bus, n, r);
                return 0;
            }
            Unary::Inc => {
                let v = self.reg(bus, n);
                let r = v.wrapping_add(1);
                let f = flags_after_add(v.into(), 1, r.into(), Width::Byte);
                self.st = flags::arithmetic(self.st, f);
                self.set_reg(bus, n, r);
                return 0;
            }
            Unary::Inv => (!self.reg(bus, n), false),
            Unary::Clr => (0, false),
            Unary::Xchb => {
                let v = self.reg(bus, n);
                let b = self.rf[usize::from(REG_B)];
                self.set_reg(bus, n, b);
                self.rf[usize::from(REG_B)] = v;
                self.st = flags::logical(self.st, v);
                return 0;
            }
            Unary::Swap => {
                let r = self.reg(bus, n).rotate_left(4);
                (r, r & 0x01 != 0)
            }
            Unary::Push => {
                let v = self.reg(bus, n);
                self.push(bus, v);
                self.st = flags::logical(self.st, v);
                return 0;
            }
            Unary::Pop => (self.pop(bus), false),
            Unary::Djnz => {
                let r = self.reg(bus, n).wrapping_sub(1);
                self.set_reg(bus, n, r);
                let offset = self.fetch(bus);
                if r != 0 {
                    self.jump_relative(offset);
                    return TAKEN;
                }
                return 0;
            }
            Unary::Decd => {
                let v = self.pair(bus, n);
                let r = v.wrapping_sub(1);
                self.set_pair(bus, n, r);
                let st = flags::logical(self.st, (r >> 8) as u8);
                // Carry out of a 16-bit decrement is unconfirmed against the
                // datasheet. Provisionally C means no borrow out of bit 15.
                self.st = flags::with_carry(st, v != 0);
                return 0;
            }
            Unary::Rr => {
                let v = self.reg(bus, n);
                (v.rotate_right(1), v & 0x01 != 0)
            }
            Unary::Rrc => {
                let v = self.reg(bus, n);
                ((v >> 1) | (u8::from(carry) << 7), v & 0x01 != 0)
            }
            Unary::Rl => {
                let v = self.reg(bus, n);
                (v.rotate_left(1), v & 0x80 != 0)
            }
            Unary::Rlc => {
                let v = self.reg(bus, n);
                ((v << 1) | u8::from(carry), v & 0x80 != 0)
            }
        };
        self.set_reg(bus, n, result);
        self.st = flags::with_carry(flags::logical(self.st, result), carry_out);
        0
    }
}
