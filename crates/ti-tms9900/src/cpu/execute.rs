//! Instruction execution.

use emu_core::alu::{flags_after_add, flags_after_sub};
use emu_core::{Bus, FlagSet, IllegalOpcode, Width};
use tracing::warn;

use super::Tms9900;
use super::addressing::Operand;
use crate::decode::{self, CruBit, Immediate, Jump, Op, Shift, Single, TwoOp};
use crate::flags::{self, AGT, C, EQ, LGT, MASK, OP, OV, X};
use crate::model::InstructionSet;
use crate::onchip::INTERNAL;

/// X may execute another X. Real chips would loop forever on a
/// self-referencing chain; this bounds it.
const MAX_X_DEPTH: u8 = 16;

/// Vector table of the extended operations, four bytes per XOP.
const XOP_VECTORS: u16 = 0x0040;

/// Register field of format III, IV and IX instructions (bits 6-9).
const fn reg_field(opcode: u16) -> u16 {
    (opcode >> 6) & 0xF
}

/// CRU bit count of LDCR/STCR. Zero means 16.
const fn cru_count(opcode: u16) -> u16 {
    match reg_field(opcode) {
        0 => 16,
        n => n,
    }
}

impl Tms9900 {
    /// Fetch and execute one instruction. Returns its cycle cost, excluding
    /// wait states.
    pub(crate) fn execute<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let opcode = self.fetch(bus);
        self.dispatch(bus, opcode, 0)
    }

    fn dispatch<B: Bus>(&mut self, bus: &mut B, opcode: u16, depth: u8) -> u32 {
        let entry = decode::table(self.config.instruction_set).get(u32::from(opcode));
        let mut cycles = u32::from(entry.cycles);

        match entry.op {
            Op::TwoOp(op, width) => cycles += self.two_op(bus, opcode, op, width),
            Op::Coc | Op::Czc | Op::Xor => cycles += self.format_three(bus, opcode, entry.op),
            Op::Xop => cycles += self.xop(bus, opcode),
            Op::Ldcr => cycles += self.ldcr(bus, opcode),
            Op::Stcr => cycles += self.stcr(bus, opcode),
            Op::Mpy => cycles += self.mpy(bus, opcode),
            Op::Div => cycles += self.div(bus, opcode),
            Op::Jump(jump) => {
                if self.condition(jump) {
                    let offset = i16::from(opcode as u8 as i8) * 2;
                    self.pc = self.pc.wrapping_add_signed(offset);
                    cycles += u32::from(self.timing.jump_taken);
                }
            }
            Op::Cru(op) => self.cru_bit(bus, opcode, op),
            Op::Shift(op) => cycles += self.shift(bus, opcode, op),
            Op::Single(Single::X) => {
                let (addr, extra) = self.resolve(bus, Operand::source(opcode), Width::Word);
                let target = self.read_word(bus, addr);
                cycles += extra;
                if depth < MAX_X_DEPTH {
                    cycles += self.dispatch(bus, target, depth + 1);
                } else {
                    warn!(opcode = target, pc = self.pc, "TMS9900 X chain too deep");
                }
            }
            Op::Single(op) => cycles += self.single(bus, opcode, op),
            Op::Immediate(op) => self.immediate(bus, opcode, op),
            Op::Stwp => self.set_reg(bus, opcode & 0xF, self.wp),
            Op::Stst => self.set_reg(bus, opcode & 0xF, self.st),
            Op::Lwpi => self.wp = self.fetch(bus) & !1,
            Op::Limi => {
                let value = self.fetch(bus);
                self.st = (self.st & !MASK) | (value & MASK);
            }
            Op::Idle => {
                self.idle = true;
                bus.idle_changed(true);
            }
            Op::Rset => self.st &= !MASK,
            Op::Ckon | Op::Ckof | Op::Lrex => {}
            Op::Rtwp => {
                let wp = self.reg(bus, 13);
                let pc = self.reg(bus, 14);
                let st = self.reg(bus, 15);
                self.st = st & self.config.st_mask;
                self.pc = pc & !1;
                self.wp = wp & !1;
            }
            Op::Lst => self.st = self.reg(bus, opcode & 0xF) & self.config.st_mask,
            Op::Lwp => self.wp = self.reg(bus, opcode & 0xF) & !1,
            Op::Divs => cycles += self.divs(bus, opcode),
            Op::Mpys => cycles += self.mpys(bus, opcode),
            Op::Illegal => cycles = self.illegal(opcode, cycles),
        }
        cycles
    }

    fn condition(&self, jump: Jump) -> bool {
        let st = self.st;
        let set = |bit: u16| st & bit != 0;
        match jump {
            Jump::Jmp => true,
            Jump::Jlt => !set(AGT) && !set(EQ),
            Jump::Jle => !set(LGT) || set(EQ),
            Jump::Jeq => set(EQ),
            Jump::Jhe => set(LGT) || set(EQ),
            Jump::Jgt => set(AGT),
            Jump::Jne => !set(EQ),
            Jump::Jnc => !set(C),
            Jump::Joc => set(C),
            Jump::Jno => !set(OV),
            Jump::Jl => !set(LGT) && !set(EQ),
            Jump::Jh => set(LGT) && !set(EQ),
            Jump::Jop => set(OP),
        }
    }

    /// Store an arithmetic result's flags and raise the TMS9995 overflow
    /// interrupt if it overflowed.
    fn arithmetic(&mut self, result: u16, fs: FlagSet, width: Width) {
        self.st = flags::arithmetic(self.st, result, fs, width);
        if fs.overflow {
            self.overflow_trap();
        }
    }

    fn two_op<B: Bus>(&mut self, bus: &mut B, opcode: u16, op: TwoOp, width: Width) -> u32 {
        let (src_addr, src_cycles) = self.resolve(bus, Operand::source(opcode), width);
        let s = self.read_operand(bus, src_addr, width);
        let (dst_addr, dst_cycles) = self.resolve(bus, Operand::destination(opcode), width);
        let cycles = src_cycles + dst_cycles;

        let d = if op != TwoOp::Mov || self.config.dummy_dest_read {
            self.read_operand(bus, dst_addr, width)
        } else {
            0
        };
        let mask = width.mask();
        let result = match op {
            TwoOp::Mov => {
                self.st = flags::lae_p(self.st, s, width);
                s
            }
            TwoOp::Szc => {
                let r = d & !s;
                self.st = flags::lae_p(self.st, r, width);
                r
            }
            TwoOp::Soc => {
                let r = d | s;
                self.st = flags::lae_p(self.st, r, width);
                r
            }
            TwoOp::A => {
                let r = d.wrapping_add(s) & mask;
                self.arithmetic(r, flags_after_add(d, s, r, width), width);
                r
            }
            TwoOp::S => {
                let r = d.wrapping_sub(s) & mask;
                self.arithmetic(r, flags_after_sub(d, s, r, width), width);
                r
            }
            TwoOp::C => {
                self.st = flags::compare(self.st, s, d, width);
                if width == Width::Byte {
                    self.st = flags::with(self.st, OP, (s as u8).count_ones() & 1 == 1);
                }
                return cycles;
            }
        };
        self.write_operand(bus, dst_addr, width, result);
        cycles
    }

    /// COC, CZC and XOR: general source, workspace register destination.
    fn format_three<B: Bus>(&mut self, bus: &mut B, opcode: u16, op: Op) -> u32 {
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), Width::Word);
        let s = self.read_word(bus, addr);
        let d = self.reg(bus, reg_field(opcode));
        match op {
            Op::Coc => self.st = flags::with(self.st, EQ, s & d == s),
            Op::Czc => self.st = flags::with(self.st, EQ, s & d == 0),
            _ => {
                let r = d ^ s;
                self.st = flags::lae(self.st, r, Width::Word);
                self.set_reg(bus, reg_field(opcode), r);
            }
        }
        cycles
    }

    fn xop<B: Bus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), Width::Word);
        let vector = XOP_VECTORS + 4 * reg_field(opcode);
        self.context_switch(bus, vector);
        self.set_reg(bus, 11, addr);
        self.st |= X;
        self.suppress = true;
        cycles
    }

    fn ldcr<B: Bus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let count = cru_count(opcode);
        let width = if count <= 8 { Width::Byte } else { Width::Word };
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), width);
        let value = self.read_operand(bus, addr, width);
        self.st = flags::lae_p(self.st, value, width);
        let base = self.cru_base(bus);
        for i in 0..count {
            self.cru_write(bus, base.wrapping_add(i), (value >> i) & 1 != 0);
        }
        cycles + u32::from(self.timing.cru_per_bit) * u32::from(count)
    }

    fn stcr<B: Bus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let count = cru_count(opcode);
        let width = if count <= 8 { Width::Byte } else { Width::Word };
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), width);
        let base = self.cru_base(bus);
        let mut value = 0u16;
        for i in 0..count {
            if self.cru_read(bus, base.wrapping_add(i)) {
                value |= 1 << i;
            }
        }
        self.st = flags::lae_p(self.st, value, width);
        self.write_operand(bus, addr, width, value);
        let extra = match self.config.instruction_set {
            InstructionSet::Tms9900 => match count {
                1..=7 => 0,
                8 => 2,
                9..=15 => 16,
                _ => 18,
            },
            InstructionSet::Tms9995 => u32::from(self.timing.cru_per_bit) * u32::from(count),
        };
        cycles + extra
    }

    fn mpy<B: Bus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), Width::Word);
        let s = self.read_word(bus, addr);
        let d = reg_field(opcode);
        let product = u32::from(self.reg(bus, d)) * u32::from(s);
        self.set_reg(bus, d, (product >> 16) as u16);
        self.set_reg(bus, d + 1, product as u16);
        cycles
    }

    /// Unsigned 32/16 divide of Rd:Rd+1. A quotient that would not fit in
    /// 16 bits sets OV and leaves both registers alone.
    fn div<B: Bus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), Width::Word);
        let divisor = self.read_word(bus, addr);
        let d = reg_field(opcode);
        let hi = self.reg(bus, d);
        if divisor <= hi {
            self.st |= OV;
            self.overflow_trap();
            return cycles;
        }
        let lo = self.reg(bus, d + 1);
        let dividend = (u32::from(hi) << 16) | u32::from(lo);
        let quotient = (dividend / u32::from(divisor)) as u16;
        let remainder = (dividend % u32::from(divisor)) as u16;
        self.set_reg(bus, d, quotient);
        self.set_reg(bus, d + 1, remainder);
        self.st &= !OV;
        cycles
            + u32::from(self.timing.div_extra)
            + u32::from(self.timing.div_per_bit) * quotient.count_ones()
    }

    /// TMS9995 signed multiply: R0 * source into R0:R1.
    fn mpys<B: Bus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), Width::Word);
        let s = self.read_word(bus, addr) as i16;
        let r0 = self.reg(bus, 0) as i16;
        let product = i32::from(r0) * i32::from(s);
        self.set_reg(bus, 0, (product >> 16) as u16);
        self.set_reg(bus, 1, product as u16);
        self.st = signed_lae(self.st, product);
        cycles
    }

    /// TMS9995 signed divide of R0:R1. Quotient to R0, remainder to R1.
    fn divs<B: Bus>(&mut self, bus: &mut B, opcode: u16) -> u32 {
        let (addr, cycles) = self.resolve(bus, Operand::source(opcode), Width::Word);
        let divisor = i32::from(self.read_word(bus, addr) as i16);
        let hi = self.reg(bus, 0);
        let lo = self.reg(bus, 1);
        let dividend = ((u32::from(hi) << 16) | u32::from(lo)) as i32;
        let quotient = dividend
            .checked_div(divisor)
            .and_then(|q| i16::try_from(q).ok());
        let Some(quotient) = quotient else {
            self.st |= OV;
            self.overflow_trap();
            return cycles;
        };
        let remainder = dividend % divisor;
        self.set_reg(bus, 0, quotient as u16);
        self.set_reg(bus, 1, remainder as u16);
        self.st = signed_lae(self.st, i32::from(quotient)) & !OV;
        cycles + u32::from(self.timing.div_extra)
    }

    fn cru_bit<B: Bus>(&mut self, bus: &mut B, opcode: u16, op: CruBit) {
        let offset = i16::from(opcode as u8 as i8);
        let bit = self.cru_base(bus).wrapping_add_signed(offset);
        match op {
            CruBit::Sbo => self.cru_write(bus, bit, true),
            CruBit::Sbz => self.cru_write(bus, bit, false),
            CruBit::Tb => {
                let value = self.cru_read(bus, bit);
                self.st = flags::with(self.st, EQ, value);
            }
        }
    }

    /// SRA, SRL, SLA and SRC. A zero count field takes the count from the
    /// low nibble of R0, where zero means 16.
    fn shift<B: Bus>(&mut self, bus: &mut B, opcode: u16, op: Shift) -> u32 {
        let w = opcode & 0xF;
        let mut count = (opcode >> 4) & 0xF;
        let mut cycles = 0;
        if count == 0 {
            count = self.reg(bus, 0) & 0xF;
            if count == 0 {
                count = 16;
            }
            cycles += u32::from(self.timing.shift_from_r0);
        }
        let mut value = self.reg(bus, w);
        let mut carry = false;
        let mut overflow = false;
        for _ in 0..count {
            match op {
                Shift::Sra => {
                    carry = value & 1 != 0;
                    value = ((value as i16) >> 1) as u16;
                }
                Shift::Srl => {
                    carry = value & 1 != 0;
                    value >>= 1;
                }
                Shift::Sla => {
                    carry = value & 0x8000 != 0;
                    let shifted = value << 1;
                    overflow |= (shifted ^ value) & 0x8000 != 0;
                    value = shifted;
                }
                Shift::Src => {
                    carry = value & 1 != 0;
                    value = value.rotate_right(1);
                }
            }
        }
        self.set_reg(bus, w, value);
        self.st = flags::lae(self.st, value, Width::Word);
        self.st = flags::with(self.st, C, carry);
        if op == Shift::Sla {
            self.st = flags::with(self.st, OV, overflow);
            if overflow {
                self.overflow_trap();
            }
        }
        cycles + u32::from(self.timing.shift_per_bit) * u32::from(count)
    }

    fn single<B: Bus>(&mut self, bus: &mut B, opcode: u16, op: Single) -> u32 {
        let (addr, mut cycles) = self.resolve(bus, Operand::source(opcode), Width::Word);
        match op {
            Single::Blwp => {
                self.context_switch(bus, addr);
                self.suppress = true;
            }
            Single::B => self.pc = addr & !1,
            Single::Bl => {
                self.set_reg(bus, 11, self.pc);
                self.pc = addr & !1;
            }
            Single::Clr => self.write_word(bus, addr, 0),
            Single::Seto => self.write_word(bus, addr, 0xFFFF),
            Single::Swpb => {
                let v = self.read_word(bus, addr);
                self.write_word(bus, addr, v.swap_bytes());
            }
            Single::Inv => {
                let r = !self.read_word(bus, addr);
                self.st = flags::lae(self.st, r, Width::Word);
                self.write_word(bus, addr, r);
            }
            Single::Neg => {
                let v = self.read_word(bus, addr);
                let r = 0u16.wrapping_sub(v);
                self.arithmetic(r, flags_after_sub(0, v, r, Width::Word), Width::Word);
                self.write_word(bus, addr, r);
            }
            Single::Inc | Single::Inct => {
                let step = if op == Single::Inc { 1 } else { 2 };
                let v = self.read_word(bus, addr);
                let r = v.wrapping_add(step);
                self.arithmetic(r, flags_after_add(v, step, r, Width::Word), Width::Word);
                self.write_word(bus, addr, r);
            }
            Single::Dec | Single::Dect => {
                let step = if op == Single::Dec { 1 } else { 2 };
                let v = self.read_word(bus, addr);
                let r = v.wrapping_sub(step);
                self.arithmetic(r, flags_after_sub(v, step, r, Width::Word), Width::Word);
                self.write_word(bus, addr, r);
            }
            Single::Abs => {
                let v = self.read_word(bus, addr);
                self.st = flags::lae(self.st, v, Width::Word) & !C;
                self.st = flags::with(self.st, OV, v == 0x8000);
                if v & 0x8000 != 0 {
                    self.write_word(bus, addr, 0u16.wrapping_sub(v));
                    cycles += u32::from(self.timing.abs_negative);
                }
                if v == 0x8000 {
                    self.overflow_trap();
                }
            }
            Single::X => {}
        }
        cycles
    }

    fn immediate<B: Bus>(&mut self, bus: &mut B, opcode: u16, op: Immediate) {
        let w = opcode & 0xF;
        let imm = self.fetch(bus);
        if op == Immediate::Li {
            self.st = flags::lae(self.st, imm, Width::Word);
            self.set_reg(bus, w, imm);
            return;
        }
        let v = self.reg(bus, w);
        let r = match op {
            Immediate::Ai => {
                let r = v.wrapping_add(imm);
                self.arithmetic(r, flags_after_add(v, imm, r, Width::Word), Width::Word);
                r
            }
            Immediate::Andi => v & imm,
            Immediate::Ori => v | imm,
            Immediate::Ci | Immediate::Li => {
                self.st = flags::compare(self.st, v, imm, Width::Word);
                return;
            }
        };
        if op != Immediate::Ai {
            self.st = flags::lae(self.st, r, Width::Word);
        }
        self.set_reg(bus, w, r);
    }

    fn illegal(&mut self, opcode: u16, cycles: u32) -> u32 {
        let pc = self.pc.wrapping_sub(2);
        match self.config.illegal {
            IllegalOpcode::Ignore { cycles } => {
                warn!(opcode, pc, "TMS9900 illegal opcode");
                u32::from(cycles)
            }
            IllegalOpcode::Trap => {
                warn!(opcode, pc, "TMS9995 MID trap");
                self.onchip.mid = true;
                self.irq.set_latch(INTERNAL);
                cycles
            }
        }
    }
}

/// L>, A> and EQ from a signed 32-bit result.
fn signed_lae(st: u16, value: i32) -> u16 {
    let mut st = st & !(LGT | AGT | EQ);
    match value.signum() {
        0 => st |= EQ,
        1 => st |= LGT | AGT,
        _ => st |= LGT,
    }
    st
}
