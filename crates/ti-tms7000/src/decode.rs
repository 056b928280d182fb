//! TMS7000 opcode decoding.
//!
//! The instruction set is laid out in a regular grid. The high nibble picks
//! the operand form and the low nibble picks the operation for the
//! dual-operand rows (1x-7x), the peripheral rows (8x-Ax) and the
//! single-operand rows (Bx-Dx). Row 0 holds the control instructions, E0-E7
//! the jumps and E8-FF the traps.

use std::sync::LazyLock;

use emu_core::{DispatchTable, Entry};

/// Source and destination of a dual-operand instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// `B,A`
    BA,
    /// `Rn,A`
    RnA,
    /// `%n,A`
    ImmA,
    /// `Rn,B`
    RnB,
    /// `%n,B`
    ImmB,
    /// `Rn,Rn`
    RnRn,
    /// `%n,Rn`
    ImmRn,
}

impl Form {
    /// Index into the per-form cycle rows below.
    const fn column(self) -> usize {
        match self {
            Self::BA => 0,
            Self::RnA => 1,
            Self::RnB => 2,
            Self::RnRn => 3,
            Self::ImmA => 4,
            Self::ImmB => 5,
            Self::ImmRn => 6,
        }
    }
}

/// Dual-operand ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alu {
    Mov,
    And,
    Or,
    Xor,
    Btjo,
    Btjz,
    Add,
    Adc,
    Sub,
    Sbb,
    Mpy,
    Cmp,
    Dac,
    Dsb,
}

/// Source of a peripheral-file operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriphSource {
    A,
    B,
    Imm,
}

/// Operation on a peripheral-file register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriphOp {
    Mov,
    And,
    Or,
    Xor,
    Btjo,
    Btjz,
}

/// Addressing for the extended (16-bit address) instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extended {
    /// `@addr`
    Direct,
    /// `*Rn`: address in the register pair Rn-1:Rn.
    Indirect,
    /// `@addr(B)`
    Indexed,
}

/// Target of a single-operand instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    A,
    B,
    Rn,
}

/// Single-operand operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unary {
    Dec,
    Inc,
    Inv,
    Clr,
    Xchb,
    Swap,
    Push,
    Pop,
    Djnz,
    Decd,
    Rr,
    Rrc,
    Rl,
    Rlc,
}

/// Jump condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Always,
    /// N set.
    Negative,
    /// Z set.
    Equal,
    /// C set.
    Carry,
    /// N and Z clear.
    Positive,
    /// N clear.
    PositiveOrZero,
    /// Z clear.
    NotEqual,
    /// C clear.
    NoCarry,
}

/// Decoded instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    Idle,
    Eint,
    Dint,
    Setc,
    PopSt,
    PushSt,
    Stsp,
    Ldsp,
    Rets,
    Reti,
    Dual(Alu, Form),
    /// `MOVP Pn,A`
    MovpToA,
    /// `MOVP Pn,B`
    MovpToB,
    Periph(PeriphOp, PeriphSource),
    /// `MOVD %nn,Rn` / `MOVD Rs,Rd` / `MOVD %nn(B),Rn`
    Movd(Extended),
    Lda(Extended),
    Sta(Extended),
    Br(Extended),
    Cmpa(Extended),
    Call(Extended),
    /// `CLRC` and `TSTA` share an encoding.
    Clrc,
    /// `MOV A,B`
    MovAB,
    Tstb,
    /// `MOV A,Rn`
    MovARn,
    /// `MOV B,Rn`
    MovBRn,
    Unary(Unary, Target),
    Jump(Cond),
    Trap(u8),
    Illegal,
}

/// Cycle counts per dual-operand form, in [`Form::column`] order.
const DUAL_CYCLES: [u8; 7] = [5, 8, 8, 10, 7, 7, 9];
const MPY_CYCLES: [u8; 7] = [44, 46, 46, 48, 45, 45, 47];
const BCD_CYCLES: [u8; 7] = [7, 10, 10, 12, 9, 9, 11];
const BTJ_CYCLES: [u8; 7] = [7, 9, 9, 11, 8, 8, 10];

fn dual(opcode: u8) -> Entry<Op> {
    let form = match opcode >> 4 {
        1 => Form::RnA,
        2 => Form::ImmA,
        3 => Form::RnB,
        4 => Form::RnRn,
        5 => Form::ImmB,
        6 => Form::BA,
        _ => Form::ImmRn,
    };
    let alu = match opcode & 0x0F {
        0x2 => Alu::Mov,
        0x3 => Alu::And,
        0x4 => Alu::Or,
        0x5 => Alu::Xor,
        0x6 => Alu::Btjo,
        0x7 => Alu::Btjz,
        0x8 => Alu::Add,
        0x9 => Alu::Adc,
        0xA => Alu::Sub,
        0xB => Alu::Sbb,
        0xC => Alu::Mpy,
        0xD => Alu::Cmp,
        0xE => Alu::Dac,
        _ => Alu::Dsb,
    };
    let row = match alu {
        Alu::Mpy => &MPY_CYCLES,
        Alu::Dac | Alu::Dsb => &BCD_CYCLES,
        Alu::Btjo | Alu::Btjz => &BTJ_CYCLES,
        _ => &DUAL_CYCLES,
    };
    Entry::new(Op::Dual(alu, form), row[form.column()])
}

fn peripheral(opcode: u8) -> Entry<Op> {
    let source = match opcode >> 4 {
        0x8 => PeriphSource::A,
        0x9 => PeriphSource::B,
        _ => PeriphSource::Imm,
    };
    let op = match opcode & 0x0F {
        0x2 => PeriphOp::Mov,
        0x3 => PeriphOp::And,
        0x4 => PeriphOp::Or,
        0x5 => PeriphOp::Xor,
        0x6 => PeriphOp::Btjo,
        _ => PeriphOp::Btjz,
    };
    // A, B, %n
    let (plain, btj) = match source {
        PeriphSource::A => (10, 11),
        PeriphSource::B => (9, 10),
        PeriphSource::Imm => (11, 12),
    };
    let cycles = if matches!(op, PeriphOp::Btjo | PeriphOp::Btjz) {
        btj
    } else {
        plain
    };
    Entry::new(Op::Periph(op, source), cycles)
}

fn extended(opcode: u8) -> Entry<Op> {
    let (mode, col) = match opcode >> 4 {
        0x8 => (Extended::Direct, 0),
        0x9 => (Extended::Indirect, 1),
        _ => (Extended::Indexed, 2),
    };
    let (op, cycles): (Op, [u8; 3]) = match opcode & 0x0F {
        0x8 => (Op::Movd(mode), [15, 14, 17]),
        0xA => (Op::Lda(mode), [11, 9, 13]),
        0xB => (Op::Sta(mode), [11, 9, 13]),
        0xC => (Op::Br(mode), [10, 8, 12]),
        0xD => (Op::Cmpa(mode), [12, 11, 14]),
        0xE => (Op::Call(mode), [15, 13, 17]),
        _ => return Entry::new(Op::Illegal, 0),
    };
    Entry::new(op, cycles[col])
}

fn single(opcode: u8) -> Entry<Op> {
    let (target, col) = match opcode >> 4 {
        0xB => (Target::A, 0),
        0xC => (Target::B, 1),
        _ => (Target::Rn, 2),
    };
    let (op, cycles): (Unary, [u8; 3]) = match opcode & 0x0F {
        0x2 => (Unary::Dec, [5, 5, 7]),
        0x3 => (Unary::Inc, [5, 5, 7]),
        0x4 => (Unary::Inv, [5, 5, 7]),
        0x5 => (Unary::Clr, [5, 5, 7]),
        0x6 => (Unary::Xchb, [6, 6, 8]),
        0x7 => (Unary::Swap, [8, 8, 10]),
        0x8 => (Unary::Push, [6, 6, 8]),
        0x9 => (Unary::Pop, [6, 6, 8]),
        0xA => (Unary::Djnz, [7, 7, 9]),
        0xB => (Unary::Decd, [9, 9, 11]),
        0xC => (Unary::Rr, [5, 5, 7]),
        0xD => (Unary::Rrc, [5, 5, 7]),
        0xE => (Unary::Rl, [5, 5, 7]),
        _ => (Unary::Rlc, [5, 5, 7]),
    };
    Entry::new(Op::Unary(op, target), cycles[col])
}

/// Decode one opcode. `illegal_cycles` is charged for unassigned encodings.
#[must_use]
pub fn decode(opcode: u8, illegal_cycles: u8) -> Entry<Op> {
    let entry = match opcode {
        0x00 => Entry::new(Op::Nop, 5),
        0x01 => Entry::new(Op::Idle, 6),
        0x05 => Entry::new(Op::Eint, 5),
        0x06 => Entry::new(Op::Dint, 5),
        0x07 => Entry::new(Op::Setc, 5),
        0x08 => Entry::new(Op::PopSt, 6),
        0x09 => Entry::new(Op::Stsp, 6),
        0x0A => Entry::new(Op::Rets, 7),
        0x0B => Entry::new(Op::Reti, 9),
        0x0D => Entry::new(Op::Ldsp, 5),
        0x0E => Entry::new(Op::PushSt, 6),
        0x12..=0x1F
        | 0x22..=0x2F
        | 0x32..=0x3F
        | 0x42..=0x4F
        | 0x52..=0x5F
        | 0x62..=0x6F
        | 0x72..=0x7F => dual(opcode),
        0x80 => Entry::new(Op::MovpToA, 9),
        0x91 => Entry::new(Op::MovpToB, 8),
        0x82..=0x87 | 0x92..=0x97 | 0xA2..=0xA7 => peripheral(opcode),
        0x88 | 0x98 | 0xA8 | 0x8A..=0x8E | 0x9A..=0x9E | 0xAA..=0xAE => extended(opcode),
        0xB0 => Entry::new(Op::Clrc, 5),
        0xC0 => Entry::new(Op::MovAB, 6),
        0xC1 => Entry::new(Op::Tstb, 6),
        0xD0 => Entry::new(Op::MovARn, 8),
        0xD1 => Entry::new(Op::MovBRn, 7),
        0xB2..=0xBF | 0xC2..=0xCF | 0xD2..=0xDF => single(opcode),
        0xE0 => Entry::new(Op::Jump(Cond::Always), 7),
        0xE1..=0xE7 => {
            let cond = match opcode {
                0xE1 => Cond::Negative,
                0xE2 => Cond::Equal,
                0xE3 => Cond::Carry,
                0xE4 => Cond::Positive,
                0xE5 => Cond::PositiveOrZero,
                0xE6 => Cond::NotEqual,
                _ => Cond::NoCarry,
            };
            Entry::new(Op::Jump(cond), 5)
        }
        0xE8..=0xFF => Entry::new(Op::Trap(0xFF - opcode), 14),
        _ => Entry::new(Op::Illegal, illegal_cycles),
    };
    if entry.op == Op::Illegal {
        Entry::new(Op::Illegal, illegal_cycles)
    } else {
        entry
    }
}

/// The opcode table with the standard 4-cycle illegal opcode.
pub static OPCODES: LazyLock<DispatchTable<Op>> =
    LazyLock::new(|| DispatchTable::build(256, |op| decode(op as u8, 4)));
