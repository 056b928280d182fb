//! TMS9900 opcode decoding.
//!
//! Instructions are one 16-bit word, sorted into formats by their leading
//! bits:
//!
//! | Range       | Format | Instructions                          |
//! |-------------|--------|---------------------------------------|
//! | 4000-FFFF   | I      | SZC S C A MOV SOC (+ byte forms)      |
//! | 2000-3FFF   | III/IV/IX | COC CZC XOR XOP LDCR STCR MPY DIV  |
//! | 1000-1FFF   | II     | Jumps, SBO SBZ TB                     |
//! | 0800-0BFF   | V      | SRA SRL SLA SRC                       |
//! | 0400-07FF   | VI     | BLWP B X CLR NEG INV INC ... ABS      |
//! | 0200-03FF   | VIII   | LI AI ANDI ORI CI STWP STST LWPI ...  |
//! | 0000-01FF   | -      | TMS9995 LST LWP DIVS MPYS             |
//!
//! Operand fields are pulled from the opcode word by the executor, so the
//! table only records the instruction class and base cycles.

use std::sync::LazyLock;

use emu_core::{DispatchTable, Entry, Width};

use crate::model::InstructionSet;

/// Two-address (format I) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoOp {
    Szc,
    S,
    C,
    A,
    Mov,
    Soc,
}

/// Jump condition (format II).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Jmp,
    /// A> and EQ clear.
    Jlt,
    /// L> clear or EQ set.
    Jle,
    Jeq,
    /// L> or EQ set.
    Jhe,
    Jgt,
    Jne,
    Jnc,
    Joc,
    Jno,
    /// L> and EQ clear.
    Jl,
    /// L> set and EQ clear.
    Jh,
    Jop,
}

/// Single CRU bit operation (format II).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CruBit {
    Sbo,
    Sbz,
    Tb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Sra,
    Srl,
    Sla,
    Src,
}

/// Single-operand (format VI) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Single {
    Blwp,
    B,
    X,
    Clr,
    Neg,
    Inv,
    Inc,
    Inct,
    Dec,
    Dect,
    Bl,
    Swpb,
    Seto,
    Abs,
}

/// Register-immediate (format VIII) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immediate {
    Li,
    Ai,
    Andi,
    Ori,
    Ci,
}

/// Decoded instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    TwoOp(TwoOp, Width),
    Coc,
    Czc,
    Xor,
    Xop,
    Ldcr,
    Stcr,
    Mpy,
    Div,
    Jump(Jump),
    Cru(CruBit),
    Shift(Shift),
    Single(Single),
    Immediate(Immediate),
    Stwp,
    Stst,
    Lwpi,
    Limi,
    Idle,
    Rset,
    Rtwp,
    Ckon,
    Ckof,
    Lrex,
    Lst,
    Lwp,
    Divs,
    Mpys,
    Illegal,
}

const ILLEGAL_CYCLES: u8 = 6;

/// Base cycles for one instruction class, `(tms9900, tms9995)`.
///
/// Addressing-mode overhead, taken jumps, shift counts, CRU bit counts and
/// DIV's quotient are added by the executor.
const fn cycles(op: Op) -> (u8, u8) {
    match op {
        Op::TwoOp(TwoOp::Mov, _) => (14, 3),
        Op::TwoOp(..) | Op::Coc | Op::Czc | Op::Xor => (14, 4),
        Op::Xop => (36, 15),
        Op::Ldcr => (20, 9),
        Op::Stcr => (42, 19),
        Op::Mpy => (52, 23),
        Op::Div => (16, 6),
        Op::Jump(_) => (8, 3),
        Op::Cru(_) => (12, 8),
        Op::Shift(_) => (12, 5),
        Op::Single(s) => match s {
            Single::Blwp => (26, 11),
            Single::B => (8, 3),
            Single::X => (8, 2),
            Single::Bl => (12, 5),
            Single::Neg | Single::Abs => (12, 3),
            Single::Clr | Single::Seto | Single::Swpb => (10, 3),
            Single::Inv | Single::Inc | Single::Inct | Single::Dec | Single::Dect => (10, 4),
        },
        Op::Immediate(Immediate::Li) => (12, 3),
        Op::Immediate(_) => (14, 4),
        Op::Stwp | Op::Stst => (8, 3),
        Op::Lwpi => (10, 4),
        Op::Limi => (16, 5),
        Op::Idle | Op::Rset | Op::Ckon | Op::Ckof | Op::Lrex => (12, 7),
        Op::Rtwp => (14, 6),
        Op::Lst => (0, 5),
        Op::Lwp => (0, 4),
        Op::Divs => (0, 11),
        Op::Mpys => (0, 25),
        Op::Illegal => (ILLEGAL_CYCLES, ILLEGAL_CYCLES),
    }
}

fn two_op(opcode: u16) -> Op {
    let width = if opcode & 0x1000 != 0 {
        Width::Byte
    } else {
        Width::Word
    };
    let op = match opcode >> 13 {
        2 => TwoOp::Szc,
        3 => TwoOp::S,
        4 => TwoOp::C,
        5 => TwoOp::A,
        6 => TwoOp::Mov,
        _ => TwoOp::Soc,
    };
    Op::TwoOp(op, width)
}

fn format_three(opcode: u16) -> Op {
    match (opcode >> 10) & 7 {
        0 => Op::Coc,
        1 => Op::Czc,
        2 => Op::Xor,
        3 => Op::Xop,
        4 => Op::Ldcr,
        5 => Op::Stcr,
        6 => Op::Mpy,
        _ => Op::Div,
    }
}

fn format_two(opcode: u16) -> Op {
    match (opcode >> 8) & 0xF {
        0x0 => Op::Jump(Jump::Jmp),
        0x1 => Op::Jump(Jump::Jlt),
        0x2 => Op::Jump(Jump::Jle),
        0x3 => Op::Jump(Jump::Jeq),
        0x4 => Op::Jump(Jump::Jhe),
        0x5 => Op::Jump(Jump::Jgt),
        0x6 => Op::Jump(Jump::Jne),
        0x7 => Op::Jump(Jump::Jnc),
        0x8 => Op::Jump(Jump::Joc),
        0x9 => Op::Jump(Jump::Jno),
        0xA => Op::Jump(Jump::Jl),
        0xB => Op::Jump(Jump::Jh),
        0xC => Op::Jump(Jump::Jop),
        0xD => Op::Cru(CruBit::Sbo),
        0xE => Op::Cru(CruBit::Sbz),
        _ => Op::Cru(CruBit::Tb),
    }
}

fn single(opcode: u16) -> Op {
    let s = match (opcode >> 6) & 0xF {
        0x0 => Single::Blwp,
        0x1 => Single::B,
        0x2 => Single::X,
        0x3 => Single::Clr,
        0x4 => Single::Neg,
        0x5 => Single::Inv,
        0x6 => Single::Inc,
        0x7 => Single::Inct,
        0x8 => Single::Dec,
        0x9 => Single::Dect,
        0xA => Single::Bl,
        0xB => Single::Swpb,
        0xC => Single::Seto,
        0xD => Single::Abs,
        _ => return Op::Illegal,
    };
    Op::Single(s)
}

/// Format VIII. The TMS9900 ignores the unused low bits; the TMS9995
/// rejects encodings with any of them set.
fn format_eight(opcode: u16, strict: bool) -> Op {
    let row = (opcode >> 5) & 0xF;
    let (op, unused) = match row {
        0x0 => (Op::Immediate(Immediate::Li), 0x0010),
        0x1 => (Op::Immediate(Immediate::Ai), 0x0010),
        0x2 => (Op::Immediate(Immediate::Andi), 0x0010),
        0x3 => (Op::Immediate(Immediate::Ori), 0x0010),
        0x4 => (Op::Immediate(Immediate::Ci), 0x0010),
        0x5 => (Op::Stwp, 0x0010),
        0x6 => (Op::Stst, 0x0010),
        0x7 => (Op::Lwpi, 0x001F),
        0x8 => (Op::Limi, 0x001F),
        0xA => (Op::Idle, 0x001F),
        0xB => (Op::Rset, 0x001F),
        0xC => (Op::Rtwp, 0x001F),
        0xD => (Op::Ckon, 0x001F),
        0xE => (Op::Ckof, 0x001F),
        0xF => (Op::Lrex, 0x001F),
        _ => return Op::Illegal,
    };
    if strict && opcode & unused != 0 {
        Op::Illegal
    } else {
        op
    }
}

fn tms9995_extras(opcode: u16) -> Op {
    match opcode {
        0x0080..=0x008F => Op::Lst,
        0x0090..=0x009F => Op::Lwp,
        0x0180..=0x01BF => Op::Divs,
        0x01C0..=0x01FF => Op::Mpys,
        _ => Op::Illegal,
    }
}

/// Decode one opcode word for an instruction set.
#[must_use]
pub fn decode(opcode: u16, set: InstructionSet) -> Entry<Op> {
    let tms9995 = set == InstructionSet::Tms9995;
    let op = match opcode {
        0x4000..=0xFFFF => two_op(opcode),
        0x2000..=0x3FFF => format_three(opcode),
        0x1000..=0x1FFF => format_two(opcode),
        0x0800..=0x0BFF => match (opcode >> 8) & 3 {
            0 => Op::Shift(Shift::Sra),
            1 => Op::Shift(Shift::Srl),
            2 => Op::Shift(Shift::Sla),
            _ => Op::Shift(Shift::Src),
        },
        0x0400..=0x07FF => single(opcode),
        0x0200..=0x03FF => format_eight(opcode, tms9995),
        _ if tms9995 => tms9995_extras(opcode),
        _ => Op::Illegal,
    };
    let (tms9900_cycles, tms9995_cycles) = cycles(op);
    Entry::new(op, if tms9995 { tms9995_cycles } else { tms9900_cycles })
}

/// Opcode table for the TMS9900 and TMS9980A.
pub static TMS9900_OPCODES: LazyLock<DispatchTable<Op>> =
    LazyLock::new(|| DispatchTable::build(0x1_0000, |op| decode(op as u16, InstructionSet::Tms9900)));

/// Opcode table for the TMS9995.
pub static TMS9995_OPCODES: LazyLock<DispatchTable<Op>> =
    LazyLock::new(|| DispatchTable::build(0x1_0000, |op| decode(op as u16, InstructionSet::Tms9995)));

/// The table for `set`.
#[must_use]
pub fn table(set: InstructionSet) -> &'static DispatchTable<Op> {
    match set {
        InstructionSet::Tms9900 => &TMS9900_OPCODES,
        InstructionSet::Tms9995 => &TMS9995_OPCODES,
    }
}
