//! TMS9900 family CPU core.
//!
//! Only PC, WP and ST are on chip. The sixteen workspace registers are
//! ordinary memory words at `WP + 2n`, so every register access is a bus
//! access with the same cost as any other operand. The TMS9995 keeps a small
//! RAM, the decrementer and its flag register on chip; those addresses never
//! reach the bus.

mod addressing;
mod execute;

use std::iter;

use emu_core::{
    Bus, Cpu, InterruptController, LineConfig, LineState, MaskCompare, Observable, TickDivider,
    Ticks, Value, Width,
};
use tracing::{debug, trace};

use crate::flags::{self, AGT, C, EQ, LGT, MASK, OP, OV, OVIE, X};
use crate::model::{Config, DataBus, Timing, Tms9900Model};
use crate::onchip::{
    self, DECREMENTER, FLAG_BASE, FLAG_DECREMENTER_ENABLE, INT4, INTERNAL, LATCH_FLAGS, MID_BIT,
    OnChip, Region,
};
use crate::registers::{InvalidRegister, Register, Registers};

/// Vector of the non-maskable LOAD input.
const LOAD_VECTOR: u16 = 0xFFFC;

/// TMS9900 family CPU.
pub struct Tms9900 {
    pub(crate) config: Config,
    pub(crate) timing: Timing,
    pub(crate) pc: u16,
    pub(crate) wp: u16,
    pub(crate) st: u16,
    pub(crate) irq: InterruptController,
    /// TMS9995 RAM, decrementer and flags. Unused on the other members.
    pub(crate) onchip: OnChip,
    pub(crate) divider: TickDivider,
    pub(crate) idle: bool,
    /// Skip interrupt recognition before the next instruction.
    pub(crate) suppress: bool,
    /// Word read by the last byte operand access on a 16-bit bus, for the
    /// write half of a read-modify-write.
    latched_word: Option<(u16, u16)>,
    /// Wait states and bus penalties collected during the current step.
    wait: u32,
    pub(crate) total_cycles: Ticks,
}

impl Tms9900 {
    /// Create a CPU for a family member. Call [`Cpu::reset`] before running.
    #[must_use]
    pub fn new(model: Tms9900Model) -> Self {
        Self::with_config(model.config())
    }

    /// Create a CPU from a hand-made configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let lines: Vec<LineConfig> = (0..config.levels)
            .map(|level| LineConfig::maskable(level, config.latch))
            .chain(iter::once(LineConfig::non_maskable(0, config.latch)))
            .collect();
        Self {
            config,
            timing: config.instruction_set.timing(),
            pc: 0,
            wp: 0,
            st: 0,
            irq: InterruptController::new(&lines, MaskCompare::AtOrBelow),
            onchip: OnChip::default(),
            divider: TickDivider::new(config.tick_divider),
            idle: false,
            suppress: false,
            latched_word: None,
            wait: 0,
            total_cycles: Ticks::ZERO,
        }
    }

    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }

    /// Total cycles consumed since creation, idle time included.
    #[must_use]
    pub const fn total_cycles(&self) -> Ticks {
        self.total_cycles
    }

    #[must_use]
    pub const fn wp(&self) -> u16 {
        self.wp
    }

    #[must_use]
    pub const fn st(&self) -> u16 {
        self.st
    }

    /// Set the program counter, e.g. to start a test program without a
    /// reset vector.
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc & !1;
    }

    /// Whether the TMS9995 MID flag is set.
    #[must_use]
    pub const fn mid(&self) -> bool {
        self.onchip.mid
    }

    /// Read a register. Workspace registers are read through `bus`.
    ///
    /// # Panics
    ///
    /// Panics if the register does not exist.
    pub fn register<B: Bus>(&mut self, bus: &mut B, reg: Register) -> u16 {
        match self.try_register(bus, reg) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_register<B: Bus>(&mut self, bus: &mut B, reg: Register) -> Result<u16, InvalidRegister> {
        Ok(match reg {
            Register::Pc => self.pc,
            Register::Wp => self.wp,
            Register::St => self.st,
            Register::R(n) if n < 16 => self.reg(bus, u16::from(n)),
            Register::R(_) => return Err(InvalidRegister(reg)),
        })
    }

    /// Write a register. Workspace registers are written through `bus`.
    pub fn set_register<B: Bus>(
        &mut self,
        bus: &mut B,
        reg: Register,
        value: u16,
    ) -> Result<(), InvalidRegister> {
        match reg {
            Register::Pc => self.pc = value & !1,
            Register::Wp => self.wp = value & !1,
            Register::St => self.st = value & self.config.st_mask,
            Register::R(n) if n < 16 => self.set_reg(bus, u16::from(n), value),
            Register::R(_) => return Err(InvalidRegister(reg)),
        }
        Ok(())
    }

    // === Memory access ===

    fn bus_read<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u8 {
        let result = bus.read(u32::from(addr & self.config.address_mask));
        self.wait += u32::from(result.wait) + u32::from(self.config.byte_access_cycles);
        result.data
    }

    fn bus_write<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u8) {
        let wait = bus.write(u32::from(addr & self.config.address_mask), value);
        self.wait += u32::from(wait) + u32::from(self.config.byte_access_cycles);
    }

    fn on_chip(&self, addr: u16) -> Region {
        if self.config.on_chip {
            onchip::region(addr)
        } else {
            Region::External
        }
    }

    /// Read a word. The low address bit is ignored.
    pub(crate) fn read_word<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let addr = addr & !1;
        match self.on_chip(addr) {
            Region::Ram(i) => u16::from_be_bytes([self.onchip.ram[i], self.onchip.ram[i + 1]]),
            Region::Decrementer(_) => self.onchip.decrementer.count,
            Region::External => {
                let hi = self.bus_read(bus, addr);
                let lo = self.bus_read(bus, addr | 1);
                u16::from_be_bytes([hi, lo])
            }
        }
    }

    pub(crate) fn write_word<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u16) {
        let addr = addr & !1;
        self.latched_word = None;
        let [hi, lo] = value.to_be_bytes();
        match self.on_chip(addr) {
            Region::Ram(i) => {
                self.onchip.ram[i] = hi;
                self.onchip.ram[i + 1] = lo;
            }
            Region::Decrementer(_) => self.onchip.decrementer.write(value),
            Region::External => {
                self.bus_write(bus, addr, hi);
                self.bus_write(bus, addr | 1, lo);
            }
        }
    }

    /// Read a byte. Even addresses select the MSB of the word.
    pub(crate) fn read_byte<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u8 {
        match self.on_chip(addr) {
            Region::Ram(i) => return self.onchip.ram[i],
            Region::Decrementer(byte) => {
                return self.onchip.decrementer.count.to_be_bytes()[usize::from(byte)];
            }
            Region::External => {}
        }
        match self.config.data_bus {
            DataBus::Byte => self.bus_read(bus, addr),
            DataBus::Word => {
                let word = self.read_word(bus, addr);
                self.latched_word = Some((addr & !1, word));
                word.to_be_bytes()[usize::from(addr & 1)]
            }
        }
    }

    pub(crate) fn write_byte<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u8) {
        match self.on_chip(addr) {
            Region::Ram(i) => {
                self.onchip.ram[i] = value;
                return;
            }
            Region::Decrementer(byte) => {
                self.onchip.decrementer.write_byte(byte, value);
                return;
            }
            Region::External => {}
        }
        match self.config.data_bus {
            DataBus::Byte => self.bus_write(bus, addr, value),
            DataBus::Word => {
                let word_addr = addr & !1;
                let word = match self.latched_word {
                    Some((latched, word)) if latched == word_addr => word,
                    _ => self.read_word(bus, word_addr),
                };
                let mut bytes = word.to_be_bytes();
                bytes[usize::from(addr & 1)] = value;
                self.write_word(bus, word_addr, u16::from_be_bytes(bytes));
            }
        }
    }

    /// Read an operand. Byte operands come back in the low 8 bits.
    pub(crate) fn read_operand<B: Bus>(&mut self, bus: &mut B, addr: u16, width: Width) -> u16 {
        match width {
            Width::Byte => u16::from(self.read_byte(bus, addr)),
            Width::Word => self.read_word(bus, addr),
        }
    }

    pub(crate) fn write_operand<B: Bus>(&mut self, bus: &mut B, addr: u16, width: Width, value: u16) {
        match width {
            Width::Byte => self.write_byte(bus, addr, value as u8),
            Width::Word => self.write_word(bus, addr, value),
        }
    }

    /// Address of workspace register `n`. `n` may be 16 for the second
    /// word of MPY/DIV on R15.
    pub(crate) const fn reg_addr(&self, n: u16) -> u16 {
        self.wp.wrapping_add(n * 2)
    }

    pub(crate) fn reg<B: Bus>(&mut self, bus: &mut B, n: u16) -> u16 {
        self.read_word(bus, self.reg_addr(n))
    }

    pub(crate) fn set_reg<B: Bus>(&mut self, bus: &mut B, n: u16, value: u16) {
        self.write_word(bus, self.reg_addr(n), value);
    }

    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let value = self.read_word(bus, self.pc);
        self.pc = self.pc.wrapping_add(2);
        value
    }

    /// Load WP and PC from `vector` and save the old WP, PC and ST in the new
    /// workspace's R13, R14 and R15.
    pub(crate) fn context_switch<B: Bus>(&mut self, bus: &mut B, vector: u16) {
        let new_wp = self.read_word(bus, vector);
        let new_pc = self.read_word(bus, vector.wrapping_add(2));
        let (old_wp, old_pc, old_st) = (self.wp, self.pc, self.st);
        self.wp = new_wp & !1;
        self.set_reg(bus, 13, old_wp);
        self.set_reg(bus, 14, old_pc);
        self.set_reg(bus, 15, old_st);
        self.pc = new_pc & !1;
    }

    // === CRU ===

    /// CRU base from R12: bits 3-14 of the register.
    pub(crate) fn cru_base<B: Bus>(&mut self, bus: &mut B) -> u16 {
        (self.reg(bus, 12) >> 1) & 0x0FFF
    }

    pub(crate) fn cru_read<B: Bus>(&mut self, bus: &mut B, bit: u16) -> bool {
        let bit = bit & 0x0FFF;
        if self.config.on_chip {
            if let Some(value) = self.internal_cru_read(bit) {
                return value;
            }
        }
        let result = bus.io_read(u32::from(bit));
        self.wait += u32::from(result.wait);
        result.data & 1 != 0
    }

    pub(crate) fn cru_write<B: Bus>(&mut self, bus: &mut B, bit: u16, value: bool) {
        let bit = bit & 0x0FFF;
        if self.config.on_chip && self.internal_cru_write(bit, value) {
            return;
        }
        self.wait += u32::from(bus.io_write(u32::from(bit), u8::from(value)));
    }

    /// TMS9995 flag register and MID flag.
    fn internal_cru_read(&self, bit: u16) -> Option<bool> {
        if bit == MID_BIT {
            return Some(self.onchip.mid);
        }
        let n = bit.checked_sub(FLAG_BASE).filter(|&n| n < 16)?;
        let latch = LATCH_FLAGS.iter().find(|&&(flag, _)| flag == n);
        Some(match latch {
            Some(&(_, line)) => self.irq.is_latched(line),
            None => self.onchip.flags & (1 << n) != 0,
        })
    }

    fn internal_cru_write(&mut self, bit: u16, value: bool) -> bool {
        if bit == MID_BIT {
            self.onchip.mid = value;
            return true;
        }
        let Some(n) = bit.checked_sub(FLAG_BASE).filter(|&n| n < 16) else {
            return false;
        };
        match LATCH_FLAGS.iter().find(|&&(flag, _)| flag == n) {
            Some(&(_, line)) if value => self.irq.set_latch(line),
            Some(&(_, line)) => self.irq.clear_latch(line),
            None => self.onchip.flags = flags::with(self.onchip.flags, 1 << n, value),
        }
        true
    }

    // === Interrupts and timing ===

    /// Latch the TMS9995 internal interrupt for an arithmetic overflow.
    pub(crate) fn overflow_trap(&mut self) {
        if self.config.on_chip && self.st & OVIE != 0 {
            self.irq.set_latch(INTERNAL);
        }
    }

    fn service_interrupt<B: Bus>(&mut self, bus: &mut B) -> Option<u32> {
        let pending = self.irq.pending((self.st & MASK) as u8)?;
        let line = pending.line;
        let load = line == self.config.load_line();
        let vector = if load {
            LOAD_VECTOR
        } else {
            u16::from(pending.level) * 4
        };

        self.context_switch(bus, vector);
        // Level 0 is reset: the mask stays at 0 and cannot hold it off.
        if !load {
            self.st = (self.st & !MASK) | u16::from(pending.level.saturating_sub(1));
        }
        self.irq.acknowledge(line);
        let ack = bus.interrupt_ack(line);
        trace!(line, ack, vector, wp = self.wp, pc = self.pc, "TMS9900 interrupt");

        if self.idle {
            self.idle = false;
            bus.idle_changed(false);
        }
        Some(u32::from(self.timing.interrupt))
    }

    fn clock_decrementer(&mut self) {
        if self.onchip.decrementer.clock() {
            self.irq.set_latch(DECREMENTER);
        }
    }

    /// Charge `cycles`. Every divider tick crossed clocks the decrementer
    /// (when running) and then the host's peripheral hook.
    fn account<B: Bus>(&mut self, bus: &mut B, cycles: u32) {
        self.total_cycles.advance(cycles);
        for _ in 0..self.divider.advance(cycles) {
            if self.config.on_chip && self.onchip.timer_running() {
                self.clock_decrementer();
            }
            if let Some((line, state)) = bus.peripheral_tick() {
                self.set_irq_line(line, state);
            }
        }
    }

    /// One loop iteration. An idle CPU burns cycles up to the next
    /// decrementer tick, but no more than `limit`.
    fn step_within<B: Bus>(&mut self, bus: &mut B, limit: u32) -> u32 {
        self.wait = 0;
        self.latched_word = None;
        let suppressed = std::mem::take(&mut self.suppress);
        let mut cycles = if suppressed {
            0
        } else {
            self.service_interrupt(bus).unwrap_or(0)
        };

        if self.idle {
            let idle = self.divider.until_next().min(limit).max(1);
            self.account(bus, idle);
            return idle;
        }

        cycles += self.execute(bus);
        cycles += self.wait;
        self.account(bus, cycles);
        cycles
    }
}

impl Cpu for Tms9900 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.step_within(bus, u32::MAX)
    }

    fn run<B: Bus>(&mut self, bus: &mut B, budget: u32) -> u32 {
        let mut consumed = 0u32;
        while consumed < budget {
            consumed = consumed.saturating_add(self.step_within(bus, budget - consumed));
        }
        consumed
    }

    /// Reset works like a level 0 interrupt: WP and PC come from 0x0000
    /// and the old WP, PC and ST land in the new R13-R15.
    fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.irq.reset();
        self.onchip.reset();
        self.divider.reset();
        self.suppress = false;
        self.latched_word = None;
        if self.idle {
            self.idle = false;
            bus.idle_changed(false);
        }
        self.wait = 0;
        self.context_switch(bus, 0x0000);
        self.st = 0;
        self.total_cycles.advance(u32::from(self.timing.reset) + self.wait);
        debug!(wp = self.wp, pc = self.pc, "TMS9900 reset");
    }

    fn set_irq_line(&mut self, line: u8, state: LineState) {
        if self.config.on_chip && line == INT4 {
            let high = state.is_active();
            let rising = high && !self.onchip.int4;
            self.onchip.int4 = high;
            if self.onchip.event_counting() {
                if rising && self.onchip.flags & FLAG_DECREMENTER_ENABLE != 0 {
                    self.clock_decrementer();
                }
                return;
            }
        }
        self.irq.assert_line(line, state);
    }

    fn pc(&self) -> u32 {
        u32::from(self.pc)
    }

    fn registers(&self) -> Registers {
        Registers {
            pc: self.pc,
            wp: self.wp,
            st: self.st,
        }
    }

    fn is_idle(&self) -> bool {
        self.idle
    }
}

const QUERY_PATHS: &[&str] = &[
    "pc",
    "wp",
    "st",
    "mask",
    "flags.lgt",
    "flags.agt",
    "flags.eq",
    "flags.c",
    "flags.ov",
    "flags.op",
    "flags.x",
    "idle",
    "cycles",
    "irq.0.latched",
];

impl Observable for Tms9900 {
    /// Workspace registers (`r0`-`r15`) are only answered while the
    /// workspace sits in TMS9995 on-chip RAM. Elsewhere they live behind the
    /// bus. The TMS9995 also answers `flags.ovie`, `mid`, `flag_register`,
    /// `decrementer.start` and `decrementer.count`.
    fn query(&self, path: &str) -> Option<Value> {
        let bit = |mask: u16| Some((self.st & mask != 0).into());
        match path {
            "pc" => Some(self.pc.into()),
            "wp" => Some(self.wp.into()),
            "st" => Some(self.st.into()),
            "mask" => Some(((self.st & MASK) as u8).into()),
            "flags.lgt" => bit(LGT),
            "flags.agt" => bit(AGT),
            "flags.eq" => bit(EQ),
            "flags.c" => bit(C),
            "flags.ov" => bit(OV),
            "flags.op" => bit(OP),
            "flags.x" => bit(X),
            "idle" => Some(self.idle.into()),
            "cycles" => Some(self.total_cycles.get().into()),
            "flags.ovie" if self.config.on_chip => bit(OVIE),
            "mid" if self.config.on_chip => Some(self.onchip.mid.into()),
            "flag_register" if self.config.on_chip => {
                let latches = LATCH_FLAGS
                    .iter()
                    .filter(|&&(_, line)| self.irq.is_latched(line))
                    .fold(0u16, |acc, &(flag, _)| acc | (1 << flag));
                Some((self.onchip.flags | latches).into())
            }
            "decrementer.start" if self.config.on_chip => {
                Some(self.onchip.decrementer.start.into())
            }
            "decrementer.count" if self.config.on_chip => {
                Some(self.onchip.decrementer.count.into())
            }
            _ => {
                if let Some(n) = path.strip_prefix('r') {
                    let n: u16 = n.parse().ok().filter(|&n| n < 16)?;
                    let addr = self.reg_addr(n);
                    return match self.on_chip(addr) {
                        Region::Ram(i) if i % 2 == 0 => Some(
                            u16::from_be_bytes([self.onchip.ram[i], self.onchip.ram[i + 1]]).into(),
                        ),
                        _ => None,
                    };
                }
                let rest = path.strip_prefix("irq.")?;
                let (line, field) = rest.split_once('.')?;
                let line: u8 = line.parse().ok()?;
                if usize::from(line) >= self.irq.len() {
                    return None;
                }
                match field {
                    "latched" => Some(self.irq.is_latched(line).into()),
                    "state" => Some(Value::String(format!("{:?}", self.irq.state(line)))),
                    _ => None,
                }
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
