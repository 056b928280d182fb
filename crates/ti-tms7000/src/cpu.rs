//! TMS7000 CPU core.
//!
//! The register file, stack and the interrupt/timer half of the peripheral
//! file are on chip and never reach the bus. Everything else (ROM, external
//! RAM, ports and expansion peripherals) goes through the bus passed into
//! each call.

mod execute;

use emu_core::{
    Bus, Cpu, InterruptController, LatchPolicy, LineConfig, LineState, MaskCompare, Observable,
    TickDivider, Ticks, Value,
};
use tracing::{debug, trace};

use crate::flags::{self, C, I, N, Z};
use crate::model::{Config, Tms7000Model};
use crate::peripheral::{INT1, INT2, INT3, PeripheralFile, Route};
use crate::registers::{InvalidRegister, Register, Registers};

/// Reset vector, MSB first.
const RESET_VECTOR: u16 = 0xFFFE;
/// Interrupt vectors for INT1, INT2 and INT3.
const INT_VECTORS: [u16; 3] = [0xFFFC, 0xFFFA, 0xFFF8];
const SERVICE_CYCLES: u32 = 19;
/// Waking from IDLE skips the instruction wind-down.
const SERVICE_CYCLES_FROM_IDLE: u32 = 17;
/// Register file bounds: A and B at the bottom, the peripheral file above.
const RF_MIN: u16 = 2;
const RF_MAX: u16 = 0x100;

/// TMS7000 family CPU.
pub struct Tms7000 {
    pub(crate) config: Config,
    pub(crate) pc: u16,
    pub(crate) sp: u8,
    pub(crate) st: u8,
    /// On-chip register file. A is `rf[0]`, B is `rf[1]`.
    pub(crate) rf: Vec<u8>,
    pub(crate) periph: PeripheralFile,
    pub(crate) irq: InterruptController,
    pub(crate) divider: TickDivider,
    pub(crate) idle: bool,
    /// Wait states collected during the current step.
    wait: u32,
    pub(crate) total_cycles: Ticks,
}

impl Tms7000 {
    /// Create a CPU for a family member. Call [`Cpu::reset`] before running.
    #[must_use]
    pub fn new(model: Tms7000Model) -> Self {
        Self::with_config(model.config())
    }

    /// Create a CPU from a hand-made configuration. `rf_size` is clamped
    /// to 2..=256 bytes.
    #[must_use]
    pub fn with_config(mut config: Config) -> Self {
        config.rf_size = config.rf_size.clamp(RF_MIN, RF_MAX);
        let lines = [
            LineConfig::maskable(1, LatchPolicy::EdgeLatched),
            LineConfig::maskable(2, LatchPolicy::EdgeLatched),
            LineConfig::maskable(3, LatchPolicy::EdgeLatched),
        ];
        let mut cpu = Self {
            config,
            pc: 0,
            sp: 1,
            st: 0,
            rf: vec![0; usize::from(config.rf_size)],
            periph: PeripheralFile::default(),
            irq: InterruptController::new(&lines, MaskCompare::AtOrBelow),
            divider: TickDivider::new(config.tick_divider),
            idle: false,
            wait: 0,
            total_cycles: Ticks::ZERO,
        };
        cpu.sync_enables();
        cpu
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
    pub fn a(&self) -> u8 {
        self.rf[0]
    }

    #[must_use]
    pub fn b(&self) -> u8 {
        self.rf[1]
    }

    #[must_use]
    pub const fn sp(&self) -> u8 {
        self.sp
    }

    #[must_use]
    pub const fn st(&self) -> u8 {
        self.st
    }

    /// Set the program counter, e.g. to start a test program without a
    /// reset vector.
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Read a register.
    ///
    /// # Panics
    ///
    /// Panics if the register does not exist on this variant.
    #[must_use]
    pub fn register(&self, reg: Register) -> u16 {
        match self.try_register(reg) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_register(&self, reg: Register) -> Result<u16, InvalidRegister> {
        Ok(match reg {
            Register::Pc => self.pc,
            Register::Sp => u16::from(self.sp),
            Register::St => u16::from(self.st),
            Register::A => u16::from(self.rf[0]),
            Register::B => u16::from(self.rf[1]),
            Register::R(n) => u16::from(*self.rf.get(usize::from(n)).ok_or(InvalidRegister(reg))?),
        })
    }

    /// Write a register. 8-bit registers take the low byte of `value`.
    pub fn set_register(&mut self, reg: Register, value: u16) -> Result<(), InvalidRegister> {
        match reg {
            Register::Pc => self.pc = value,
            Register::Sp => self.sp = value as u8,
            Register::St => self.st = value as u8 & flags::ST_MASK,
            Register::A => self.rf[0] = value as u8,
            Register::B => self.rf[1] = value as u8,
            Register::R(n) => {
                *self.rf.get_mut(usize::from(n)).ok_or(InvalidRegister(reg))? = value as u8;
            }
        }
        Ok(())
    }

    // === Memory access ===

    /// Read a byte from the unified address space.
    pub(crate) fn read<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u8 {
        if addr < self.config.rf_size {
            return self.rf[usize::from(addr)];
        }
        if addr >> 8 == 0x01 {
            return self.read_periph(bus, addr as u8);
        }
        let result = bus.read(u32::from(addr));
        self.wait += u32::from(result.wait);
        result.data
    }

    pub(crate) fn write<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u8) {
        if addr < self.config.rf_size {
            self.rf[usize::from(addr)] = value;
            return;
        }
        if addr >> 8 == 0x01 {
            self.write_periph(bus, addr as u8, value);
            return;
        }
        self.wait += u32::from(bus.write(u32::from(addr), value));
    }

    /// Read a 16-bit value, MSB first.
    pub(crate) fn read_word<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let hi = self.read(bus, addr);
        let lo = self.read(bus, addr.wrapping_add(1));
        u16::from_be_bytes([hi, lo])
    }

    pub(crate) fn read_periph<B: Bus>(&mut self, bus: &mut B, n: u8) -> u8 {
        match PeripheralFile::route(n) {
            Route::Iocnt0 => self.iocnt0(),
            Route::T1Data => self.periph.timer1.decrementer,
            Route::T1Ctl => self.periph.timer1.capture,
            Route::Port(port) => {
                let result = bus.io_read(u32::from(port));
                self.wait += u32::from(result.wait);
                result.data
            }
            Route::External => {
                let result = bus.read(0x0100 | u32::from(n));
                self.wait += u32::from(result.wait);
                result.data
            }
        }
    }

    pub(crate) fn write_periph<B: Bus>(&mut self, bus: &mut B, n: u8, value: u8) {
        match PeripheralFile::route(n) {
            Route::Iocnt0 => {
                let cleared = self.periph.write_iocnt0(value);
                for (line, clear) in (0u8..).zip(cleared) {
                    if clear {
                        self.irq.clear_latch(line);
                    }
                }
                self.sync_enables();
            }
            Route::T1Data => self.periph.timer1.reload = value,
            Route::T1Ctl => self.periph.timer1.write_control(value),
            Route::Port(port) => {
                self.wait += u32::from(bus.io_write(u32::from(port), value));
            }
            Route::External => {
                self.wait += u32::from(bus.write(0x0100 | u32::from(n), value));
            }
        }
    }

    /// Register file access by register number. Numbers past the on-chip
    /// file fall through to memory.
    pub(crate) fn reg<B: Bus>(&mut self, bus: &mut B, n: u8) -> u8 {
        self.read(bus, u16::from(n))
    }

    pub(crate) fn set_reg<B: Bus>(&mut self, bus: &mut B, n: u8, value: u8) {
        self.write(bus, u16::from(n), value);
    }

    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let hi = self.fetch(bus);
        let lo = self.fetch(bus);
        u16::from_be_bytes([hi, lo])
    }

    /// Stack grows upward: increment, then store.
    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        self.sp = self.sp.wrapping_add(1);
        self.write(bus, u16::from(self.sp), value);
    }

    pub(crate) fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, u16::from(self.sp));
        self.sp = self.sp.wrapping_sub(1);
        value
    }

    pub(crate) fn push_pc<B: Bus>(&mut self, bus: &mut B) {
        let [hi, lo] = self.pc.to_be_bytes();
        self.push(bus, hi);
        self.push(bus, lo);
    }

    pub(crate) fn pop_pc<B: Bus>(&mut self, bus: &mut B) {
        let lo = self.pop(bus);
        let hi = self.pop(bus);
        self.pc = u16::from_be_bytes([hi, lo]);
    }

    // === Interrupts and timing ===

    /// IOCNT0 as the CPU reads it: a flag shows a latched edge or a line
    /// still held active.
    fn iocnt0(&self) -> u8 {
        let flags = [INT1, INT2, INT3]
            .map(|line| self.irq.is_latched(line) || self.irq.state(line).is_active());
        self.periph.read_iocnt0(flags)
    }

    /// Mirror the IOCNT0 enable bits into the controller.
    fn sync_enables(&mut self) {
        for line in [INT1, INT2, INT3] {
            self.irq.set_enabled(line, self.periph.enabled(line));
        }
    }

    fn service_interrupt<B: Bus>(&mut self, bus: &mut B) -> Option<u32> {
        if self.st & I == 0 {
            return None;
        }
        let pending = self.irq.pending(u8::MAX)?;
        let line = pending.line;
        let cycles = if self.idle {
            SERVICE_CYCLES_FROM_IDLE
        } else {
            SERVICE_CYCLES
        };

        self.push(bus, self.st);
        self.push_pc(bus);
        self.st = 0;
        let vector = INT_VECTORS[usize::from(line)];
        self.pc = self.read_word(bus, vector);
        self.irq.acknowledge(line);
        let ack = bus.interrupt_ack(line);
        trace!(line, ack, vector, pc = self.pc, "TMS7000 interrupt");

        if self.idle {
            self.idle = false;
            bus.idle_changed(false);
        }
        Some(cycles)
    }

    /// Charge `cycles`. Every divider tick crossed clocks timer 1 and then
    /// the host's peripheral hook.
    fn account<B: Bus>(&mut self, bus: &mut B, cycles: u32) {
        self.total_cycles.advance(cycles);
        for _ in 0..self.divider.advance(cycles) {
            if self.periph.timer1.clock() {
                self.irq.set_latch(INT2);
            }
            if let Some((line, state)) = bus.peripheral_tick() {
                self.set_irq_line(line, state);
            }
        }
    }

    /// One loop iteration. An idle CPU burns cycles up to the next timer
    /// tick, but no more than `limit`.
    fn step_within<B: Bus>(&mut self, bus: &mut B, limit: u32) -> u32 {
        self.wait = 0;
        let mut cycles = self.service_interrupt(bus).unwrap_or(0);

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

impl Cpu for Tms7000 {
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

    fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.st = 0;
        self.sp = 1;
        self.periph = PeripheralFile::default();
        self.irq.reset();
        self.sync_enables();
        self.divider.reset();
        if self.idle {
            self.idle = false;
            bus.idle_changed(false);
        }
        self.wait = 0;
        self.pc = self.read_word(bus, RESET_VECTOR);
        debug!(pc = self.pc, "TMS7000 reset");
    }

    fn set_irq_line(&mut self, line: u8, state: LineState) {
        let rising = self.irq.assert_line(line, state);
        if rising && line == INT3 {
            self.periph.timer1.capture = self.periph.timer1.decrementer;
        }
    }

    fn pc(&self) -> u32 {
        u32::from(self.pc)
    }

    fn registers(&self) -> Registers {
        Registers {
            pc: self.pc,
            sp: self.sp,
            st: self.st,
            a: self.rf[0],
            b: self.rf[1],
        }
    }

    fn is_idle(&self) -> bool {
        self.idle
    }
}

const QUERY_PATHS: &[&str] = &[
    "pc",
    "sp",
    "st",
    "a",
    "b",
    "r0",
    "flags.c",
    "flags.n",
    "flags.z",
    "flags.i",
    "idle",
    "cycles",
    "iocnt0",
    "timer1.reload",
    "timer1.control",
    "timer1.prescaler",
    "timer1.decrementer",
    "timer1.capture",
    "irq.0.latched",
];

impl Observable for Tms7000 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.pc.into()),
            "sp" => Some(self.sp.into()),
            "st" => Some(self.st.into()),
            "a" => Some(self.rf[0].into()),
            "b" => Some(self.rf[1].into()),
            "flags.c" => Some((self.st & C != 0).into()),
            "flags.n" => Some((self.st & N != 0).into()),
            "flags.z" => Some((self.st & Z != 0).into()),
            "flags.i" => Some((self.st & I != 0).into()),
            "idle" => Some(self.idle.into()),
            "cycles" => Some(self.total_cycles.get().into()),
            "iocnt0" => Some(self.iocnt0().into()),
            "timer1.reload" => Some(self.periph.timer1.reload.into()),
            "timer1.control" => Some(self.periph.timer1.control.into()),
            "timer1.prescaler" => Some(self.periph.timer1.prescaler.into()),
            "timer1.decrementer" => Some(self.periph.timer1.decrementer.into()),
            "timer1.capture" => Some(self.periph.timer1.capture.into()),
            _ => {
                if let Some(n) = path.strip_prefix('r') {
                    let n: usize = n.parse().ok()?;
                    return self.rf.get(n).map(|&v| v.into());
                }
                let rest = path.strip_prefix("irq.")?;
                let (line, field) = rest.split_once('.')?;
                let line: u8 = line.parse().ok()?;
                if usize::from(line) >= self.irq.len() {
                    return None;
                }
                match field {
                    "latched" => Some(self.irq.is_latched(line).into()),
                    "enabled" => Some(self.irq.is_enabled(line).into()),
                    _ => None,
                }
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
