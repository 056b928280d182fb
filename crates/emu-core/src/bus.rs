//! Memory and I/O bus interface.

use crate::LineState;

/// Result of a byte read: the data plus any wait states the access cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    /// Byte read from the bus.
    pub data: u8,
    /// Extra cycles inserted by slow memory or a busy peripheral.
    pub wait: u8,
}

impl ReadResult {
    /// A read with no wait states.
    #[must_use]
    pub const fn new(data: u8) -> Self {
        Self { data, wait: 0 }
    }

    /// A read that stalled the CPU for `wait` extra cycles.
    #[must_use]
    pub const fn with_wait(data: u8, wait: u8) -> Self {
        Self { data, wait }
    }
}

/// Result of a 16-bit read assembled from two byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordResult {
    /// Word read from the bus.
    pub data: u16,
    /// Combined wait states of both byte accesses.
    pub wait: u8,
}

/// Memory and I/O bus interface.
///
/// CPU cores never own their memory. The host passes the bus into every
/// call, and the bus decides what lives at each address (RAM, ROM,
/// peripherals, open bus). Reads are not assumed to be idempotent: a
/// peripheral may clear a status bit when it is read, so cores only touch an
/// address as many times as the real chip does.
pub trait Bus {
    /// Read a byte from the memory space.
    fn read(&mut self, address: u32) -> ReadResult;

    /// Write a byte to the memory space. Returns wait states.
    fn write(&mut self, address: u32, value: u8) -> u8;

    /// Read from the I/O space (ports, or CRU bits on the TMS9900 family).
    fn io_read(&mut self, address: u32) -> ReadResult;

    /// Write to the I/O space. Returns wait states.
    fn io_write(&mut self, address: u32, value: u8) -> u8;

    /// Interrupt acknowledge. Called when the CPU takes the interrupt on
    /// `line`, so the device that raised it can drop its request.
    ///
    /// Returns the vector or level the device puts on the bus. The default
    /// echoes the line number back.
    fn interrupt_ack(&mut self, line: u8) -> u8 {
        line
    }

    /// Called when the CPU enters or leaves its idle (wait-for-interrupt)
    /// state.
    fn idle_changed(&mut self, _idle: bool) {}

    /// Called once for every peripheral clock tick (the CPU clock through
    /// the core's tick divider), after the instruction that crossed it.
    ///
    /// A host timer may return an interrupt line to drive. The core applies
    /// it as if the host had called `set_irq_line`, so it is serviced no
    /// earlier than the next loop iteration.
    fn peripheral_tick(&mut self) -> Option<(u8, LineState)> {
        None
    }

    /// Read a big-endian word as two byte accesses, high byte first.
    fn read_word_be(&mut self, address: u32) -> WordResult {
        let hi = self.read(address);
        let lo = self.read(address.wrapping_add(1));
        WordResult {
            data: (u16::from(hi.data) << 8) | u16::from(lo.data),
            wait: hi.wait.saturating_add(lo.wait),
        }
    }

    /// Write a big-endian word as two byte accesses, high byte first.
    /// Returns the combined wait states.
    fn write_word_be(&mut self, address: u32, value: u16) -> u8 {
        let hi = self.write(address, (value >> 8) as u8);
        let lo = self.write(address.wrapping_add(1), value as u8);
        hi.saturating_add(lo)
    }
}

/// Flat 64 KB RAM bus with a 64 KB I/O latch space.
///
/// Records interrupt acknowledges and idle transitions so tests can check
/// the CPU's outbound callbacks.
#[derive(Debug, Clone)]
pub struct SimpleBus {
    ram: Vec<u8>,
    io: Vec<u8>,
    /// Lines passed to [`Bus::interrupt_ack`], oldest first.
    pub acknowledged: Vec<u8>,
    /// Last value passed to [`Bus::idle_changed`].
    pub idle: bool,
    /// Calls to [`Bus::peripheral_tick`] so far.
    pub peripheral_ticks: u64,
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBus {
    /// Create a bus with zeroed RAM and I/O.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: vec![0; 0x1_0000],
            io: vec![0; 0x1_0000],
            acknowledged: Vec::new(),
            idle: false,
            peripheral_ticks: 0,
        }
    }

    /// Copy `data` into RAM starting at `address`, wrapping at 64 KB.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            let addr = address.wrapping_add(offset as u16);
            self.ram[addr as usize] = byte;
        }
    }

    /// Read RAM without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    /// Read a big-endian word from RAM without side effects.
    #[must_use]
    pub fn peek_word(&self, address: u16) -> u16 {
        (u16::from(self.peek(address)) << 8) | u16::from(self.peek(address.wrapping_add(1)))
    }

    /// Write RAM without side effects.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }

    /// Write a big-endian word to RAM.
    pub fn poke_word(&mut self, address: u16, value: u16) {
        self.poke(address, (value >> 8) as u8);
        self.poke(address.wrapping_add(1), value as u8);
    }

    /// Current value of an I/O latch.
    #[must_use]
    pub fn peek_io(&self, address: u16) -> u8 {
        self.io[address as usize]
    }

    /// Set an I/O latch, e.g. to present an input port value.
    pub fn poke_io(&mut self, address: u16, value: u8) {
        self.io[address as usize] = value;
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u32) -> ReadResult {
        ReadResult::new(self.ram[(address & 0xFFFF) as usize])
    }

    fn write(&mut self, address: u32, value: u8) -> u8 {
        self.ram[(address & 0xFFFF) as usize] = value;
        0
    }

    fn io_read(&mut self, address: u32) -> ReadResult {
        ReadResult::new(self.io[(address & 0xFFFF) as usize])
    }

    fn io_write(&mut self, address: u32, value: u8) -> u8 {
        self.io[(address & 0xFFFF) as usize] = value;
        0
    }

    fn interrupt_ack(&mut self, line: u8) -> u8 {
        self.acknowledged.push(line);
        line
    }

    fn idle_changed(&mut self, idle: bool) {
        self.idle = idle;
    }

    fn peripheral_tick(&mut self) -> Option<(u8, LineState)> {
        self.peripheral_ticks += 1;
        None
    }
}
