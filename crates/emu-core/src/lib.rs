//! Core traits and types for instruction-granular CPU cores.
//!
//! Cores run whole instructions and report how many clock cycles each one
//! took. Everything a core needs beyond its own instruction set lives here:
//! the bus it talks to, the flag and BCD arithmetic its ALU shares with
//! other families, the opcode dispatch table, interrupt bookkeeping and
//! context save/restore.

pub mod alu;
pub mod bcd;
mod bus;
mod cpu;
mod dispatch;
mod interrupt;
mod observable;
pub mod snapshot;
mod ticks;

pub use alu::{FlagSet, Width};
pub use bus::{Bus, ReadResult, SimpleBus, WordResult};
pub use cpu::Cpu;
pub use dispatch::{DispatchTable, Entry, IllegalOpcode};
pub use interrupt::{
    InterruptController, LatchPolicy, LineConfig, LineState, MaskCompare, Pending,
};
pub use observable::{Observable, Value};
pub use snapshot::{Snapshot, SnapshotError};
pub use ticks::{TickDivider, Ticks};
