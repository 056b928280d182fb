//! Cycle-counted Texas Instruments TMS9900 family CPU emulator.
//!
//! Covers the TMS9900, TMS9980A and TMS9995. Each call to `step()` runs one
//! whole instruction (plus any interrupt context switch ahead of it) and
//! returns the cycles it took. Workspace registers live in memory, so the
//! host's bus sees every register access.

mod context;
mod cpu;
pub mod decode;
pub mod flags;
mod model;
pub mod onchip;
mod registers;

pub use cpu::Tms9900;
pub use model::{Config, DataBus, InstructionSet, Timing, Tms9900Model};
pub use registers::{InvalidRegister, Register, Registers};
