//! Cycle-counted Texas Instruments TMS7000 family CPU emulator.
//!
//! Each call to `step()` runs one whole instruction (plus any interrupt
//! service ahead of it) and returns the cycles it took.

mod context;
mod cpu;
pub mod decode;
pub mod flags;
mod model;
pub mod peripheral;
mod registers;

pub use cpu::Tms7000;
pub use model::{Config, Tms7000Model};
pub use registers::{InvalidRegister, Register, Registers};
