//! CPU core trait.

use crate::{Bus, LineState};

/// An instruction-granular CPU core.
///
/// Each call to [`step`](Cpu::step) runs one iteration of the execution loop:
/// service a pending interrupt (or idle), then fetch, decode and execute one
/// instruction. Interrupts are only recognised between instructions.
///
/// The bus is passed in, not owned, so the host can share it with other
/// components and inspect it between calls.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Run one iteration of the execution loop and return the cycles it
    /// consumed. Always at least one.
    fn step<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Run whole instructions until at least `budget` cycles have been
    /// consumed. Returns the cycles actually consumed, which may overshoot
    /// the budget by up to one instruction but never falls short of it.
    fn run<B: Bus>(&mut self, bus: &mut B, budget: u32) -> u32 {
        let mut consumed = 0u32;
        while consumed < budget {
            consumed = consumed.saturating_add(self.step(bus));
        }
        consumed
    }

    /// Reset the CPU: load the reset vector and clear interrupt state.
    fn reset<B: Bus>(&mut self, bus: &mut B);

    /// Drive an interrupt input line.
    ///
    /// Line numbering is per family. Out-of-range lines are ignored.
    fn set_irq_line(&mut self, line: u8, state: LineState);

    /// Returns the current program counter.
    ///
    /// Returns `u32` so every address width fits. 16-bit CPUs zero-extend.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true while the CPU is idling, waiting for an interrupt.
    fn is_idle(&self) -> bool;
}
