//! Context save and restore.

use emu_core::snapshot::{self, Snapshot, SnapshotError};
use emu_core::{InterruptController, TickDivider, Ticks};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpu::Tms7000;
use crate::model::Config;
use crate::peripheral::PeripheralFile;

#[derive(Serialize, Deserialize)]
struct Context {
    config: Config,
    pc: u16,
    sp: u8,
    st: u8,
    rf: Vec<u8>,
    periph: PeripheralFile,
    irq: InterruptController,
    divider: TickDivider,
    idle: bool,
    total_cycles: Ticks,
}

impl Snapshot for Tms7000 {
    fn save_context(&self) -> Result<Vec<u8>, SnapshotError> {
        snapshot::encode(&Context {
            config: self.config,
            pc: self.pc,
            sp: self.sp,
            st: self.st,
            rf: self.rf.clone(),
            periph: self.periph.clone(),
            irq: self.irq.clone(),
            divider: self.divider,
            idle: self.idle,
            total_cycles: self.total_cycles,
        })
    }

    fn restore_context(&mut self, blob: &[u8]) -> Result<(), SnapshotError> {
        let ctx: Context = snapshot::decode(blob)?;
        if ctx.config != self.config || ctx.rf.len() != self.rf.len() {
            return Err(SnapshotError::ModelMismatch {
                expected: format!("{:?}", self.config),
                found: format!("{:?}", ctx.config),
            });
        }
        self.pc = ctx.pc;
        self.sp = ctx.sp;
        self.st = ctx.st;
        self.rf = ctx.rf;
        self.periph = ctx.periph;
        self.irq = ctx.irq;
        self.divider = ctx.divider;
        self.idle = ctx.idle;
        self.total_cycles = ctx.total_cycles;
        debug!(pc = self.pc, "TMS7000 context restored");
        Ok(())
    }
}
