//! Context save and restore.

use emu_core::snapshot::{self, Snapshot, SnapshotError};
use emu_core::{InterruptController, TickDivider, Ticks};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpu::Tms9900;
use crate::model::Config;
use crate::onchip::OnChip;

#[derive(Serialize, Deserialize)]
struct Context {
    config: Config,
    pc: u16,
    wp: u16,
    st: u16,
    irq: InterruptController,
    onchip: OnChip,
    divider: TickDivider,
    idle: bool,
    suppress: bool,
    total_cycles: Ticks,
}

impl Snapshot for Tms9900 {
    fn save_context(&self) -> Result<Vec<u8>, SnapshotError> {
        snapshot::encode(&Context {
            config: self.config,
            pc: self.pc,
            wp: self.wp,
            st: self.st,
            irq: self.irq.clone(),
            onchip: self.onchip.clone(),
            divider: self.divider,
            idle: self.idle,
            suppress: self.suppress,
            total_cycles: self.total_cycles,
        })
    }

    fn restore_context(&mut self, blob: &[u8]) -> Result<(), SnapshotError> {
        let ctx: Context = snapshot::decode(blob)?;
        if ctx.config != self.config || ctx.irq.len() != self.irq.len() {
            return Err(SnapshotError::ModelMismatch {
                expected: format!("{:?}", self.config),
                found: format!("{:?}", ctx.config),
            });
        }
        self.pc = ctx.pc;
        self.wp = ctx.wp;
        self.st = ctx.st;
        self.irq = ctx.irq;
        self.onchip = ctx.onchip;
        self.divider = ctx.divider;
        self.idle = ctx.idle;
        self.suppress = ctx.suppress;
        self.total_cycles = ctx.total_cycles;
        debug!(wp = self.wp, pc = self.pc, "TMS9900 context restored");
        Ok(())
    }
}
