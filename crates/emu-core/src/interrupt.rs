//! Prioritised interrupt controller.
//!
//! Tracks the state of each interrupt input, the per-line latches and
//! enables, and picks the line to service next. The CPU core owns the
//! controller; hosts drive lines through [`Cpu::set_irq_line`].
//!
//! [`Cpu::set_irq_line`]: crate::Cpu::set_irq_line

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Electrical state of an interrupt input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineState {
    /// Not requesting.
    #[default]
    Clear,
    /// Level request. Stays asserted until the host clears it.
    Asserted,
    /// Edge request. Cleared automatically when the CPU acknowledges it.
    Held,
}

impl LineState {
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Clear)
    }
}

/// How a line's request is remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatchPolicy {
    /// The line is sampled at every check. A pulse that goes away before the
    /// CPU looks is lost.
    Combinatorial,
    /// A rising edge sets a sticky latch, even while the line is disabled or
    /// masked. The latch holds until serviced or cleared.
    EdgeLatched,
}

/// How a line's level is compared with the CPU's interrupt mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskCompare {
    /// Eligible when `level <= mask`.
    AtOrBelow,
    /// Eligible when `level < mask`.
    Below,
}

impl MaskCompare {
    const fn admits(self, level: u8, mask: u8) -> bool {
        match self {
            Self::AtOrBelow => level <= mask,
            Self::Below => level < mask,
        }
    }
}

/// Static description of one interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Priority level. Lower numbers win.
    pub level: u8,
    /// Non-maskable lines ignore the CPU mask.
    pub maskable: bool,
    /// Whether the line latches rising edges.
    pub policy: LatchPolicy,
}

impl LineConfig {
    #[must_use]
    pub const fn maskable(level: u8, policy: LatchPolicy) -> Self {
        Self {
            level,
            maskable: true,
            policy,
        }
    }

    #[must_use]
    pub const fn non_maskable(level: u8, policy: LatchPolicy) -> Self {
        Self {
            level,
            maskable: false,
            policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LineSlot {
    level: u8,
    maskable: bool,
    policy: LatchPolicy,
    enabled: bool,
    state: LineState,
    latched: bool,
}

impl LineSlot {
    fn active(&self) -> bool {
        match self.policy {
            LatchPolicy::EdgeLatched => self.latched || self.state == LineState::Asserted,
            LatchPolicy::Combinatorial => self.state.is_active(),
        }
    }
}

/// The line chosen for service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub line: u8,
    pub level: u8,
}

/// Interrupt line bookkeeping for one CPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptController {
    lines: Vec<LineSlot>,
    compare: MaskCompare,
}

impl InterruptController {
    /// Build a controller with one slot per entry in `lines`. Every line
    /// starts enabled and clear.
    #[must_use]
    pub fn new(lines: &[LineConfig], compare: MaskCompare) -> Self {
        Self {
            lines: lines
                .iter()
                .map(|c| LineSlot {
                    level: c.level,
                    maskable: c.maskable,
                    policy: c.policy,
                    enabled: true,
                    state: LineState::Clear,
                    latched: false,
                })
                .collect(),
            compare,
        }
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drive `line` to `state`. Returns true if this was a rising edge.
    pub fn assert_line(&mut self, line: u8, state: LineState) -> bool {
        let Some(slot) = self.lines.get_mut(line as usize) else {
            warn!(line, "interrupt line out of range");
            return false;
        };
        let rising = !slot.state.is_active() && state.is_active();
        slot.state = state;
        if rising && slot.policy == LatchPolicy::EdgeLatched {
            slot.latched = true;
        }
        rising
    }

    /// The highest-priority line that wants service under `mask`, if any.
    /// Ties on level go to the lower line number.
    #[must_use]
    pub fn pending(&self, mask: u8) -> Option<Pending> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, s)| s.enabled && s.active())
            .filter(|(_, s)| !s.maskable || self.compare.admits(s.level, mask))
            .min_by_key(|(i, s)| (s.level, *i))
            .map(|(i, s)| Pending {
                line: i as u8,
                level: s.level,
            })
    }

    /// The CPU took `line`: drop its latch and release an edge request.
    pub fn acknowledge(&mut self, line: u8) {
        if let Some(slot) = self.lines.get_mut(line as usize) {
            slot.latched = false;
            if slot.state == LineState::Held {
                slot.state = LineState::Clear;
            }
        }
    }

    /// Set a latch directly, as on-chip sources (timers, traps) do.
    pub fn set_latch(&mut self, line: u8) {
        if let Some(slot) = self.lines.get_mut(line as usize) {
            slot.latched = true;
        }
    }

    pub fn clear_latch(&mut self, line: u8) {
        if let Some(slot) = self.lines.get_mut(line as usize) {
            slot.latched = false;
        }
    }

    #[must_use]
    pub fn is_latched(&self, line: u8) -> bool {
        self.lines.get(line as usize).is_some_and(|s| s.latched)
    }

    /// Enable or disable a line. Disabled lines still latch edges but are
    /// never returned by [`pending`](Self::pending).
    pub fn set_enabled(&mut self, line: u8, enabled: bool) {
        if let Some(slot) = self.lines.get_mut(line as usize) {
            slot.enabled = enabled;
        }
    }

    #[must_use]
    pub fn is_enabled(&self, line: u8) -> bool {
        self.lines.get(line as usize).is_some_and(|s| s.enabled)
    }

    #[must_use]
    pub fn state(&self, line: u8) -> LineState {
        self.lines
            .get(line as usize)
            .map_or(LineState::Clear, |s| s.state)
    }

    /// Clear every latch and re-enable every line. Input states are left
    /// alone: they belong to whoever drives the pins.
    pub fn reset(&mut self) {
        for slot in &mut self.lines {
            slot.latched = false;
            slot.enabled = true;
        }
    }
}
