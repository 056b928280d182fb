//! Opcode dispatch tables.
//!
//! A core decodes its whole opcode space once into a flat table of
//! [`Entry`] values, then execution is a single indexed load per
//! instruction. Tables live in `LazyLock` statics and are never mutated.

/// One decoded opcode: what to run and its base cycle cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<Op> {
    /// Instruction class tag, matched on by the executor.
    pub op: Op,
    /// Base cycle cost before addressing-mode and data-dependent extras.
    pub cycles: u8,
}

impl<Op> Entry<Op> {
    #[must_use]
    pub const fn new(op: Op, cycles: u8) -> Self {
        Self { op, cycles }
    }
}

/// What a core does when it fetches an opcode with no instruction behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IllegalOpcode {
    /// Burn `cycles` and carry on with the next opcode.
    Ignore { cycles: u8 },
    /// Raise the chip's internal illegal-instruction trap.
    Trap,
}

/// A total map from opcode to [`Entry`].
#[derive(Debug, Clone)]
pub struct DispatchTable<Op> {
    entries: Box<[Entry<Op>]>,
    mask: u32,
}

impl<Op: Copy> DispatchTable<Op> {
    /// Build a table by calling `decode` for every opcode in `0..size`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is not a power of two. Tables are built from
    /// constants, so this is a programming error.
    pub fn build(size: usize, mut decode: impl FnMut(u32) -> Entry<Op>) -> Self {
        assert!(size.is_power_of_two(), "dispatch table size must be a power of two");
        let entries: Box<[Entry<Op>]> = (0..size as u32).map(&mut decode).collect();
        Self {
            entries,
            mask: (size - 1) as u32,
        }
    }

    /// Look up an opcode. Bits above the table size are ignored, so every
    /// input has an entry.
    #[must_use]
    pub fn get(&self, opcode: u32) -> Entry<Op> {
        self.entries[(opcode & self.mask) as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(opcode, entry)` pairs in opcode order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Entry<Op>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as u32, *e))
    }
}
