//! Read-only state inspection.
//!
//! Debuggers and tests look at a core through string paths such as `pc`,
//! `flags.c` or `r5`. Queries never affect emulation state: a path backed by
//! memory (TMS9900 workspace registers) is answered from the core's own
//! state, never by touching the bus.

use std::fmt;

/// The answer to a state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A flag or line state.
    Bool(bool),
    /// A byte register or port.
    U8(u8),
    /// A word register, address or status word.
    U16(u16),
    U32(u32),
    /// Cycle counts.
    U64(u64),
    /// A signed displacement or count.
    I16(i16),
    /// Names such as the model or a line state.
    String(String),
    /// Grouped values, such as a register file slice.
    Array(Vec<Value>),
}

impl Value {
    /// The value as an unsigned integer, if it is one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(u64::from(v)),
            Value::U16(v) => Some(u64::from(v)),
            Value::U32(v) => Some(u64::from(v)),
            Value::U64(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v:#04X}"),
            Self::U16(v) => write!(f, "{v:#06X}"),
            Self::U32(v) => write!(f, "{v:#010X}"),
            // Cycle counters read better in decimal.
            Self::U64(v) => fmt::Display::fmt(v, f),
            Self::I16(v) => fmt::Display::fmt(v, f),
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                f.write_str("[")?;
                let mut sep = "";
                for item in items {
                    write!(f, "{sep}{item}")?;
                    sep = ", ";
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i16 => I16,
    String => String,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

/// State a debugger can look at without disturbing it.
pub trait Observable {
    /// Look up one property. Paths are dot-separated, for example `pc`,
    /// `flags.z` or `irq.1.latched`; an unknown path gives `None`.
    fn query(&self, path: &str) -> Option<Value>;

    /// List the fixed query paths. Indexed families such as registers
    /// (`r0`, `r1`, ...) are listed by their first member only.
    fn query_paths(&self) -> &'static [&'static str];
}
