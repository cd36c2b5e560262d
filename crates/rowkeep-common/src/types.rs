//! Small shared enums.

use std::fmt;

/// The mode a store handle is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleMode {
    /// Read-only; safe to open from several callers at once.
    Reader,
    /// Read-write; opening may fail when the store cannot be created.
    Writer,
}

impl HandleMode {
    /// Whether statements on this handle may modify the store.
    pub fn is_writable(self) -> bool {
        matches!(self, HandleMode::Writer)
    }
}

impl fmt::Display for HandleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleMode::Reader => f.write_str("reader"),
            HandleMode::Writer => f.write_str("writer"),
        }
    }
}
