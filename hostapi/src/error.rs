//! Host-side error types for the wasmbridge host functions.
//!
//! `HostError` is returned by the memory-facing `HostApi` methods. When a
//! host function returns one, the engine turns it into a guest trap, so the
//! failure unwinds to whoever called the guest export.

use std::fmt;

/// Host-side error type returned by HostApi methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The instance does not export its linear memory as `mem`.
    MemoryExportMissing,
    /// The byte range `[offset, offset + len)` lies outside linear memory.
    OutOfBounds {
        offset: u64,
        len: u64,
        memory_size: usize,
    },
    /// An internal host error with a descriptive message.
    Internal(String),
}

impl HostError {
    /// Create an out-of-bounds error for a byte range.
    pub fn out_of_bounds(offset: u64, len: u64, memory_size: usize) -> Self {
        Self::OutOfBounds {
            offset,
            len,
            memory_size,
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryExportMissing => {
                write!(f, "module does not export its memory as \"mem\"")
            }
            Self::OutOfBounds {
                offset,
                len,
                memory_size,
            } => write!(
                f,
                "byte range [{}, {}) is outside linear memory of {} bytes",
                offset,
                offset.saturating_add(*len),
                memory_size
            ),
            Self::Internal(msg) => write!(f, "internal host error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}
