//! `wasmbridge-hostapi`: host API definitions for the wasmbridge runner.
//!
//! This crate defines the engine-independent half of the host-import bridge.
//! It provides:
//!
//! - `HostApi` trait: one method per function imported by the guest
//! - `LogSink` trait: the output channel every `console.log_*` line goes to
//! - `ConsoleSink` / `MemSink`: stdout/stderr and capturing sinks
//! - `numeric`: fixed-width signed/unsigned reinterpretation and formatting
//! - `MemoryView`: zero-copy typed windows over linear memory bytes
//! - `IMPORTS`: the fixed `console`/`math` import table
//! - `HostError`: host-side error type
//!
//! Nothing here depends on a particular WebAssembly engine; the runner crate
//! wires these pieces into Wasmtime.

pub mod error;
pub mod types;
pub mod numeric;
pub mod view;
pub mod sink;
pub mod mem_sink;
pub mod traits;

// Re-export commonly used types at the crate root.
pub use error::HostError;
pub use types::{
    find_import, ImportFunc, ScalarType, CONSOLE_MODULE, IMPORTS, MATH_MODULE, MEMORY_EXPORT,
    MEMORY_EXPORT_GUIDANCE,
};
pub use view::{Element, MemoryView, Utf8Write};
pub use sink::{ConsoleSink, LogSink, Stream};
pub use mem_sink::MemSink;
pub use traits::HostApi;
