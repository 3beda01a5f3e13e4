//! `wasmbridge-runner`: Wasmtime-based runner for the wasmbridge host imports.
//!
//! This crate compiles WebAssembly text into a validated binary module and
//! instantiates it against a fixed import table:
//!
//! - **`console`:** numeric logging with exact signed/unsigned/width semantics
//!   and typed inspection of the `mem` export
//! - **`math`:** `random`, uniform in `[0, 1)`
//!
//! Every log call writes one line to a [`LogSink`](wasmbridge_hostapi::LogSink)
//! before returning to the guest.
//!
//! Typical use:
//!
//! ```no_run
//! # async fn demo() -> Result<(), wasmbridge_runner::RunnerError> {
//! use std::sync::Arc;
//! use wasmbridge_hostapi::ConsoleSink;
//! use wasmbridge_runner::{compile, FeatureOverrides, LoadedModule, Runner};
//!
//! let binary = compile("demo.wat", "(module (func (export \"run\")))", &FeatureOverrides::default())?;
//! let module = LoadedModule::from_binary(&binary)?;
//! let mut runner = Runner::instantiate(&module, Arc::new(ConsoleSink::stdout())).await?;
//! runner.call::<(), ()>("run", ()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod compiler;
pub mod source_map;
pub mod memory;
pub mod host_impl;
pub mod validation;
pub mod linker;
pub mod runtime;

pub use error::{CompileError, RunnerError};
pub use config::{FeatureConfig, FeatureOverrides, RunnerConfig};
pub use compiler::{compile, compile_file, BinaryModule, ErrorSite, SourceLocation};
pub use source_map::FieldKind;
pub use runtime::{default_engine, ExportKind, LoadedModule, Runner};
