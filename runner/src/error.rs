//! Runner error types.

use std::path::PathBuf;

use wasmbridge_hostapi::HostError;

use crate::compiler::ErrorSite;

/// Failure to turn module text into a validated binary.
///
/// These are fixture defects, not runtime conditions: callers are expected
/// to abort rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The text does not parse. The message carries `path:line:column` and a
    /// snippet of the offending source.
    #[error("parse error: {0}")]
    Parse(String),

    /// The module parses but fails validation.
    #[error("validation error at {site}: {message}")]
    Validation { message: String, site: ErrorSite },

    /// A feature override names a flag that does not exist.
    #[error("unknown feature flag: {0}")]
    UnknownFeature(String),

    /// The source file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type for the runner crate.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Module text failed to compile.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Wasmtime engine or native compilation error.
    #[error("wasmtime error: {0:#}")]
    Wasmtime(#[from] anyhow::Error),

    /// Import linkage failed or the start function trapped.
    #[error("instantiation failed: {0}")]
    Instantiation(String),

    /// No export with this name, or it is not a function.
    #[error("missing export: {0}")]
    MissingExport(String),

    /// A guest export trapped.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),

    /// A host function failed (and trapped the guest, if one was running).
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Host-side access to the instance memory failed.
    #[error("memory error: {0}")]
    MemoryError(String),
}

impl RunnerError {
    /// Classify an error returned from a guest call.
    ///
    /// A host function failure keeps its `HostError`; anything else is a trap.
    pub fn from_trap(err: anyhow::Error) -> Self {
        match err.downcast_ref::<HostError>() {
            Some(host) => Self::Host(host.clone()),
            None => Self::GuestTrapped(format!("{err:#}")),
        }
    }
}
