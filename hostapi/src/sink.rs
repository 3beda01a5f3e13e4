//! Output channel for guest-visible log lines.
//!
//! Every `console.log_*` call writes exactly one line through a `LogSink`,
//! synchronously, before the host function returns. Diagnostics aimed at the
//! module author (missing memory export, truncated writes) use the same
//! channel so they show up next to the guest's own output.
//!
//! Implementations:
//! - `ConsoleSink` (this module): stdout or stderr of the host process
//! - `MemSink`: captures lines in memory for tests

use std::io::Write;

/// Destination for log lines.
pub trait LogSink: Send + Sync {
    /// Write one line. `line` carries no trailing newline.
    fn write_line(&self, line: &str);
}

/// Which standard stream a `ConsoleSink` writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stream {
    #[default]
    Stdout,
    Stderr,
}

/// Writes each line to a standard stream of the host process, unbuffered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    stream: Stream,
}

impl ConsoleSink {
    /// Sink writing to stdout.
    pub fn stdout() -> Self {
        Self {
            stream: Stream::Stdout,
        }
    }

    /// Sink writing to stderr.
    pub fn stderr() -> Self {
        Self {
            stream: Stream::Stderr,
        }
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }
}

impl LogSink for ConsoleSink {
    fn write_line(&self, line: &str) {
        // A closed stream must not take the guest down with it.
        let _ = match self.stream {
            Stream::Stdout => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{line}").and_then(|()| out.flush())
            }
            Stream::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
        };
    }
}
