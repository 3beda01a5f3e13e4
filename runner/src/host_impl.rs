//! Per-instance host state held in the Wasmtime Store.
//!
//! `HostState` owns the log sink and the random source for one instance.
//! Every `console.*` import formats through the `HostApi` defaults and lands
//! here in `emit`.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use wasmbridge_hostapi::{HostApi, LogSink};

use crate::config::RunnerConfig;

/// Per-instance mutable state held in the Wasmtime `Store`.
pub struct HostState {
    /// Where guest log lines go.
    sink: Arc<dyn LogSink>,
    /// Source for `math.random`.
    rng: StdRng,
    /// Mirror guest lines into `tracing`.
    echo_to_tracing: bool,
}

impl HostState {
    pub fn new(sink: Arc<dyn LogSink>, config: &RunnerConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            sink,
            rng,
            echo_to_tracing: config.echo_to_tracing,
        }
    }
}

impl fmt::Debug for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostState")
            .field("echo_to_tracing", &self.echo_to_tracing)
            .finish_non_exhaustive()
    }
}

impl HostApi for HostState {
    fn emit(&self, line: &str) {
        if self.echo_to_tracing {
            info!(target: "wasmbridge::guest", "{line}");
        }
        self.sink.write_line(line);
    }

    fn random(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
