//! Shared test helpers for integration tests.
//!
//! Provides fixture loading, capturing sinks and instance factories used
//! across all integration test files.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wasmbridge_hostapi::MemSink;
use wasmbridge_runner::{FeatureOverrides, LoadedModule, Runner, RunnerConfig};

/// Fixture directory (relative to the runner crate manifest dir).
const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Lines `logAll` in `log-all.wat` writes, in order.
pub const LOG_ALL_EXPECTED: &[&str] = &[
    "-1",
    "4294967295",
    "99",
    "18446744073709551615",
    "3.140000104904175",
    "3.14",
    "Goodbye, Mars!",
    "[-1, -2, 127]",
    "[255, 254, 127]",
    "[-1, 1]",
    "[65535, 1]",
    "[-1, 42]",
    "[4294967295, 42]",
    "[-1, 99]",
    "[18446744073709551615, 99]",
    "[3.140000104904175]",
    "[3.14]",
];

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(FIXTURES).join(name)
}

/// Compile and load a fixture with the default features.
pub fn load_fixture(name: &str) -> LoadedModule {
    let binary = wasmbridge_runner::compile_file(fixture_path(name), &FeatureOverrides::default())
        .unwrap_or_else(|e| panic!("fixture {name} failed to compile: {e}"));
    LoadedModule::from_binary(&binary).unwrap()
}

/// Compile and load inline module text with the default features.
pub fn load_wat(source: &str) -> LoadedModule {
    LoadedModule::from_source("inline.wat", source, &FeatureOverrides::default())
        .unwrap_or_else(|e| panic!("inline module failed to load: {e}"))
}

/// Instantiate with a fresh capturing sink.
pub async fn instantiate(module: &LoadedModule) -> (Arc<MemSink>, Runner) {
    init_tracing();
    let sink = Arc::new(MemSink::new());
    let runner = Runner::instantiate(module, sink.clone()).await.unwrap();
    (sink, runner)
}

pub async fn instantiate_wat(source: &str) -> (Arc<MemSink>, Runner) {
    instantiate(&load_wat(source)).await
}

/// A module whose `random` export forwards `math.random`.
pub fn random_module(seed: Option<u64>) -> LoadedModule {
    load_fixture("log-all.wat").with_config(RunnerConfig {
        random_seed: seed,
        ..RunnerConfig::default()
    })
}
