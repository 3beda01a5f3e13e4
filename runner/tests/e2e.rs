//! End-to-end tests for the full bridge:
//! module text → compiler → Wasmtime instance → host imports → sink lines.

mod common;

use std::sync::Arc;

use wasmbridge_hostapi::{HostError, MemSink, IMPORTS, MEMORY_EXPORT_GUIDANCE};
use wasmbridge_runner::{ExportKind, LoadedModule, Runner, RunnerConfig, RunnerError};

use common::*;

// ── Every import ──

#[tokio::test]
async fn test_log_all_fixture() {
    let (sink, mut runner) = instantiate(&load_fixture("log-all.wat")).await;
    let status: i32 = runner.call("logAll", ()).await.unwrap();
    assert_eq!(status, 0);
    assert_eq!(sink.lines(), LOG_ALL_EXPECTED);
}

#[tokio::test]
async fn test_log_all_fixture_exports() {
    let (_, runner) = instantiate(&load_fixture("log-all.wat")).await;
    let exports = runner.exports();
    assert_eq!(exports.get("mem"), Some(&ExportKind::Memory));
    for name in ["logAll", "random", "randomPair"] {
        assert_eq!(exports.get(name), Some(&ExportKind::Func), "{name}");
    }
    assert_eq!(LOG_ALL_EXPECTED.len(), IMPORTS.len() - 1);
}

// ── Numeric imports ──

#[tokio::test]
async fn test_log_i32_u_minus_one_is_one_line() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_i32_u" (func $log (param i32)))
            (func (export "run") (call $log (i32.const -1))))"#,
    )
    .await;
    runner.call::<(), ()>("run", ()).await.unwrap();
    assert_eq!(sink.lines(), vec!["4294967295"]);
}

#[tokio::test]
async fn test_lines_written_before_import_returns() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_i64_s" (func $log (param i64)))
            (func (export "run") (call $log (i64.const 1)) unreachable))"#,
    )
    .await;
    let err = runner.call::<(), ()>("run", ()).await.unwrap_err();
    assert!(matches!(err, RunnerError::GuestTrapped(_)));
    assert_eq!(sink.lines(), vec!["1"]);
}

#[tokio::test]
async fn test_float_special_values() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_f64" (func $log (param f64)))
            (import "console" "log_f32" (func $log32 (param f32)))
            (func (export "run")
                (call $log (f64.const nan))
                (call $log (f64.const inf))
                (call $log (f64.const -inf))
                (call $log (f64.const -0))
                (call $log (f64.const 0.1))
                (call $log32 (f32.const 0.5))))"#,
    )
    .await;
    runner.call::<(), ()>("run", ()).await.unwrap();
    assert_eq!(
        sink.lines(),
        vec!["NaN", "Infinity", "-Infinity", "-0", "0.1", "0.5"]
    );
}

#[tokio::test]
async fn test_host_values_passed_from_rust() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_i32_s" (func $s (param i32)))
            (import "console" "log_i32_u" (func $u (param i32)))
            (func (export "both") (param i32) (call $s (local.get 0)) (call $u (local.get 0))))"#,
    )
    .await;
    runner.call::<i32, ()>("both", i32::MIN).await.unwrap();
    assert_eq!(sink.lines(), vec!["-2147483648", "2147483648"]);
}

// ── Modules without imports ──

#[tokio::test]
async fn test_module_without_imports_or_memory() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module (func (export "answer") (result i32) (i32.const 42)))"#,
    )
    .await;
    assert!(!runner.exports().is_empty());
    assert!(!runner.has_memory());
    assert_eq!(runner.call::<(), i32>("answer", ()).await.unwrap(), 42);
    assert!(sink.is_empty());
}

// ── Memory imports ──

#[tokio::test]
async fn test_guest_writes_and_logs_text() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_mem_as_utf8" (func $log (param i32 i32)))
            (memory (export "mem") 1)
            (data $greeting "Goodbye, Mars!")
            (func (export "run")
                (memory.init $greeting (i32.const 200) (i32.const 0) (i32.const 14))
                (data.drop $greeting)
                (call $log (i32.const 200) (i32.const 14))))"#,
    )
    .await;
    runner.call::<(), ()>("run", ()).await.unwrap();
    assert_eq!(sink.lines(), vec!["Goodbye, Mars!"]);
    assert_eq!(runner.get_mem_as_utf8(200, 14).unwrap(), "Goodbye, Mars!");
}

#[tokio::test]
async fn test_view_after_memory_growth() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_mem_as_i32" (func $log (param i32 i32)))
            (memory (export "mem") 1)
            (func (export "growAndLog") (result i32)
                (drop (memory.grow (i32.const 1)))
                (i32.store (i32.const 65536) (i32.const -7))
                (call $log (i32.const 65536) (i32.const 1))
                (memory.size)))"#,
    )
    .await;
    assert_eq!(runner.memory_size(), Some(65536));
    let pages: i32 = runner.call("growAndLog", ()).await.unwrap();
    assert_eq!(pages, 2);
    assert_eq!(sink.lines(), vec!["[-7]"]);
    assert_eq!(runner.get_mem_as::<i32>(65536, 1).unwrap(), vec![-7]);
}

#[tokio::test]
async fn test_missing_memory_export_emits_guidance_then_traps() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_mem_as_u8" (func $log (param i32 i32)))
            (memory 1)
            (func (export "run") (call $log (i32.const 0) (i32.const 4))))"#,
    )
    .await;
    let err = runner.call::<(), ()>("run", ()).await.unwrap_err();
    assert!(
        matches!(err, RunnerError::Host(HostError::MemoryExportMissing)),
        "{err:?}"
    );
    assert_eq!(sink.lines(), vec![MEMORY_EXPORT_GUIDANCE]);
}

#[tokio::test]
async fn test_out_of_bounds_view_traps() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_mem_as_u64" (func $log (param i32 i32)))
            (memory (export "mem") 1)
            (func (export "edge") (call $log (i32.const 65528) (i32.const 1)))
            (func (export "past") (call $log (i32.const 65530) (i32.const 1)))
            (func (export "negative") (call $log (i32.const -1) (i32.const 1))))"#,
    )
    .await;
    runner.call::<(), ()>("edge", ()).await.unwrap();
    assert_eq!(sink.take(), vec!["[0]"]);

    for name in ["past", "negative"] {
        let err = runner.call::<(), ()>(name, ()).await.unwrap_err();
        assert!(
            matches!(err, RunnerError::Host(HostError::OutOfBounds { .. })),
            "{name}: {err:?}"
        );
    }
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_unaligned_views() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_mem_as_f64" (func $log (param i32 i32)))
            (memory (export "mem") 1)
            (func (export "run")
                (f64.store offset=3 (i32.const 0) (f64.const 2.5))
                (call $log (i32.const 3) (i32.const 1))))"#,
    )
    .await;
    runner.call::<(), ()>("run", ()).await.unwrap();
    assert_eq!(sink.lines(), vec!["[2.5]"]);
}

// ── Seeding memory from the host ──

#[tokio::test]
async fn test_seed_text_then_guest_logs_it() {
    let (sink, mut runner) = instantiate_wat(
        r#"(module
            (import "console" "log_mem_as_utf8" (func $log (param i32 i32)))
            (memory (export "mem") 1)
            (func (export "logAt") (param i32 i32) (call $log (local.get 0) (local.get 1))))"#,
    )
    .await;
    let written = runner.set_mem_as_utf8(32, 64, "Hello, Jüpiter!").unwrap();
    assert!(!written.is_truncated());
    assert_eq!(written.chars_written, 15);
    assert_eq!(written.bytes_written, 16);
    assert!(sink.is_empty());

    runner
        .call::<(i32, i32), ()>("logAt", (32, written.bytes_written as i32))
        .await
        .unwrap();
    assert_eq!(sink.lines(), vec!["Hello, Jüpiter!"]);
}

#[tokio::test]
async fn test_seed_text_truncated() {
    let (sink, mut runner) = instantiate_wat(r#"(module (memory (export "mem") 1))"#).await;
    let written = runner.set_mem_as_utf8(0, 8, "Goodbye, Mars!").unwrap();
    assert!(written.is_truncated());
    assert_eq!(written.chars_written, 8);
    assert_eq!(
        sink.take(),
        vec!["Warning: Buffer of size 8 was not large enough to write string of size 14. Truncated after 8 characters"]
    );
    assert_eq!(runner.get_mem_as_utf8(0, 8).unwrap(), "Goodbye,");
}

#[tokio::test]
async fn test_seed_text_without_memory() {
    let (sink, mut runner) = instantiate_wat("(module)").await;
    let err = runner.set_mem_as_utf8(0, 8, "hi").unwrap_err();
    assert!(matches!(err, RunnerError::Host(HostError::MemoryExportMissing)));
    assert_eq!(sink.lines(), vec![MEMORY_EXPORT_GUIDANCE]);
}

// ── Instantiation ──

#[tokio::test]
async fn test_instantiation_rejects_mistyped_import() {
    let module = load_wat(r#"(module (import "console" "log_f64" (func (param f32))))"#);
    let err = Runner::instantiate(&module, Arc::new(MemSink::new()))
        .await
        .unwrap_err();
    match err {
        RunnerError::Instantiation(msg) => {
            assert_eq!(
                msg,
                "import console.log_f64 has type (param f32) but the host provides (param f64)"
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_instantiation_rejects_unknown_namespace() {
    let module = load_wat(r#"(module (import "env" "print" (func (param i32))))"#);
    let result = Runner::instantiate(&module, Arc::new(MemSink::new())).await;
    assert!(matches!(result, Err(RunnerError::Instantiation(_))));
}

#[tokio::test]
async fn test_start_function_logs_during_instantiation() {
    let (sink, _runner) = instantiate_wat(
        r#"(module
            (import "console" "log_i32_s" (func $log (param i32)))
            (func $start (call $log (i32.const 7)))
            (start $start))"#,
    )
    .await;
    assert_eq!(sink.lines(), vec!["7"]);
}

#[tokio::test]
async fn test_instances_do_not_share_memory() {
    let module = load_wat(r#"(module (memory (export "mem") 1))"#);
    let (_, mut first) = instantiate(&module).await;
    let (_, second) = instantiate(&module).await;
    first.set_mem_as::<u32>(0, &[0xdead_beef]).unwrap();
    assert_eq!(first.get_mem_as::<u32>(0, 1).unwrap(), vec![0xdead_beef]);
    assert_eq!(second.get_mem_as::<u32>(0, 1).unwrap(), vec![0]);
}

#[tokio::test]
async fn test_echo_to_tracing_keeps_sink_output() {
    init_tracing();
    let module = load_wat(
        r#"(module
            (import "console" "log_i32_s" (func $log (param i32)))
            (func (export "run") (call $log (i32.const 3))))"#,
    )
    .with_config(RunnerConfig {
        echo_to_tracing: true,
        ..RunnerConfig::default()
    });
    let sink = Arc::new(MemSink::new());
    let mut runner = Runner::instantiate(&module, sink.clone()).await.unwrap();
    runner.call::<(), ()>("run", ()).await.unwrap();
    assert_eq!(sink.lines(), vec!["3"]);
}

#[tokio::test]
async fn test_loaded_module_is_reusable() {
    let module: LoadedModule = load_fixture("log-all.wat");
    for _ in 0..3 {
        let (sink, mut runner) = instantiate(&module).await;
        runner.call::<(), i32>("logAll", ()).await.unwrap();
        assert_eq!(sink.len(), LOG_ALL_EXPECTED.len());
    }
}
