//! Host function registration via Wasmtime linker.
//!
//! Registers every entry of `IMPORTS` with the Wasmtime `Linker`:
//! the six numeric `console.log_*` functions, the eleven
//! `console.log_mem_as_*` views and `math.random`.
//!
//! Numeric imports never fail. Memory imports look up the `mem` export on
//! each call; a missing export or an out-of-range view fails the call, which
//! traps the guest with the `HostError` attached.

use tracing::trace;
use wasmtime::{Caller, Linker};

use wasmbridge_hostapi::numeric::as_unsigned_32;
use wasmbridge_hostapi::{Element, HostApi, CONSOLE_MODULE, MATH_MODULE};

use crate::error::RunnerError;
use crate::host_impl::HostState;
use crate::memory::memory_and_state;

/// Register all `console` and `math` functions with the linker.
pub fn register_host_functions(linker: &mut Linker<HostState>) -> Result<(), RunnerError> {
    register_numeric(linker)?;
    register_log_mem_as_utf8(linker)?;
    register_log_mem::<i8>(linker)?;
    register_log_mem::<u8>(linker)?;
    register_log_mem::<i16>(linker)?;
    register_log_mem::<u16>(linker)?;
    register_log_mem::<i32>(linker)?;
    register_log_mem::<u32>(linker)?;
    register_log_mem::<i64>(linker)?;
    register_log_mem::<u64>(linker)?;
    register_log_mem::<f32>(linker)?;
    register_log_mem::<f64>(linker)?;
    register_random(linker)?;
    Ok(())
}

// ── Numeric logging ──

fn register_numeric(linker: &mut Linker<HostState>) -> Result<(), RunnerError> {
    linker.func_wrap(
        CONSOLE_MODULE,
        "log_i32_s",
        |caller: Caller<'_, HostState>, value: i32| {
            trace!(value, "console.log_i32_s");
            caller.data().log_i32_s(value);
        },
    )?;
    linker.func_wrap(
        CONSOLE_MODULE,
        "log_i32_u",
        |caller: Caller<'_, HostState>, value: i32| {
            trace!(value, "console.log_i32_u");
            caller.data().log_i32_u(value);
        },
    )?;
    linker.func_wrap(
        CONSOLE_MODULE,
        "log_i64_s",
        |caller: Caller<'_, HostState>, value: i64| {
            trace!(value, "console.log_i64_s");
            caller.data().log_i64_s(value);
        },
    )?;
    linker.func_wrap(
        CONSOLE_MODULE,
        "log_i64_u",
        |caller: Caller<'_, HostState>, value: i64| {
            trace!(value, "console.log_i64_u");
            caller.data().log_i64_u(value);
        },
    )?;
    linker.func_wrap(
        CONSOLE_MODULE,
        "log_f32",
        |caller: Caller<'_, HostState>, value: f32| {
            trace!(value, "console.log_f32");
            caller.data().log_f32(value);
        },
    )?;
    linker.func_wrap(
        CONSOLE_MODULE,
        "log_f64",
        |caller: Caller<'_, HostState>, value: f64| {
            trace!(value, "console.log_f64");
            caller.data().log_f64(value);
        },
    )?;
    Ok(())
}

// ── Memory views ──

fn register_log_mem_as_utf8(linker: &mut Linker<HostState>) -> Result<(), RunnerError> {
    linker.func_wrap(
        CONSOLE_MODULE,
        "log_mem_as_utf8",
        |mut caller: Caller<'_, HostState>, byte_offset: i32, length: i32| -> anyhow::Result<()> {
            let (byte_offset, length) = (as_unsigned_32(byte_offset), as_unsigned_32(length));
            trace!(byte_offset, length, "console.log_mem_as_utf8");
            let (memory, state) = memory_and_state(&mut caller);
            state.log_mem_as_utf8(memory, byte_offset, length)?;
            Ok(())
        },
    )?;
    Ok(())
}

/// Register `console.log_mem_as_{T}`.
///
/// Offsets and lengths arrive as `i32` and are read as unsigned, so the
/// whole 4 GiB address space is reachable.
fn register_log_mem<T: Element>(linker: &mut Linker<HostState>) -> Result<(), RunnerError> {
    let name = format!("log_mem_as_{}", T::NAME);
    linker.func_wrap(
        CONSOLE_MODULE,
        &name,
        |mut caller: Caller<'_, HostState>, byte_offset: i32, length: i32| -> anyhow::Result<()> {
            let (byte_offset, length) = (as_unsigned_32(byte_offset), as_unsigned_32(length));
            trace!(element = T::NAME, byte_offset, length, "console.log_mem_as");
            let (memory, state) = memory_and_state(&mut caller);
            state.log_mem_as::<T>(memory, byte_offset, length)?;
            Ok(())
        },
    )?;
    Ok(())
}

// ── Random ──

fn register_random(linker: &mut Linker<HostState>) -> Result<(), RunnerError> {
    linker.func_wrap(
        MATH_MODULE,
        "random",
        |mut caller: Caller<'_, HostState>| -> f64 { caller.data_mut().random() },
    )?;
    Ok(())
}
