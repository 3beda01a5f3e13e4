//! Access to the guest's `mem` export.
//!
//! Host functions never cache memory bytes: every call looks the export up
//! again and borrows the current slice, so growth between calls is always
//! observed.

use wasmtime::{AsContext, AsContextMut, Caller, Instance, Memory};

use wasmbridge_hostapi::MEMORY_EXPORT;

use crate::host_impl::HostState;

/// Get the guest's `mem` export from a Caller.
pub fn get_memory(caller: &mut Caller<'_, HostState>) -> Option<Memory> {
    caller.get_export(MEMORY_EXPORT).and_then(|e| e.into_memory())
}

/// Current memory bytes (if exported) alongside the host state.
pub fn memory_and_state<'a>(
    caller: &'a mut Caller<'_, HostState>,
) -> (Option<&'a [u8]>, &'a mut HostState) {
    match get_memory(caller) {
        Some(memory) => {
            let (data, state) = memory.data_and_store_mut(caller);
            (Some(&*data), state)
        }
        None => (None, caller.data_mut()),
    }
}

/// Look up the `mem` export on an instance.
pub fn instance_memory(instance: &Instance, store: impl AsContextMut) -> Option<Memory> {
    instance.get_memory(store, MEMORY_EXPORT)
}

/// Memory size in bytes.
pub fn byte_size(memory: &Memory, store: impl AsContext) -> usize {
    memory.data_size(store)
}

/// Memory size in 64 KiB pages.
pub fn page_count(memory: &Memory, store: impl AsContext) -> u64 {
    memory.size(store)
}
