//! Runner runtime: Wasmtime engine, module loading, and instantiation.
//!
//! `LoadedModule` holds a module compiled to native code together with the
//! linker carrying every host import; it is instantiated many times.
//! `Runner` is one live instance: its `Store`, its exports and its `mem`
//! export, plus the host-side helpers for reading and seeding that memory.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};
use wasmtime::{
    Config, Engine, ExternType, Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams,
    WasmResults,
};

use wasmbridge_hostapi::view::{read_utf8, write_elements};
use wasmbridge_hostapi::{Element, HostApi, LogSink, MemoryView, Utf8Write};

use crate::compiler::{compile, BinaryModule};
use crate::config::{FeatureConfig, FeatureOverrides, RunnerConfig};
use crate::error::RunnerError;
use crate::host_impl::HostState;
use crate::linker::register_host_functions;
use crate::memory::{byte_size, instance_memory, page_count};
use crate::validation::{exports_memory, imports_memory_views, validate_imports};

static DEFAULT_ENGINE: OnceLock<Engine> = OnceLock::new();

/// Create an async-enabled Wasmtime engine for `features`.
pub fn create_engine(features: &FeatureConfig) -> Result<Engine, RunnerError> {
    let mut wasm_config = Config::new();

    // `instantiate_async` and `call_async` need this.
    wasm_config.async_support(true);
    features.apply_to(&mut wasm_config);

    debug!(?features, "creating engine");
    Ok(Engine::new(&wasm_config)?)
}

/// The shared engine for the default feature set, created on first use.
pub fn default_engine() -> Result<Engine, RunnerError> {
    if let Some(engine) = DEFAULT_ENGINE.get() {
        return Ok(engine.clone());
    }
    let engine = create_engine(&FeatureConfig::default())?;
    Ok(DEFAULT_ENGINE.get_or_init(|| engine).clone())
}

/// What an export is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Func,
    Memory,
    Global,
    Table,
    Other,
}

impl ExportKind {
    #[allow(unreachable_patterns)]
    fn of(ty: &ExternType) -> Self {
        match ty {
            ExternType::Func(_) => Self::Func,
            ExternType::Memory(_) => Self::Memory,
            ExternType::Global(_) => Self::Global,
            ExternType::Table(_) => Self::Table,
            _ => Self::Other,
        }
    }
}

fn export_table(module: &Module) -> BTreeMap<String, ExportKind> {
    module
        .exports()
        .map(|e| (e.name().to_string(), ExportKind::of(&e.ty())))
        .collect()
}

/// A module compiled to native code, ready to instantiate.
///
/// Cloning is cheap: the engine, module and linker are reference counted.
#[derive(Clone)]
pub struct LoadedModule {
    name: String,
    engine: Engine,
    module: Module,
    linker: Linker<HostState>,
    config: RunnerConfig,
}

impl LoadedModule {
    /// Compile `binary` for an engine built from `config`.
    pub fn new(binary: &BinaryModule, config: &RunnerConfig) -> Result<Self, RunnerError> {
        let engine = if config.features == FeatureConfig::default() {
            default_engine()?
        } else {
            create_engine(&config.features)?
        };
        Self::with_engine(engine, binary, config.clone())
    }

    /// Compile `binary` with the features it was validated against.
    ///
    /// Modules built with the default features share one engine.
    pub fn from_binary(binary: &BinaryModule) -> Result<Self, RunnerError> {
        let config = RunnerConfig {
            features: *binary.features(),
            ..RunnerConfig::default()
        };
        Self::new(binary, &config)
    }

    /// Compile module text and load it.
    pub fn from_source(
        source_name: &str,
        source: &str,
        overrides: &FeatureOverrides,
    ) -> Result<Self, RunnerError> {
        let binary = compile(source_name, source, overrides)?;
        Self::from_binary(&binary)
    }

    fn with_engine(
        engine: Engine,
        binary: &BinaryModule,
        config: RunnerConfig,
    ) -> Result<Self, RunnerError> {
        let module = Module::new(&engine, binary.bytes())?;

        let mut linker = Linker::new(&engine);
        register_host_functions(&mut linker)?;

        debug!(module = binary.name(), "module loaded");
        Ok(Self {
            name: binary.name().to_string(),
            engine,
            module,
            linker,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Replace the runner configuration used for future instances.
    ///
    /// Feature flags are fixed at load time; only the per-instance settings
    /// (`random_seed`, `echo_to_tracing`) take effect.
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = RunnerConfig {
            features: self.config.features,
            ..config
        };
        self
    }

    /// The module's export table.
    pub fn exports(&self) -> BTreeMap<String, ExportKind> {
        export_table(&self.module)
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A live module instance.
pub struct Runner {
    store: Store<HostState>,
    instance: Instance,
    module: Module,
    memory: Option<Memory>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("host_state", self.store.data())
            .field("has_memory", &self.memory.is_some())
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Instantiate `module`, sending every guest log line to `sink`.
    ///
    /// Runs the module's start function, if any.
    pub async fn instantiate(
        module: &LoadedModule,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, RunnerError> {
        validate_imports(&module.module)?;
        if imports_memory_views(&module.module) && !exports_memory(&module.module) {
            warn!(
                module = module.name(),
                "module imports log_mem_as_* but does not export \"mem\""
            );
        }

        let host_state = HostState::new(sink, &module.config);
        let mut store = Store::new(&module.engine, host_state);

        let instance = module
            .linker
            .instantiate_async(&mut store, &module.module)
            .await
            .map_err(|e| RunnerError::Instantiation(format!("{e:#}")))?;

        let memory = instance_memory(&instance, &mut store);
        info!(
            module = module.name(),
            has_memory = memory.is_some(),
            "module instantiated"
        );

        Ok(Self {
            store,
            instance,
            module: module.module.clone(),
            memory,
        })
    }

    /// The instance's export table.
    pub fn exports(&self) -> BTreeMap<String, ExportKind> {
        export_table(&self.module)
    }

    /// Look up an exported function with a static signature.
    pub fn typed_func<P, R>(&mut self, name: &str) -> Result<TypedFunc<P, R>, RunnerError>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| RunnerError::MissingExport(name.to_string()))?;
        Ok(func.typed::<P, R>(&self.store)?)
    }

    /// Call an exported function to completion.
    pub async fn call<P, R>(&mut self, name: &str, params: P) -> Result<R, RunnerError>
    where
        P: WasmParams + Sync,
        R: WasmResults + Sync,
    {
        let func = self.typed_func::<P, R>(name)?;
        debug!(export = name, "calling guest export");
        func.call_async(&mut self.store, params)
            .await
            .map_err(RunnerError::from_trap)
    }

    /// The `mem` export, if the module has one.
    pub fn memory(&self) -> Option<Memory> {
        self.memory
    }

    pub fn has_memory(&self) -> bool {
        self.memory.is_some()
    }

    /// Current memory size in bytes, if the module exports `mem`.
    pub fn memory_size(&self) -> Option<usize> {
        self.memory.map(|memory| byte_size(&memory, &self.store))
    }

    /// Grow `mem` by `pages`, returning the previous size in pages.
    pub fn grow_memory(&mut self, pages: u64) -> Result<u64, RunnerError> {
        let memory = self
            .memory
            .ok_or_else(|| RunnerError::MemoryError("module does not export \"mem\"".into()))?;
        let before = page_count(&memory, &self.store);
        memory
            .grow(&mut self.store, pages)
            .map_err(|e| RunnerError::MemoryError(format!("grow by {pages} pages from {before}: {e}")))
    }

    fn memory_bytes(&self) -> Option<&[u8]> {
        self.memory.map(|memory| memory.data(&self.store))
    }

    /// A typed view of `length` elements at `byte_offset`.
    ///
    /// The view borrows the runner, so it must be dropped before anything
    /// that could grow memory.
    pub fn view<T: Element>(
        &self,
        byte_offset: u32,
        length: u32,
    ) -> Result<MemoryView<'_, T>, RunnerError> {
        let data = self.store.data().require_memory(self.memory_bytes())?;
        Ok(MemoryView::new(data, byte_offset, length)?)
    }

    /// Copy `length` elements at `byte_offset` out of memory.
    pub fn get_mem_as<T: Element>(
        &self,
        byte_offset: u32,
        length: u32,
    ) -> Result<Vec<T>, RunnerError> {
        Ok(self.view::<T>(byte_offset, length)?.to_vec())
    }

    /// Decode `length` bytes at `byte_offset` as UTF-8.
    pub fn get_mem_as_utf8(&self, byte_offset: u32, length: u32) -> Result<String, RunnerError> {
        let data = self.store.data().require_memory(self.memory_bytes())?;
        Ok(read_utf8(data, byte_offset, length)?.into_owned())
    }

    /// Log a typed view to the sink, as `console.log_mem_as_{T}` would.
    pub fn log_mem<T: Element>(&self, byte_offset: u32, length: u32) -> Result<(), RunnerError> {
        let memory = self.memory_bytes();
        Ok(self.store.data().log_mem_as::<T>(memory, byte_offset, length)?)
    }

    /// Log text to the sink, as `console.log_mem_as_utf8` would.
    pub fn log_mem_as_utf8(&self, byte_offset: u32, length: u32) -> Result<(), RunnerError> {
        let memory = self.memory_bytes();
        Ok(self
            .store
            .data()
            .log_mem_as_utf8(memory, byte_offset, length)?)
    }

    /// Write `text` into the `buffer_len`-byte buffer at `byte_offset`.
    ///
    /// Text that does not fit is truncated on a character boundary and a
    /// warning line goes to the sink.
    pub fn set_mem_as_utf8(
        &mut self,
        byte_offset: u32,
        buffer_len: u32,
        text: &str,
    ) -> Result<Utf8Write, RunnerError> {
        let written = match self.memory {
            Some(memory) => {
                let (data, state) = memory.data_and_store_mut(&mut self.store);
                state.set_mem_as_utf8(Some(data), byte_offset, buffer_len, text)?
            }
            None => self
                .store
                .data()
                .set_mem_as_utf8(None, byte_offset, buffer_len, text)?,
        };
        debug!(
            byte_offset,
            bytes_written = written.bytes_written,
            "seeded guest memory with text"
        );
        Ok(written)
    }

    /// Write `values` little-endian starting at `byte_offset`.
    pub fn set_mem_as<T: Element>(
        &mut self,
        byte_offset: u32,
        values: &[T],
    ) -> Result<(), RunnerError> {
        let memory = match self.memory {
            Some(memory) => memory,
            None => return Err(self.store.data().memory_export_missing().into()),
        };
        write_elements(memory.data_mut(&mut self.store), byte_offset, values)?;
        Ok(())
    }
}
