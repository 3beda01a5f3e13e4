//! Feature flags and runner configuration.
//!
//! `FeatureConfig` is the full set of language-feature flags a module is
//! compiled and run with. `FeatureOverrides` names only the flags a caller
//! wants to change; merging replaces the default flag by flag.

use serde::Deserialize;
use wasmparser::WasmFeatures;

use crate::error::CompileError;

macro_rules! feature_flags {
    ($($(#[$doc:meta])* $name:ident = $default:expr),* $(,)?) => {
        /// Language features enabled when compiling and running a module.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct FeatureConfig {
            $($(#[$doc])* pub $name: bool,)*
        }

        impl Default for FeatureConfig {
            fn default() -> Self {
                Self {
                    $($name: $default,)*
                }
            }
        }

        /// Flags to change relative to `FeatureConfig::default()`.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct FeatureOverrides {
            $(#[serde(default)] pub $name: Option<bool>,)*
        }

        /// Every flag name, in declaration order.
        pub const FEATURE_NAMES: &[&str] = &[$(stringify!($name)),*];

        impl FeatureConfig {
            /// Apply `overrides` on top of this configuration.
            pub fn merged(&self, overrides: &FeatureOverrides) -> Self {
                Self {
                    $($name: overrides.$name.unwrap_or(self.$name),)*
                }
            }

            /// Look up a flag by name.
            pub fn get(&self, name: &str) -> Option<bool> {
                match canonical_name(name).as_str() {
                    $(stringify!($name) => Some(self.$name),)*
                    _ => None,
                }
            }
        }

        impl FeatureOverrides {
            /// Override one flag by name.
            ///
            /// Names may use `-` or `_` as separator.
            pub fn set(&mut self, name: &str, enabled: bool) -> Result<&mut Self, CompileError> {
                match canonical_name(name).as_str() {
                    $(stringify!($name) => self.$name = Some(enabled),)*
                    _ => return Err(CompileError::UnknownFeature(name.to_string())),
                }
                Ok(self)
            }

            /// Returns true if no flag is overridden.
            pub fn is_empty(&self) -> bool {
                true $(&& self.$name.is_none())*
            }
        }
    };
}

feature_flags! {
    /// Exception handling (`try`, `throw`, tags).
    exceptions = true,
    /// Importing and exporting mutable globals.
    mutable_globals = true,
    /// Non-trapping float-to-int conversions.
    sat_float_to_int = true,
    /// Sign-extension operators.
    sign_extension = true,
    /// 128-bit SIMD.
    simd = true,
    /// Shared memories and atomics.
    threads = false,
    /// Typed function references.
    function_references = true,
    /// Multiple results and block parameters.
    multi_value = true,
    /// Bulk memory operations (`memory.copy`, `memory.init`, ...).
    bulk_memory = true,
    /// `funcref`/`externref` values and multiple tables.
    reference_types = true,
    /// Custom annotations in module text.
    annotations = true,
    /// Code metadata custom sections.
    code_metadata = true,
    /// Garbage-collected types.
    gc = false,
    /// 64-bit memory addressing.
    memory64 = false,
}

fn canonical_name(name: &str) -> String {
    let name = name.trim().replace('-', "_");
    match name.as_str() {
        "mutable_global" => "mutable_globals".to_string(),
        "saturating_float_to_int" => "sat_float_to_int".to_string(),
        "typed_function_references" => "function_references".to_string(),
        _ => name,
    }
}

impl FeatureOverrides {
    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: &str, enabled: bool) -> Result<Self, CompileError> {
        self.set(name, enabled)?;
        Ok(self)
    }

    /// Collect `(name, enabled)` pairs, rejecting unknown names.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut overrides = Self::default();
        for (name, enabled) in pairs {
            overrides.set(name, enabled)?;
        }
        Ok(overrides)
    }
}

impl FeatureConfig {
    /// Validator feature set for these flags.
    ///
    /// `annotations` and `code_metadata` only affect module text and have no
    /// validator counterpart. Proposals not named here keep the validator's
    /// defaults.
    pub fn to_wasm_features(&self) -> WasmFeatures {
        let mut features = WasmFeatures::default();
        features.set(WasmFeatures::EXCEPTIONS, self.exceptions);
        features.set(WasmFeatures::MUTABLE_GLOBAL, self.mutable_globals);
        features.set(WasmFeatures::SATURATING_FLOAT_TO_INT, self.sat_float_to_int);
        features.set(WasmFeatures::SIGN_EXTENSION, self.sign_extension);
        features.set(WasmFeatures::SIMD, self.simd);
        if !self.simd {
            features.remove(WasmFeatures::RELAXED_SIMD);
        }
        features.set(WasmFeatures::THREADS, self.threads);
        features.set(WasmFeatures::FUNCTION_REFERENCES, self.function_references);
        features.set(WasmFeatures::MULTI_VALUE, self.multi_value);
        features.set(WasmFeatures::BULK_MEMORY, self.bulk_memory);
        features.set(WasmFeatures::REFERENCE_TYPES, self.reference_types);
        features.set(WasmFeatures::GC, self.gc);
        features.set(WasmFeatures::MEMORY64, self.memory64);
        features
    }

    /// Enable the matching Wasmtime proposals.
    ///
    /// Wasmtime always accepts mutable globals, saturating conversions and
    /// sign extension; exception handling is not available in this engine
    /// release and is enforced by the compiler's validator only.
    ///
    /// Wasmtime refuses a proposal whose prerequisite is off, so each of
    /// `reference_types`, `function_references` and `gc` is only enabled
    /// when the one before it is.
    pub fn apply_to(&self, config: &mut wasmtime::Config) {
        let reference_types = self.reference_types && self.bulk_memory;
        let function_references = self.function_references && reference_types;
        let gc = self.gc && function_references;

        config.wasm_threads(self.threads);
        config.wasm_simd(self.simd);
        config.wasm_relaxed_simd(false);
        config.wasm_multi_value(self.multi_value);
        config.wasm_bulk_memory(self.bulk_memory);
        config.wasm_reference_types(reference_types);
        config.wasm_function_references(function_references);
        config.wasm_gc(gc);
        config.wasm_memory64(self.memory64);
    }
}

/// Configuration for instantiating modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Language features the engine accepts.
    pub features: FeatureConfig,

    /// Seed for `math.random`. `None` seeds from OS entropy per instance.
    pub random_seed: Option<u64>,

    /// Also emit every guest log line as a `tracing` event
    /// (target `wasmbridge::guest`).
    pub echo_to_tracing: bool,
}
