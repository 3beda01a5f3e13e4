//! The fixed import surface offered to guest modules.
//!
//! Guests may import from exactly two namespaces: `console` (numeric and
//! memory logging) and `math` (`random`). `IMPORTS` is the single source of
//! truth for names and signatures; the runner registers host functions and
//! validates module imports against it.

use std::fmt;

/// Namespace of the logging imports.
pub const CONSOLE_MODULE: &str = "console";

/// Namespace of the random source.
pub const MATH_MODULE: &str = "math";

/// Export name a module must give its linear memory to use `log_mem_as_*`.
pub const MEMORY_EXPORT: &str = "mem";

/// Guidance line emitted when a memory import is used without a `mem` export.
pub const MEMORY_EXPORT_GUIDANCE: &str = "log_mem_* functions requires a module to export its memory with name \"mem\". Example: \n (memory (export \"mem\") 1)";

/// A WebAssembly number type crossing the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        };
        f.write_str(s)
    }
}

/// One host function in the import table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFunc {
    pub module: &'static str,
    pub name: &'static str,
    pub params: &'static [ScalarType],
    pub results: &'static [ScalarType],
}

impl ImportFunc {
    const fn console(name: &'static str, params: &'static [ScalarType]) -> Self {
        Self {
            module: CONSOLE_MODULE,
            name,
            params,
            results: &[],
        }
    }

    /// Render the signature as `(param i32 i32) (result f64)`.
    pub fn signature(&self) -> String {
        render_signature(self.params, self.results)
    }
}

/// Render a parameter/result list the way the text format spells it.
pub fn render_signature(params: &[ScalarType], results: &[ScalarType]) -> String {
    let join = |types: &[ScalarType]| {
        types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let mut out = String::new();
    if !params.is_empty() {
        out.push_str(&format!("(param {})", join(params)));
    }
    if !results.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("(result {})", join(results)));
    }
    if out.is_empty() {
        out.push_str("()");
    }
    out
}

const MEM_RANGE: &[ScalarType] = &[ScalarType::I32, ScalarType::I32];

/// Every function a guest may import.
pub const IMPORTS: &[ImportFunc] = &[
    ImportFunc::console("log_i32_s", &[ScalarType::I32]),
    ImportFunc::console("log_i32_u", &[ScalarType::I32]),
    ImportFunc::console("log_i64_s", &[ScalarType::I64]),
    ImportFunc::console("log_i64_u", &[ScalarType::I64]),
    ImportFunc::console("log_f32", &[ScalarType::F32]),
    ImportFunc::console("log_f64", &[ScalarType::F64]),
    ImportFunc::console("log_mem_as_utf8", MEM_RANGE),
    ImportFunc::console("log_mem_as_i8", MEM_RANGE),
    ImportFunc::console("log_mem_as_u8", MEM_RANGE),
    ImportFunc::console("log_mem_as_i16", MEM_RANGE),
    ImportFunc::console("log_mem_as_u16", MEM_RANGE),
    ImportFunc::console("log_mem_as_i32", MEM_RANGE),
    ImportFunc::console("log_mem_as_u32", MEM_RANGE),
    ImportFunc::console("log_mem_as_i64", MEM_RANGE),
    ImportFunc::console("log_mem_as_u64", MEM_RANGE),
    ImportFunc::console("log_mem_as_f32", MEM_RANGE),
    ImportFunc::console("log_mem_as_f64", MEM_RANGE),
    ImportFunc {
        module: MATH_MODULE,
        name: "random",
        params: &[],
        results: &[ScalarType::F64],
    },
];

/// Look up an import by namespace and name.
pub fn find_import(module: &str, name: &str) -> Option<&'static ImportFunc> {
    IMPORTS
        .iter()
        .find(|import| import.module == module && import.name == name)
}
