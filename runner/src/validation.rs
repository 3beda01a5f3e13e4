//! Import checks run before instantiation.
//!
//! Wasmtime's own link errors only say that an import is missing or has the
//! wrong type. Checking the module against `IMPORTS` first lets the error
//! name the expected signature. Checks:
//!
//! 1. Every import comes from `console` or `math`
//! 2. Every import names a function the host provides
//! 3. Parameter and result types match exactly

use wasmtime::{ExternType, FuncType, Module, ValType};

use wasmbridge_hostapi::{
    find_import, types::render_signature, ScalarType, CONSOLE_MODULE, MATH_MODULE, MEMORY_EXPORT,
};

use crate::error::RunnerError;

fn to_scalar(ty: &ValType) -> Option<ScalarType> {
    match ty {
        ValType::I32 => Some(ScalarType::I32),
        ValType::I64 => Some(ScalarType::I64),
        ValType::F32 => Some(ScalarType::F32),
        ValType::F64 => Some(ScalarType::F64),
        _ => None,
    }
}

fn type_name(ty: &ValType) -> String {
    match (to_scalar(ty), ty) {
        (Some(scalar), _) => scalar.to_string(),
        (None, ValType::V128) => "v128".to_string(),
        (None, _) => "ref".to_string(),
    }
}

fn describe(ty: &FuncType) -> String {
    let join = |types: Vec<String>| types.join(" ");
    let params: Vec<String> = ty.params().map(|t| type_name(&t)).collect();
    let results: Vec<String> = ty.results().map(|t| type_name(&t)).collect();
    let mut out = Vec::new();
    if !params.is_empty() {
        out.push(format!("(param {})", join(params)));
    }
    if !results.is_empty() {
        out.push(format!("(result {})", join(results)));
    }
    if out.is_empty() {
        "()".to_string()
    } else {
        out.join(" ")
    }
}

fn types_match(actual: impl ExactSizeIterator<Item = ValType>, expected: &[ScalarType]) -> bool {
    actual.len() == expected.len()
        && actual
            .zip(expected)
            .all(|(ty, want)| to_scalar(&ty) == Some(*want))
}

/// Check every import of `module` against the host import table.
pub fn validate_imports(module: &Module) -> Result<(), RunnerError> {
    for import in module.imports() {
        let (namespace, name) = (import.module(), import.name());

        if namespace != CONSOLE_MODULE && namespace != MATH_MODULE {
            return Err(RunnerError::Instantiation(format!(
                "import from unknown module '{namespace}' (only '{CONSOLE_MODULE}' and '{MATH_MODULE}' are provided): {name}"
            )));
        }

        let expected = find_import(namespace, name).ok_or_else(|| {
            RunnerError::Instantiation(format!("unknown import: {namespace}.{name}"))
        })?;

        let func_ty = match import.ty() {
            ExternType::Func(ft) => ft,
            _ => {
                return Err(RunnerError::Instantiation(format!(
                    "import {namespace}.{name} must be a function"
                )));
            }
        };

        if !types_match(func_ty.params(), expected.params)
            || !types_match(func_ty.results(), expected.results)
        {
            return Err(RunnerError::Instantiation(format!(
                "import {namespace}.{name} has type {} but the host provides {}",
                describe(&func_ty),
                render_signature(expected.params, expected.results)
            )));
        }
    }

    Ok(())
}

/// Returns true if the module exports a memory named `mem`.
pub fn exports_memory(module: &Module) -> bool {
    module
        .exports()
        .any(|e| e.name() == MEMORY_EXPORT && matches!(e.ty(), ExternType::Memory(_)))
}

/// Returns true if the module imports any `console.log_mem_as_*` function.
pub fn imports_memory_views(module: &Module) -> bool {
    module
        .imports()
        .any(|i| i.module() == CONSOLE_MODULE && i.name().starts_with("log_mem_as_"))
}
