//! Module compiler: WebAssembly text to a validated binary.
//!
//! Compilation happens in two passes. `wat` turns text into binary and
//! reports syntax errors with `path:line:column`. `wasmparser` then
//! validates the binary against the requested feature set. A validation
//! failure is reported against the text: the function whose body holds the
//! offending instruction, or the module field (global, export, data
//! segment, ...) the failing section entry was built from.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use wasmparser::{
    Export, FromReader, Import, KnownCustom, Name, Parser, Payload, SectionLimited, TypeRef,
    Validator,
};

use crate::config::{FeatureConfig, FeatureOverrides};
use crate::error::CompileError;
use crate::source_map::{FieldKind, SourceMap};

/// A validated binary module, ready for loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryModule {
    name: String,
    bytes: Vec<u8>,
    features: FeatureConfig,
}

impl BinaryModule {
    /// The source name the module was compiled from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoded module bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Feature set the module was validated against.
    pub fn features(&self) -> &FeatureConfig {
        &self.features
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for BinaryModule {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A position in module text. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

/// Where a validation error was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSite {
    /// Inside the body of a function. `index` counts imported functions.
    Function {
        index: u32,
        name: Option<String>,
        location: Option<SourceLocation>,
    },
    /// In a module field other than a function. `index` counts entries of
    /// the field's section.
    Field {
        kind: FieldKind,
        index: u32,
        location: Option<SourceLocation>,
    },
    /// Not attributable to one field; points at the module itself.
    Module(SourceLocation),
}

impl fmt::Display for ErrorSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function {
                index,
                name,
                location,
            } => {
                match name {
                    Some(name) => write!(f, "function ${name} (#{index})")?,
                    None => write!(f, "function #{index}")?,
                }
                if let Some(location) = location {
                    write!(f, " defined at {location}")?;
                }
                Ok(())
            }
            Self::Field {
                kind,
                index,
                location,
            } => {
                write!(f, "{kind} #{index}")?;
                if let Some(location) = location {
                    write!(f, " at {location}")?;
                }
                Ok(())
            }
            Self::Module(location) => write!(f, "module at {location}"),
        }
    }
}

/// Compile module text with `overrides` applied to the default features.
///
/// `source_name` is used in error locations only.
pub fn compile(
    source_name: &str,
    source: &str,
    overrides: &FeatureOverrides,
) -> Result<BinaryModule, CompileError> {
    let features = FeatureConfig::default().merged(overrides);
    debug!(source = source_name, ?features, "compiling module text");

    if !features.annotations {
        reject_annotations(&SourceMap::new(source_name, source))?;
    }

    let bytes = wat::parse_str(source).map_err(|mut err| {
        err.set_path(Path::new(source_name));
        CompileError::Parse(err.to_string())
    })?;

    let mut validator = Validator::new_with_features(features.to_wasm_features());
    if let Err(err) = validator.validate_all(&bytes) {
        let map = SourceMap::new(source_name, source);
        let site = error_site(&bytes, err.offset(), &map);
        warn!(source = source_name, %site, "module failed validation");
        return Err(CompileError::Validation {
            message: err.message().to_string(),
            site,
        });
    }

    debug!(source = source_name, len = bytes.len(), "module compiled");
    Ok(BinaryModule {
        name: source_name.to_string(),
        bytes,
        features,
    })
}

/// Read and compile a module text file.
pub fn compile_file(
    path: impl AsRef<Path>,
    overrides: &FeatureOverrides,
) -> Result<BinaryModule, CompileError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    compile(&path.to_string_lossy(), &source, overrides)
}

/// Where in the text the entry containing `offset` came from.
fn error_site(bytes: &[u8], offset: usize, map: &SourceMap<'_>) -> ErrorSite {
    let mut imported_funcs = 0u32;
    let mut defined_func = None;
    let mut bodies = 0u32;
    let mut site = None;
    let mut names = HashMap::new();

    let field = |kind: FieldKind, index: u32, location: Option<SourceLocation>| {
        Some(ErrorSite::Field {
            kind,
            index,
            location,
        })
    };

    for payload in Parser::new(0).parse_all(bytes) {
        let Ok(payload) = payload else { break };
        match payload {
            Payload::TypeSection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    site = field(FieldKind::Type, entry.index, map.type_entry(entry.index));
                }
            }
            Payload::ImportSection(reader) => {
                imported_funcs = reader
                    .clone()
                    .into_iter()
                    .flatten()
                    .filter(|import| matches!(import.ty, TypeRef::Func(_)))
                    .count() as u32;
                let key = |import: &Import<'_>| {
                    (import.module.to_string(), import.name.to_string())
                };
                if let Some(entry) = section_entry(reader, offset, key) {
                    let (module, name) = &entry.key;
                    let location = map.import(module, name, entry.occurrence);
                    site = field(FieldKind::Import, entry.index, location);
                }
            }
            Payload::FunctionSection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    defined_func = Some(entry.index);
                }
            }
            Payload::TableSection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    site = field(FieldKind::Table, entry.index, map.defined("table", entry.index));
                }
            }
            Payload::MemorySection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    let location = map.defined("memory", entry.index);
                    site = field(FieldKind::Memory, entry.index, location);
                }
            }
            Payload::TagSection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    site = field(FieldKind::Tag, entry.index, map.defined("tag", entry.index));
                }
            }
            Payload::GlobalSection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    let location = map.defined("global", entry.index);
                    site = field(FieldKind::Global, entry.index, location);
                }
            }
            Payload::ExportSection(reader) => {
                let key = |export: &Export<'_>| export.name.to_string();
                if let Some(entry) = section_entry(reader, offset, key) {
                    let location = map.export(&entry.key, entry.occurrence);
                    site = field(FieldKind::Export, entry.index, location);
                }
            }
            Payload::StartSection { range, .. } if range.contains(&offset) => {
                site = field(FieldKind::Start, 0, map.nth("start", 0));
            }
            Payload::ElementSection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    site = field(FieldKind::Elem, entry.index, map.nth("elem", entry.index));
                }
            }
            Payload::DataSection(reader) => {
                if let Some(entry) = section_entry(reader, offset, |_| ()) {
                    site = field(FieldKind::Data, entry.index, map.nth("data", entry.index));
                }
            }
            Payload::CodeSectionEntry(body) => {
                if body.range().contains(&offset) {
                    defined_func = Some(bodies);
                }
                bodies += 1;
            }
            Payload::CustomSection(reader) => {
                if let KnownCustom::Name(section) = reader.as_known() {
                    for name in section.into_iter().flatten() {
                        if let Name::Function(functions) = name {
                            for naming in functions.into_iter().flatten() {
                                names.insert(naming.index, naming.name.to_string());
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(defined) = defined_func {
        let index = imported_funcs + defined;
        return ErrorSite::Function {
            index,
            name: names.remove(&index),
            location: map.defined("func", defined),
        };
    }
    site.unwrap_or_else(|| ErrorSite::Module(map.module_location()))
}

struct SectionEntry<K> {
    index: u32,
    key: K,
    /// Earlier entries in the section with the same key.
    occurrence: usize,
}

/// The entry of `reader` that contains `offset`.
fn section_entry<'a, T, K>(
    reader: SectionLimited<'a, T>,
    offset: usize,
    key: impl Fn(&T) -> K,
) -> Option<SectionEntry<K>>
where
    T: FromReader<'a>,
    K: PartialEq,
{
    if !reader.range().contains(&offset) {
        return None;
    }
    let mut keys = Vec::new();
    for item in reader.into_iter_with_offsets() {
        let Ok((start, item)) = item else { break };
        if start > offset {
            break;
        }
        keys.push(key(&item));
    }
    let key = keys.pop()?;
    let occurrence = keys.iter().filter(|k| **k == key).count();
    Some(SectionEntry {
        index: keys.len() as u32,
        key,
        occurrence,
    })
}

/// Fail on the first `(@...)` annotation outside strings and comments.
fn reject_annotations(map: &SourceMap<'_>) -> Result<(), CompileError> {
    match map.first_annotation() {
        Some(location) => Err(CompileError::Parse(format!(
            "{location}: annotations are disabled"
        ))),
        None => Ok(()),
    }
}
