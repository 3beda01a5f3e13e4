//! Locating module fields in module text.
//!
//! Each entry of a binary section is produced by one field of the text (or
//! by an inline `(import ..)`/`(export ..)` inside one). `SourceMap` keeps
//! the field structure of the text so that a section entry can be traced
//! back to the line and column it came from.

use std::fmt;
use std::path::PathBuf;

use crate::compiler::SourceLocation;

/// The kind of a module field other than a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Type,
    Import,
    Table,
    Memory,
    Tag,
    Global,
    Export,
    Start,
    Elem,
    Data,
}

impl FieldKind {
    /// The field's keyword in module text.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Import => "import",
            Self::Table => "table",
            Self::Memory => "memory",
            Self::Tag => "tag",
            Self::Global => "global",
            Self::Export => "export",
            Self::Start => "start",
            Self::Elem => "elem",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug)]
enum Sexp<'a> {
    List { start: usize, items: Vec<Sexp<'a>> },
    Atom(&'a str),
    Str(&'a str),
}

impl<'a> Sexp<'a> {
    fn head(&self) -> Option<&'a str> {
        match self.items().first() {
            Some(Sexp::Atom(atom)) => Some(*atom),
            _ => None,
        }
    }

    fn start(&self) -> Option<usize> {
        match self {
            Sexp::List { start, .. } => Some(*start),
            _ => None,
        }
    }

    fn items(&self) -> &[Sexp<'a>] {
        match self {
            Sexp::List { items, .. } => items,
            _ => &[],
        }
    }

    fn strings(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.items().iter().filter_map(|item| match item {
            Sexp::Str(s) => Some(*s),
            _ => None,
        })
    }

    fn has_child(&self, keyword: &str) -> bool {
        self.items().iter().any(|item| item.head() == Some(keyword))
    }

    /// Start of the first list, in text order, whose head satisfies `pred`.
    fn find(&self, pred: &impl Fn(&str) -> bool) -> Option<usize> {
        if self.head().is_some_and(pred) {
            return self.start();
        }
        self.items().iter().find_map(|item| item.find(pred))
    }
}

/// Split module text into s-expressions, skipping comments.
///
/// Unbalanced input is tolerated: unclosed lists are dropped and stray
/// closing parentheses ignored.
fn parse(source: &str) -> Vec<Sexp<'_>> {
    fn push<'a>(stack: &mut [(usize, Vec<Sexp<'a>>)], top: &mut Vec<Sexp<'a>>, item: Sexp<'a>) {
        match stack.last_mut() {
            Some((_, items)) => items.push(item),
            None => top.push(item),
        }
    }

    let bytes = source.as_bytes();
    let mut stack: Vec<(usize, Vec<Sexp<'_>>)> = Vec::new();
    let mut top = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b";;") {
            i += rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        } else if rest.starts_with(b"(;") {
            i += block_comment_len(rest);
        } else if rest[0] == b'(' {
            stack.push((i, Vec::new()));
            i += 1;
        } else if rest[0] == b')' {
            if let Some((start, items)) = stack.pop() {
                push(&mut stack, &mut top, Sexp::List { start, items });
            }
            i += 1;
        } else if rest[0] == b'"' {
            let end = string_end(bytes, i + 1);
            push(&mut stack, &mut top, Sexp::Str(&source[i + 1..end]));
            i = end + 1;
        } else if rest[0].is_ascii_whitespace() {
            i += 1;
        } else {
            let len = rest
                .iter()
                .position(|&b| b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'"' | b';'))
                .unwrap_or(rest.len())
                .max(1);
            push(&mut stack, &mut top, Sexp::Atom(&source[i..i + len]));
            i += len;
        }
    }
    top
}

fn block_comment_len(rest: &[u8]) -> usize {
    let mut depth = 0usize;
    let mut i = 0;
    while i < rest.len() {
        if rest[i..].starts_with(b"(;") {
            depth += 1;
            i += 2;
        } else if rest[i..].starts_with(b";)") {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    rest.len()
}

/// Index of the closing quote of a string whose body starts at `from`.
fn string_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// 1-based line and column of byte `pos` in `source`.
pub fn line_col(source: &str, pos: usize) -> (usize, usize) {
    let before = &source[..pos];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}

/// The field structure of one module's text.
pub struct SourceMap<'a> {
    path: PathBuf,
    source: &'a str,
    module_start: usize,
    forms: Vec<Sexp<'a>>,
}

impl<'a> SourceMap<'a> {
    pub fn new(source_name: &str, source: &'a str) -> Self {
        let mut forms = parse(source);
        let is_module = forms.len() == 1 && forms[0].head() == Some("module");
        let (module_start, forms) = match forms.pop() {
            Some(Sexp::List { start, items }) if is_module => (start, items),
            Some(last) => {
                forms.push(last);
                (0, forms)
            }
            None => (0, forms),
        };
        Self {
            path: PathBuf::from(source_name),
            source,
            module_start,
            forms,
        }
    }

    pub fn location(&self, pos: usize) -> SourceLocation {
        let (line, column) = line_col(self.source, pos);
        SourceLocation {
            path: self.path.clone(),
            line,
            column,
        }
    }

    /// Location of the `(module` form, or the start of the text.
    pub fn module_location(&self) -> SourceLocation {
        self.location(self.module_start)
    }

    fn fields(&self) -> impl Iterator<Item = &Sexp<'a>> + '_ {
        self.forms.iter().filter(|form| form.start().is_some())
    }

    /// Top-level fields and the lists directly inside them, in text order.
    fn fields_and_children(&self) -> impl Iterator<Item = &Sexp<'a>> + '_ {
        self.fields()
            .flat_map(|field| std::iter::once(field).chain(field.items()))
    }

    /// The `n`-th function, table, memory, tag or global defined (not
    /// imported) by the module.
    pub fn defined(&self, keyword: &str, n: u32) -> Option<SourceLocation> {
        self.fields()
            .filter(|field| field.head() == Some(keyword) && !field.has_child("import"))
            .nth(n as usize)
            .and_then(Sexp::start)
            .map(|pos| self.location(pos))
    }

    /// The `n`-th `keyword` field.
    pub fn nth(&self, keyword: &str, n: u32) -> Option<SourceLocation> {
        self.fields()
            .filter(|field| field.head() == Some(keyword))
            .nth(n as usize)
            .and_then(Sexp::start)
            .map(|pos| self.location(pos))
    }

    /// The `n`-th type section entry: a `type` field or a `rec` group.
    ///
    /// Types the text only uses inline come after every explicit one and have
    /// no field of their own.
    pub fn type_entry(&self, n: u32) -> Option<SourceLocation> {
        self.fields()
            .filter(|field| matches!(field.head(), Some("type" | "rec")))
            .nth(n as usize)
            .and_then(Sexp::start)
            .map(|pos| self.location(pos))
    }

    /// The `occurrence`-th import of `module`.`name`, as a field or inline.
    pub fn import(&self, module: &str, name: &str, occurrence: usize) -> Option<SourceLocation> {
        self.fields_and_children()
            .filter(|list| list.head() == Some("import"))
            .filter(|list| {
                let mut strings = list.strings();
                strings.next() == Some(module) && strings.next() == Some(name)
            })
            .nth(occurrence)
            .and_then(Sexp::start)
            .map(|pos| self.location(pos))
    }

    /// The `occurrence`-th export named `name`, as a field or inline.
    pub fn export(&self, name: &str, occurrence: usize) -> Option<SourceLocation> {
        self.fields_and_children()
            .filter(|list| list.head() == Some("export"))
            .filter(|list| list.strings().next() == Some(name))
            .nth(occurrence)
            .and_then(Sexp::start)
            .map(|pos| self.location(pos))
    }

    /// The first `(@...)` annotation in the text.
    pub fn first_annotation(&self) -> Option<SourceLocation> {
        let is_annotation = |head: &str| head.starts_with('@');
        self.forms
            .iter()
            .find_map(|form| form.find(&is_annotation))
            .map(|pos| self.location(pos))
    }
}
