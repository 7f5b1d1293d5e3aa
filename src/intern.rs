//! String interning for the sources and names tables.
//!
//! Both tables share the same dedup contract (§4.2): `intern(s)` returns
//! the existing id if `s` was seen before, else appends and returns a
//! fresh dense id. [`string_interner`] gives us exactly that for free
//! instead of a hand-rolled linear scan.

use string_interner::backend::StringBackend;
use string_interner::{DefaultSymbol, StringInterner, Symbol};

fn symbol_to_id(sym: DefaultSymbol) -> u32 {
    sym.to_usize() as u32
}

fn id_to_symbol(id: u32) -> Option<DefaultSymbol> {
    DefaultSymbol::try_from_usize(id as usize)
}

/// Interned table of distinct names (no parallel content vector).
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    interner: StringInterner<StringBackend<DefaultSymbol>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning its existing id if already present.
    pub fn intern(&mut self, name: &str) -> u32 {
        symbol_to_id(self.interner.get_or_intern(name))
    }

    /// Resolve `id` back to its string, if it is in range.
    pub fn get(&self, id: u32) -> Option<&str> {
        id_to_symbol(id).and_then(|sym| self.interner.resolve(sym))
    }

    /// Look up an existing id for `name` without interning it.
    pub fn find(&self, name: &str) -> Option<u32> {
        self.interner.get(name).map(symbol_to_id)
    }

    pub fn len(&self) -> u32 {
        self.interner.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.interner.is_empty()
    }
}

/// Interned table of distinct source paths, with a parallel content
/// vector (§4.2): `contents[i]` is defined (default empty) for every
/// `sources[i]`.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    interner: StringInterner<StringBackend<DefaultSymbol>>,
    contents: Vec<String>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `path`, returning its existing id if already present.
    /// Lazily grows the parallel content vector so every interned path
    /// has a (possibly empty) content slot.
    pub fn intern(&mut self, path: &str) -> u32 {
        let id = symbol_to_id(self.interner.get_or_intern(path));
        if self.contents.len() <= id as usize {
            self.contents.resize(id as usize + 1, String::new());
        }
        id
    }

    /// Set the content for `path`, interning it first if necessary.
    /// Idempotent: calling twice with different content overwrites.
    pub fn set_content(&mut self, path: &str, content: &str) -> u32 {
        let id = self.intern(path);
        self.contents[id as usize] = content.to_string();
        id
    }

    /// Set the content for an already-interned id directly.
    pub fn set_content_by_id(&mut self, id: u32, content: &str) {
        if (id as usize) < self.contents.len() {
            self.contents[id as usize] = content.to_string();
        }
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        id_to_symbol(id).and_then(|sym| self.interner.resolve(sym))
    }

    /// Content for `id`, or an empty string if `id` is out of range or
    /// has never had content set.
    pub fn get_content(&self, id: u32) -> &str {
        self.contents.get(id as usize).map(String::as_str).unwrap_or("")
    }

    pub fn find(&self, path: &str) -> Option<u32> {
        self.interner.get(path).map(symbol_to_id)
    }

    pub fn len(&self) -> u32 {
        self.interner.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.interner.is_empty()
    }
}
