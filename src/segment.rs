//! The segment record (§3) and the string-resolved shapes exposed at
//! the public edge.

/// One mapping record, keyed by generated position, in id-form
/// (sources/names are interned ids, resolved to strings only at the
/// public edge by [`crate::engine::SourceMapEngine`]).
///
/// Internally 0-based throughout, matching the VLQ codec and the
/// mapping table. The public-facing 1-based line convention (§6) is
/// applied only at the engine boundary.
///
/// Invariants (§3), enforced by [`Segment::new`]:
/// - `source.is_none()` implies `original_line`, `original_column`, and
///   `name` are all `None`.
/// - `name.is_some()` implies `source.is_some()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<u32>,
    pub original_line: Option<u32>,
    pub original_column: Option<u32>,
    pub name: Option<u32>,
}

impl Segment {
    /// Construct a segment, normalizing field combinations that would
    /// otherwise violate the invariants above rather than trusting the
    /// caller.
    pub fn new(
        generated_line: u32,
        generated_column: u32,
        source: Option<u32>,
        original_line: Option<u32>,
        original_column: Option<u32>,
        name: Option<u32>,
    ) -> Self {
        let (original_line, original_column, name) = if source.is_none() {
            (None, None, None)
        } else {
            (original_line, original_column, name)
        };
        Segment {
            generated_line,
            generated_column,
            source,
            original_line,
            original_column,
            name,
        }
    }

    /// A bare generated-position segment with no original side.
    pub fn unmapped(generated_line: u32, generated_column: u32) -> Self {
        Segment::new(generated_line, generated_column, None, None, None, None)
    }
}

/// A decoded segment awaiting merge into a [`crate::table::MappingTable`]:
/// source/name ids already have the donor bias applied, but
/// `generated_line`/`generated_column` are still donor-local (no
/// `lineOffset`/`columnOffset` applied yet — §4.3 applies that at merge
/// time, since the column offset only affects the donor's first line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSegment {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<u32>,
    pub original_line: Option<u32>,
    pub original_column: Option<u32>,
    pub name: Option<u32>,
}

/// A single mapping supplied to `addIndexedMapping`, using the public
/// 1-based generated/original line convention.
#[derive(Debug, Clone)]
pub struct IndexedMapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub original_line: Option<u32>,
    pub original_column: Option<u32>,
    pub source: Option<String>,
    pub name: Option<String>,
}

/// The result of `findClosestMapping`, fully resolved to strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<String>,
    pub original_line: Option<u32>,
    pub original_column: Option<u32>,
    pub name: Option<String>,
}

/// The output of `toVLQ`: the re-encoded mappings string plus the
/// tables it references. Deliberately not a JSON envelope (that wrapper
/// is out of scope, §1) — just the plain data a caller would embed in
/// one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlqMappings {
    pub mappings: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
}
