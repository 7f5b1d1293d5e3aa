//! The public engine façade (§6): the single entry point a host
//! embeds, wrapping the table, the intern tables, and the raw-mappings
//! cache behind one `destroy`-gated API.

use tracing::{debug, instrument};

use crate::compose;
use crate::error::{Error, Result};
use crate::intern::{NameTable, SourceTable};
use crate::segment::{IndexedMapping, ResolvedMapping, VlqMappings};
use crate::snapshot;
use crate::table::MappingTable;
use crate::vlq;

/// Lazily-parsed mapping storage (§4.4). A freshly ingested VLQ batch
/// is kept as text plus the bias it needs applied at materialization
/// time; nothing is spent building segments until something other than
/// another append actually needs the table.
enum State {
    Raw { mappings: String, source_bias: u32, name_bias: u32 },
    Parsed(MappingTable),
}

impl Default for State {
    fn default() -> Self {
        State::Parsed(MappingTable::new())
    }
}

/// The engine's public surface: ingest mappings from any of the three
/// input shapes, query/transform in memory, and re-emit as VLQ text or
/// a binary snapshot.
///
/// All line numbers crossing this boundary are 1-based (§6); every
/// other module in this crate is 0-based internally, so conversion
/// happens only here.
#[derive(Default)]
pub struct SourceMapEngine {
    state: State,
    sources: SourceTable,
    names: NameTable,
    destroyed: bool,
}

fn to_internal_line(line: u32) -> Result<u32> {
    line.checked_sub(1).ok_or_else(|| Error::malformed("line numbers are 1-based, got 0"))
}

fn to_external_line(line: u32) -> u32 {
    line + 1
}

impl SourceMapEngine {
    /// Create an empty engine.
    pub fn create() -> Self {
        Self::default()
    }

    fn check_alive(&self) -> Result<()> {
        if self.destroyed {
            Err(Error::UseAfterDestroy)
        } else {
            Ok(())
        }
    }

    /// Collapse any pending raw-mappings batch into the indexed table.
    /// A no-op if the table is already materialized.
    #[instrument(level = "debug", skip(self))]
    fn materialize(&mut self) -> Result<()> {
        let State::Raw { mappings, source_bias, name_bias } = &self.state else {
            return Ok(());
        };
        debug!(len = mappings.len(), "materializing raw mappings batch");
        let decoded = vlq::decode_mappings(mappings, *source_bias, *name_bias)?;
        let mut table = MappingTable::new();
        table.merge(decoded, 0, 0);
        self.state = State::Parsed(table);
        Ok(())
    }

    fn table_mut(&mut self) -> Result<&mut MappingTable> {
        self.materialize()?;
        match &mut self.state {
            State::Parsed(table) => Ok(table),
            State::Raw { .. } => unreachable!("materialize always leaves State::Parsed"),
        }
    }

    fn table(&mut self) -> Result<&MappingTable> {
        self.materialize()?;
        match &self.state {
            State::Parsed(table) => Ok(table),
            State::Raw { .. } => unreachable!("materialize always leaves State::Parsed"),
        }
    }

    /// Intern a batch of source paths, returning the bias the decoder
    /// should add to indices local to this batch.
    fn intern_sources(&mut self, sources: &[String]) -> u32 {
        let bias = self.sources.len();
        for path in sources {
            self.sources.intern(path);
        }
        bias
    }

    fn intern_names(&mut self, names: &[String]) -> u32 {
        let bias = self.names.len();
        for name in names {
            self.names.intern(name);
        }
        bias
    }

    /// Ingest a `mappings` string plus the local source/name arrays it
    /// indexes into (§6), with no offset applied to the donor's
    /// generated positions. Convenience wrapper over
    /// [`Self::add_vlq_mappings_with_offset`] for the common case.
    pub fn add_vlq_mappings(
        &mut self,
        mappings: &str,
        sources: &[String],
        sources_content: Option<&[String]>,
        names: &[String],
    ) -> Result<()> {
        self.add_vlq_mappings_with_offset(mappings, sources, sources_content, names, 0, 0)
    }

    /// Ingest a `mappings` string plus the local source/name arrays it
    /// indexes into, shifting the donor's generated positions by
    /// `line_offset`/`column_offset` (§4.3, §6). Parsing is deferred
    /// (§4.4) only when this is the very first batch the engine has
    /// ever seen at zero offset (empty table, empty intern tables) —
    /// the condition §4.4 requires for the raw-cache fast path.
    /// Any later ingest merges straight into the already-materialized
    /// table instead of clobbering it: a second `State::Raw` batch
    /// would otherwise discard whatever the first one (or an
    /// `addIndexedMapping`/`addBufferMappings` call in between) had
    /// already contributed.
    #[instrument(level = "debug", skip(self, mappings, sources, sources_content, names))]
    pub fn add_vlq_mappings_with_offset(
        &mut self,
        mappings: &str,
        sources: &[String],
        sources_content: Option<&[String]>,
        names: &[String],
        line_offset: u32,
        column_offset: u32,
    ) -> Result<()> {
        self.check_alive()?;
        vlq::validate_mappings(mappings)?;

        let is_first_batch = line_offset == 0
            && column_offset == 0
            && matches!(&self.state, State::Parsed(table) if table.is_empty())
            && self.sources.is_empty()
            && self.names.is_empty();

        let source_bias = self.intern_sources(sources);
        let name_bias = self.intern_names(names);
        if let Some(contents) = sources_content {
            for (path, content) in sources.iter().zip(contents.iter()) {
                self.sources.set_content(path, content);
            }
        }

        if is_first_batch {
            self.state = State::Raw { mappings: mappings.to_string(), source_bias, name_bias };
            debug!(segments_pending = true, "queued raw mappings batch");
            return Ok(());
        }

        let decoded = vlq::decode_mappings(mappings, source_bias, name_bias)?;
        let count = decoded.len();
        self.table_mut()?.merge(decoded, line_offset, column_offset);
        debug!(segments = count, "merged mappings batch into materialized table");
        Ok(())
    }

    /// Add one fully-resolved mapping directly (§6), using the public
    /// 1-based line convention, with no offset applied.
    pub fn add_indexed_mapping(&mut self, mapping: IndexedMapping) -> Result<()> {
        self.add_indexed_mapping_with_offset(mapping, 0, 0)
    }

    /// Add one fully-resolved mapping directly, shifting its generated
    /// position by `line_offset`/`column_offset` (§4.3, §6) the same
    /// way a donor batch would be shifted.
    pub fn add_indexed_mapping_with_offset(&mut self, mapping: IndexedMapping, line_offset: u32, column_offset: u32) -> Result<()> {
        self.check_alive()?;
        let generated_line = to_internal_line(mapping.generated_line)?;
        let original_line = mapping.original_line.map(to_internal_line).transpose()?;

        let source = mapping.source.as_deref().map(|s| self.sources.intern(s));
        let name = mapping.name.as_deref().map(|n| self.names.intern(n));

        let decoded = crate::segment::DecodedSegment {
            generated_line,
            generated_column: mapping.generated_column,
            source,
            original_line,
            original_column: mapping.original_column,
            name,
        };
        self.table_mut()?.merge(std::iter::once(decoded), line_offset, column_offset);
        Ok(())
    }

    pub fn add_indexed_mappings(&mut self, mappings: impl IntoIterator<Item = IndexedMapping>) -> Result<()> {
        for mapping in mappings {
            self.add_indexed_mapping(mapping)?;
        }
        Ok(())
    }

    /// Merge the contents of a binary snapshot (§4.5) as if it were
    /// another donor's mappings, shifted by `line_offset`/`column_offset`
    /// generated positions (§4.3).
    #[instrument(level = "debug", skip(self, buffer))]
    pub fn add_buffer_mappings(&mut self, buffer: &[u8], line_offset: u32, column_offset: u32) -> Result<()> {
        self.check_alive()?;
        let decoded = snapshot::decode(buffer)?;
        debug!(segments = decoded.segments.len(), "merging snapshot buffer");

        let source_bias = self.intern_sources(&decoded.sources);
        for (path, content) in decoded.sources.iter().zip(decoded.sources_content.iter()) {
            if !content.is_empty() {
                self.sources.set_content(path, content);
            }
        }
        let name_bias = self.intern_names(&decoded.names);

        let biased = decoded.segments.into_iter().map(|seg| crate::segment::DecodedSegment {
            generated_line: seg.generated_line,
            generated_column: seg.generated_column,
            source: seg.source.map(|s| s + source_bias),
            original_line: seg.original_line,
            original_column: seg.original_column,
            name: seg.name.map(|n| n + name_bias),
        });

        self.table_mut()?.merge(biased, line_offset, column_offset);
        Ok(())
    }

    pub fn add_source(&mut self, path: &str) -> Result<u32> {
        self.check_alive()?;
        Ok(self.sources.intern(path))
    }

    pub fn add_sources(&mut self, paths: &[String]) -> Result<Vec<u32>> {
        self.check_alive()?;
        Ok(paths.iter().map(|p| self.sources.intern(p)).collect())
    }

    pub fn add_name(&mut self, name: &str) -> Result<u32> {
        self.check_alive()?;
        Ok(self.names.intern(name))
    }

    pub fn add_names(&mut self, names: &[String]) -> Result<Vec<u32>> {
        self.check_alive()?;
        Ok(names.iter().map(|n| self.names.intern(n)).collect())
    }

    pub fn set_source_content(&mut self, path: &str, content: &str) -> Result<u32> {
        self.check_alive()?;
        Ok(self.sources.set_content(path, content))
    }

    pub fn get_source(&self, id: u32) -> Result<&str> {
        self.check_alive()?;
        self.sources.get(id).ok_or_else(|| Error::out_of_bounds(id, self.sources.len()))
    }

    pub fn get_name(&self, id: u32) -> Result<&str> {
        self.check_alive()?;
        self.names.get(id).ok_or_else(|| Error::out_of_bounds(id, self.names.len()))
    }

    pub fn get_source_content(&self, id: u32) -> Result<&str> {
        self.check_alive()?;
        Ok(self.sources.get_content(id))
    }

    /// Nearest-neighbor lookup (§4.3), 1-based on both sides of the
    /// boundary.
    pub fn find_closest_mapping(&mut self, generated_line: u32, generated_column: u32) -> Result<Option<ResolvedMapping>> {
        self.check_alive()?;
        let line = to_internal_line(generated_line)?;
        let table = self.table()?;
        let Some(seg) = table.find_closest(line, generated_column) else {
            return Ok(None);
        };

        let source = seg.source.and_then(|id| self.sources.get(id)).map(str::to_string);
        let name = seg.name.and_then(|id| self.names.get(id)).map(str::to_string);

        Ok(Some(ResolvedMapping {
            generated_line: to_external_line(seg.generated_line),
            generated_column: seg.generated_column,
            source,
            original_line: seg.original_line.map(to_external_line),
            original_column: seg.original_column,
            name,
        }))
    }

    /// Re-emit the current state as a `mappings` string plus the
    /// sources/names tables it references (§6). Short-circuits to the
    /// cached raw string when the raw-mappings cache (§4.4) is still
    /// live, skipping materialization entirely.
    pub fn to_vlq(&mut self) -> Result<VlqMappings> {
        self.check_alive()?;
        let mappings = match &self.state {
            State::Raw { mappings, .. } => mappings.clone(),
            State::Parsed(table) => table.to_vlq(),
        };

        let sources = (0..self.sources.len()).map(|id| self.sources.get(id).unwrap_or("").to_string()).collect();
        let sources_content = (0..self.sources.len()).map(|id| self.sources.get_content(id).to_string()).collect();
        let names = (0..self.names.len()).map(|id| self.names.get(id).unwrap_or("").to_string()).collect();

        Ok(VlqMappings { mappings, sources, sources_content, names })
    }

    /// Serialize the current state into a binary snapshot (§4.5).
    pub fn to_buffer(&mut self) -> Result<Vec<u8>> {
        self.check_alive()?;
        let table = self.table()?;
        let sources: Vec<String> = (0..self.sources.len()).map(|id| self.sources.get(id).unwrap_or("").to_string()).collect();
        let sources_content: Vec<String> = (0..self.sources.len()).map(|id| self.sources.get_content(id).to_string()).collect();
        let names: Vec<String> = (0..self.names.len()).map(|id| self.names.get(id).unwrap_or("").to_string()).collect();
        let segments: Vec<_> = table
            .iter_indexed()
            .map(|(_, _, seg)| crate::segment::DecodedSegment {
                generated_line: seg.generated_line,
                generated_column: seg.generated_column,
                source: seg.source,
                original_line: seg.original_line,
                original_column: seg.original_column,
                name: seg.name,
            })
            .collect();

        Ok(snapshot::encode(&sources, &sources_content, &names, &segments))
    }

    /// Reconstruct a fresh engine from a binary snapshot (§4.5).
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        let decoded = snapshot::decode(buffer)?;
        let mut engine = Self::create();
        engine.intern_sources(&decoded.sources);
        for (path, content) in decoded.sources.iter().zip(decoded.sources_content.iter()) {
            if !content.is_empty() {
                engine.sources.set_content(path, content);
            }
        }
        engine.intern_names(&decoded.names);
        let mut table = MappingTable::new();
        table.merge(decoded.segments, 0, 0);
        engine.state = State::Parsed(table);
        Ok(engine)
    }

    /// Re-anchor this engine's originals through `donor`'s generated→
    /// original relation (§4.6).
    #[instrument(level = "debug", skip(self, donor))]
    pub fn extends(&mut self, donor: &mut SourceMapEngine) -> Result<()> {
        self.check_alive()?;
        donor.check_alive()?;
        self.materialize()?;
        donor.materialize()?;

        let State::Parsed(donor_table) = &donor.state else {
            unreachable!("materialize always leaves State::Parsed");
        };
        let State::Parsed(host_table) = &mut self.state else {
            unreachable!("materialize always leaves State::Parsed");
        };

        compose::extends(host_table, &mut self.sources, &mut self.names, donor_table, &donor.sources, &donor.names);
        debug!("extended host map through donor");
        Ok(())
    }

    /// Parse `buffer` as a donor snapshot and extend through it in one
    /// step (§6), without requiring the caller to build a second engine.
    pub fn extends_buffer(&mut self, buffer: &[u8]) -> Result<()> {
        let mut donor = Self::from_buffer(buffer)?;
        self.extends(&mut donor)
    }

    /// Release this engine's state. Every other public method returns
    /// `UseAfterDestroy` once this has been called (§7).
    #[instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self) {
        self.state = State::Parsed(MappingTable::new());
        self.sources = SourceTable::new();
        self.names = NameTable::new();
        self.destroyed = true;
        debug!("engine destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_vlq_roundtrip() {
        let mut engine = SourceMapEngine::create();
        engine
            .add_vlq_mappings("AAAA,CACA", &["a.js".to_string()], None, &[])
            .unwrap();
        let found = engine.find_closest_mapping(1, 2).unwrap().unwrap();
        assert_eq!(found.source.as_deref(), Some("a.js"));
    }

    #[test]
    fn buffer_roundtrip() {
        let mut engine = SourceMapEngine::create();
        engine.add_indexed_mapping(IndexedMapping {
            generated_line: 1,
            generated_column: 0,
            original_line: Some(1),
            original_column: Some(0),
            source: Some("a.js".to_string()),
            name: Some("foo".to_string()),
        }).unwrap();
        let buf = engine.to_buffer().unwrap();

        let mut restored = SourceMapEngine::from_buffer(&buf).unwrap();
        let found = restored.find_closest_mapping(1, 0).unwrap().unwrap();
        assert_eq!(found.source.as_deref(), Some("a.js"));
        assert_eq!(found.name.as_deref(), Some("foo"));
    }

    #[test]
    fn add_sources_dedups() {
        let mut engine = SourceMapEngine::create();
        let a = engine.add_source("a.js").unwrap();
        let b = engine.add_source("a.js").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn add_names_dedups() {
        let mut engine = SourceMapEngine::create();
        let a = engine.add_name("foo").unwrap();
        let b = engine.add_name("foo").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn positive_line_offset_shifts_generated_line() {
        let mut host = SourceMapEngine::create();
        host.add_indexed_mapping(IndexedMapping {
            generated_line: 1,
            generated_column: 0,
            original_line: Some(1),
            original_column: Some(0),
            source: Some("a.js".to_string()),
            name: None,
        }).unwrap();
        let donor_buf = host.to_buffer().unwrap();

        let mut engine = SourceMapEngine::create();
        engine.add_buffer_mappings(&donor_buf, 10, 0).unwrap();
        let found = engine.find_closest_mapping(11, 0).unwrap().unwrap();
        assert_eq!(found.source.as_deref(), Some("a.js"));
    }

    #[test]
    fn find_closest_on_gap_returns_prior_segment() {
        let mut engine = SourceMapEngine::create();
        engine.add_indexed_mapping(IndexedMapping {
            generated_line: 2,
            generated_column: 0,
            original_line: Some(1),
            original_column: Some(0),
            source: Some("a.js".to_string()),
            name: None,
        }).unwrap();
        let found = engine.find_closest_mapping(5, 0).unwrap().unwrap();
        assert_eq!(found.generated_line, 2);
    }

    #[test]
    fn extends_promotes_original() {
        let mut donor = SourceMapEngine::create();
        donor.add_indexed_mapping(IndexedMapping {
            generated_line: 11,
            generated_column: 3,
            original_line: Some(41),
            original_column: Some(9),
            source: Some("app.ts".to_string()),
            name: None,
        }).unwrap();

        let mut host = SourceMapEngine::create();
        host.add_indexed_mapping(IndexedMapping {
            generated_line: 1,
            generated_column: 0,
            original_line: Some(11),
            original_column: Some(3),
            source: Some("bundle.js".to_string()),
            name: None,
        }).unwrap();

        host.extends(&mut donor).unwrap();
        let found = host.find_closest_mapping(1, 0).unwrap().unwrap();
        assert_eq!(found.source.as_deref(), Some("app.ts"));
        assert_eq!(found.original_line, Some(41));
    }

    #[test]
    fn second_vlq_batch_appends_rather_than_replacing_the_first() {
        let mut engine = SourceMapEngine::create();
        engine.add_vlq_mappings("AAAA", &["a.js".to_string()], None, &[]).unwrap();
        engine
            .add_vlq_mappings_with_offset("AAAA", &["b.js".to_string()], None, &[], 1, 0)
            .unwrap();

        let first = engine.find_closest_mapping(1, 0).unwrap().unwrap();
        assert_eq!(first.source.as_deref(), Some("a.js"));
        let second = engine.find_closest_mapping(2, 0).unwrap().unwrap();
        assert_eq!(second.source.as_deref(), Some("b.js"));
    }

    #[test]
    fn add_indexed_mapping_with_offset_shifts_generated_position() {
        let mut engine = SourceMapEngine::create();
        engine
            .add_indexed_mapping_with_offset(
                IndexedMapping {
                    generated_line: 1,
                    generated_column: 0,
                    original_line: Some(1),
                    original_column: Some(0),
                    source: Some("a.js".to_string()),
                    name: None,
                },
                5,
                0,
            )
            .unwrap();
        let found = engine.find_closest_mapping(6, 0).unwrap().unwrap();
        assert_eq!(found.source.as_deref(), Some("a.js"));
        assert!(engine.find_closest_mapping(1, 0).unwrap().is_none());
    }

    #[test]
    fn vlq_batch_after_indexed_mapping_does_not_discard_it() {
        let mut engine = SourceMapEngine::create();
        engine
            .add_indexed_mapping(IndexedMapping {
                generated_line: 1,
                generated_column: 0,
                original_line: Some(1),
                original_column: Some(0),
                source: Some("a.js".to_string()),
                name: None,
            })
            .unwrap();
        engine
            .add_vlq_mappings_with_offset("AAAA", &["b.js".to_string()], None, &[], 1, 0)
            .unwrap();

        let first = engine.find_closest_mapping(1, 0).unwrap().unwrap();
        assert_eq!(first.source.as_deref(), Some("a.js"));
        let second = engine.find_closest_mapping(2, 0).unwrap().unwrap();
        assert_eq!(second.source.as_deref(), Some("b.js"));
    }

    #[test]
    fn to_vlq_short_circuits_to_raw_cache_without_materializing() {
        let mut engine = SourceMapEngine::create();
        engine.add_vlq_mappings("AAAA,CACA", &["a.js".to_string()], None, &[]).unwrap();
        assert!(matches!(engine.state, State::Raw { .. }));

        let emitted = engine.to_vlq().unwrap();
        assert_eq!(emitted.mappings, "AAAA,CACA");
        assert!(matches!(engine.state, State::Raw { .. }));
    }

    #[test]
    fn use_after_destroy_errors() {
        let mut engine = SourceMapEngine::create();
        engine.destroy();
        let err = engine.add_vlq_mappings("AAAA", &[], None, &[]).unwrap_err();
        assert!(matches!(err, Error::UseAfterDestroy));
    }

    #[test]
    fn out_of_bounds_get_source() {
        let engine = SourceMapEngine::create();
        let err = engine.get_source(0).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
    }
}
