//! Binary snapshot codec (§4.5): a self-describing, versioned blob
//! holding the full engine state (sources, contents, names, segments)
//! for cross-process caching, without redoing VLQ text encoding.
//!
//! The wire format uses a hand-rolled layout (magic bytes, little-
//! endian length-prefixed fields, a version guard) rather than a
//! generic serializer — fixed-width integers are exactly what §4.5
//! asks for.

use crate::error::{Error, Result};
use crate::segment::DecodedSegment;

const MAGIC: &[u8; 4] = b"SME1";
const VERSION: u32 = 1;

/// Plain decoded snapshot contents, independent of any engine — the
/// donor side of `addBufferMappings` and the source of truth for
/// `fromBuffer`.
pub struct DecodedSnapshot {
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    /// Segments with donor-local (0-based) generated positions and
    /// donor-local source/name ids — the caller biases and offsets
    /// these when merging.
    pub segments: Vec<DecodedSegment>,
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

fn write_option_u32(buf: &mut Vec<u8>, v: Option<u32>) {
    match v {
        Some(n) => {
            buf.push(1);
            write_u32(buf, n);
        }
        None => buf.push(0),
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::incompatible_snapshot("truncated buffer"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::incompatible_snapshot(format!("invalid utf-8: {e}")))
    }

    fn option_u32(&mut self) -> Result<Option<u32>> {
        let flag = self.bytes(1)?[0];
        match flag {
            0 => Ok(None),
            1 => Ok(Some(self.u32()?)),
            other => Err(Error::incompatible_snapshot(format!("bad option flag {other}"))),
        }
    }
}

/// Serialize the full state of an engine into a versioned binary blob.
///
/// `segments` must already be in ascending generated-line order (the
/// engine's table iteration order); this function does not re-sort.
pub fn encode(sources: &[String], sources_content: &[String], names: &[String], segments: &[DecodedSegment]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    write_u32(&mut buf, VERSION);

    write_u32(&mut buf, sources.len() as u32);
    for (path, content) in sources.iter().zip(sources_content.iter()) {
        write_string(&mut buf, path);
        write_string(&mut buf, content);
    }

    write_u32(&mut buf, names.len() as u32);
    for name in names {
        write_string(&mut buf, name);
    }

    write_u32(&mut buf, segments.len() as u32);
    for seg in segments {
        write_u32(&mut buf, seg.generated_line);
        write_u32(&mut buf, seg.generated_column);
        write_option_u32(&mut buf, seg.source);
        write_option_u32(&mut buf, seg.original_line);
        write_option_u32(&mut buf, seg.original_column);
        write_option_u32(&mut buf, seg.name);
    }

    buf
}

/// Parse a binary snapshot blob. Rejects unknown versions and
/// truncated buffers with `IncompatibleSnapshot` (§7).
pub fn decode(blob: &[u8]) -> Result<DecodedSnapshot> {
    let mut reader = Reader::new(blob);

    let magic = reader.bytes(4)?;
    if magic != MAGIC {
        return Err(Error::incompatible_snapshot("bad magic bytes"));
    }

    let version = reader.u32()?;
    if version != VERSION {
        return Err(Error::incompatible_snapshot(format!(
            "unsupported snapshot version {version} (expected {VERSION})"
        )));
    }

    let source_count = reader.u32()? as usize;
    let mut sources = Vec::with_capacity(source_count);
    let mut sources_content = Vec::with_capacity(source_count);
    for _ in 0..source_count {
        sources.push(reader.string()?);
        sources_content.push(reader.string()?);
    }

    let name_count = reader.u32()? as usize;
    let mut names = Vec::with_capacity(name_count);
    for _ in 0..name_count {
        names.push(reader.string()?);
    }

    let segment_count = reader.u32()? as usize;
    let mut segments = Vec::with_capacity(segment_count);
    for _ in 0..segment_count {
        let generated_line = reader.u32()?;
        let generated_column = reader.u32()?;
        let source = reader.option_u32()?;
        let original_line = reader.option_u32()?;
        let original_column = reader.option_u32()?;
        let name = reader.option_u32()?;
        segments.push(DecodedSegment {
            generated_line,
            generated_column,
            source,
            original_line,
            original_column,
            name,
        });
    }

    Ok(DecodedSnapshot { sources, sources_content, names, segments })
}
