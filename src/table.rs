//! The indexed mapping table (§4.3): segments grouped by generated
//! line, each line kept in non-decreasing generated-column order.

use crate::segment::{DecodedSegment, Segment};
use crate::vlq::{encode_mappings, EncoderLine};

/// Ordered-by-generated-position container of segments.
///
/// Storage is a flat `Vec` of per-line buckets plus a sorted index of
/// non-empty line numbers, giving `find_closest` the O(log L) line
/// location §4.3 calls for instead of a backward linear scan.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    lines: Vec<Vec<Segment>>,
    non_empty_lines: Vec<u32>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest generated line with at least one segment, or `None` if
    /// the table is empty.
    pub fn highest_non_empty_line(&self) -> Option<u32> {
        self.non_empty_lines.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty_lines.is_empty()
    }

    fn ensure_line(&mut self, line: u32) -> &mut Vec<Segment> {
        let line = line as usize;
        if self.lines.len() <= line {
            self.lines.resize(line + 1, Vec::new());
        }
        &mut self.lines[line]
    }

    fn mark_non_empty(&mut self, line: u32) {
        if let Err(pos) = self.non_empty_lines.binary_search(&line) {
            self.non_empty_lines.insert(pos, line);
        }
    }

    /// Append one segment, placing it at the end of its generated line.
    ///
    /// Stable insertion (§4.3, reference behavior): if `seg`'s column is
    /// smaller than the line's last segment, it is inserted in order
    /// rather than rejected — donor VLQ may legitimately interleave
    /// when composed with offsets. Among equal-column segments, the
    /// most recently appended ends up last, which is what
    /// [`Self::find_closest`]'s tie-break (§4.3 point 3) relies on.
    pub fn append(&mut self, seg: Segment) {
        let line = seg.generated_line;
        let bucket = self.ensure_line(line);
        let pos = bucket.partition_point(|s| s.generated_column <= seg.generated_column);
        bucket.insert(pos, seg);
        self.mark_non_empty(line);
    }

    /// Merge a batch of donor-local decoded segments, applying the
    /// offset semantics of §4.3: `lineOffset` shifts every segment's
    /// generated line; `columnOffset` shifts the generated column only
    /// for segments whose *donor-local* generated line was 0 (the
    /// donor's first line, which is what concatenation-style composition
    /// needs to align against the host's existing last line).
    pub fn merge(&mut self, segments: impl IntoIterator<Item = DecodedSegment>, line_offset: u32, column_offset: u32) {
        for seg in segments {
            let line = seg.generated_line + line_offset;
            let column = if seg.generated_line == 0 {
                seg.generated_column + column_offset
            } else {
                seg.generated_column
            };
            self.append(Segment::new(
                line,
                column,
                seg.source,
                seg.original_line,
                seg.original_column,
                seg.name,
            ));
        }
    }

    /// Nearest-neighbor lookup (§4.3): locate the largest non-empty
    /// line `<= gLine`; within it, the greatest-column segment with
    /// `column <= gCol` if the line matches exactly, else the line's
    /// last segment.
    pub fn find_closest(&self, g_line: u32, g_col: u32) -> Option<&Segment> {
        let idx = self.non_empty_lines.partition_point(|&l| l <= g_line);
        if idx == 0 {
            return None;
        }
        let line = self.non_empty_lines[idx - 1];
        let bucket = &self.lines[line as usize];

        if line == g_line {
            let pos = bucket.partition_point(|s| s.generated_column <= g_col);
            if pos == 0 {
                // The queried line exists but every segment on it starts
                // after g_col: fall back to the previous non-empty line,
                // mirroring "largest non-empty line <= gLine" when this
                // line's own segments don't qualify.
                if idx < 2 {
                    return None;
                }
                let prev_line = self.non_empty_lines[idx - 2];
                return self.lines[prev_line as usize].last();
            }
            bucket.get(pos - 1)
        } else {
            bucket.last()
        }
    }

    /// Read a segment by its (line, position-within-line) coordinates.
    pub fn get(&self, line: u32, pos: u32) -> Option<&Segment> {
        self.lines.get(line as usize)?.get(pos as usize)
    }

    /// Overwrite the original-side fields of the segment at
    /// `(line, pos)`. Used by [`crate::compose`] to re-anchor originals
    /// without touching the generated side or disturbing column order
    /// (the generated column is never modified, so re-sorting is never
    /// needed).
    pub fn set_original(
        &mut self,
        line: u32,
        pos: u32,
        source: Option<u32>,
        original_line: Option<u32>,
        original_column: Option<u32>,
        name: Option<u32>,
    ) {
        if let Some(seg) = self.lines.get_mut(line as usize).and_then(|b| b.get_mut(pos as usize)) {
            let updated = Segment::new(seg.generated_line, seg.generated_column, source, original_line, original_column, name);
            *seg = updated;
        }
    }

    /// Iterate every segment with its `(line, pos)` coordinates, in
    /// document order. Coordinates are only meaningful as arguments to
    /// [`Self::set_original`] — they are not stable across mutation.
    pub fn iter_indexed(&self) -> impl Iterator<Item = (u32, u32, Segment)> + '_ {
        self.lines.iter().enumerate().flat_map(|(line, bucket)| {
            bucket
                .iter()
                .enumerate()
                .map(move |(pos, seg)| (line as u32, pos as u32, *seg))
        })
    }

    /// Total segment count across all lines.
    pub fn len(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    /// Re-emit this table as a `mappings` string (§4.1's encoder
    /// contract). Trailing empty lines beyond the highest non-empty
    /// line are trimmed (§9's pinned answer to the trailing-
    /// empty-lines open question).
    pub fn to_vlq(&self) -> String {
        let Some(highest) = self.highest_non_empty_line() else {
            return String::new();
        };
        let owned: Vec<&[Segment]> = (0..=highest as usize)
            .map(|i| self.lines.get(i).map(Vec::as_slice).unwrap_or(&[]))
            .collect();
        let lines: Vec<EncoderLine<'_>> = owned.into_iter().map(|segments| EncoderLine { segments }).collect();
        encode_mappings(&lines)
    }
}
