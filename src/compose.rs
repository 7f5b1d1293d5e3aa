//! The `extends` composition operator (§4.6): re-anchor a host map's
//! originals through a donor map's generated→original relation.
//!
//! A host segment's original position is treated as a generated
//! position into the donor; the donor's closest mapping there replaces
//! the host's original side. This is how a minifier's map composes
//! with a bundler's map to produce one map pointing straight at the
//! original hand-written source.

use crate::intern::{NameTable, SourceTable};
use crate::table::MappingTable;

/// Re-anchor every mapped segment in `host_table` through `donor_table`,
/// in place.
///
/// Two passes deliberately: the first only reads `host_table` and
/// `donor_*`, building a plan of `(line, pos, new_fields)` updates; the
/// second applies them. Interleaving the read (`iter_indexed`) with the
/// write (`set_original`) would borrow `host_table` both ways at once.
pub fn extends(
    host_table: &mut MappingTable,
    host_sources: &mut SourceTable,
    host_names: &mut NameTable,
    donor_table: &MappingTable,
    donor_sources: &SourceTable,
    donor_names: &NameTable,
) {
    let mut updates = Vec::new();

    for (line, pos, seg) in host_table.iter_indexed() {
        let (Some(_), Some(orig_line), Some(orig_col)) = (seg.source, seg.original_line, seg.original_column) else {
            continue;
        };

        let Some(donor_seg) = donor_table.find_closest(orig_line, orig_col) else {
            continue;
        };
        let Some(donor_source_id) = donor_seg.source else {
            continue;
        };
        let Some(donor_path) = donor_sources.get(donor_source_id) else {
            continue;
        };

        let new_source_id = host_sources.intern(donor_path);
        let donor_content = donor_sources.get_content(donor_source_id);
        if !donor_content.is_empty() {
            host_sources.set_content_by_id(new_source_id, donor_content);
        }

        // §4.6: `h.name ← (d.name != -1 ? intern(D.names[d.name]) : h.name)` —
        // a nameless donor segment leaves the host's own name untouched
        // rather than wiping it.
        let new_name_id = match donor_seg.name.and_then(|nid| donor_names.get(nid)) {
            Some(donor_name) => Some(host_names.intern(donor_name)),
            None => seg.name,
        };

        updates.push((
            line,
            pos,
            new_source_id,
            donor_seg.original_line,
            donor_seg.original_column,
            new_name_id,
        ));
    }

    for (line, pos, source, original_line, original_column, name) in updates {
        host_table.set_original(line, pos, Some(source), original_line, original_column, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;

    #[test]
    fn reanchors_through_donor() {
        let mut host_table = MappingTable::new();
        let mut host_sources = SourceTable::new();
        let mut host_names = NameTable::new();
        let bundle_id = host_sources.intern("bundle.js");
        host_table.append(Segment::new(0, 0, Some(bundle_id), Some(10), Some(2), None));

        let mut donor_table = MappingTable::new();
        let mut donor_sources = SourceTable::new();
        let donor_names = NameTable::new();
        let original_id = donor_sources.intern("app.ts");
        donor_table.append(Segment::new(10, 2, Some(original_id), Some(40), Some(8), None));

        extends(&mut host_table, &mut host_sources, &mut host_names, &donor_table, &donor_sources, &donor_names);

        let reanchored = host_table.get(0, 0).unwrap();
        let source_path = host_sources.get(reanchored.source.unwrap()).unwrap();
        assert_eq!(source_path, "app.ts");
        assert_eq!(reanchored.original_line, Some(40));
        assert_eq!(reanchored.original_column, Some(8));
    }

    #[test]
    fn leaves_unmapped_segments_untouched() {
        let mut host_table = MappingTable::new();
        let mut host_sources = SourceTable::new();
        let mut host_names = NameTable::new();
        host_table.append(Segment::unmapped(0, 0));

        let donor_table = MappingTable::new();
        let donor_sources = SourceTable::new();
        let donor_names = NameTable::new();

        extends(&mut host_table, &mut host_sources, &mut host_names, &donor_table, &donor_sources, &donor_names);

        assert_eq!(host_table.get(0, 0).unwrap().source, None);
    }

    #[test]
    fn carries_donor_content_when_host_lacks_it() {
        let mut host_table = MappingTable::new();
        let mut host_sources = SourceTable::new();
        let mut host_names = NameTable::new();
        let bundle_id = host_sources.intern("bundle.js");
        host_table.append(Segment::new(0, 0, Some(bundle_id), Some(1), Some(1), None));

        let mut donor_table = MappingTable::new();
        let mut donor_sources = SourceTable::new();
        let donor_names = NameTable::new();
        donor_sources.set_content("app.ts", "const x = 1;");
        donor_table.append(Segment::new(1, 1, Some(donor_sources.find("app.ts").unwrap()), Some(0), Some(0), None));

        extends(&mut host_table, &mut host_sources, &mut host_names, &donor_table, &donor_sources, &donor_names);

        let reanchored = host_table.get(0, 0).unwrap();
        assert_eq!(host_sources.get_content(reanchored.source.unwrap()), "const x = 1;");
    }

    #[test]
    fn preserves_host_name_when_donor_segment_has_none() {
        let mut host_table = MappingTable::new();
        let mut host_sources = SourceTable::new();
        let mut host_names = NameTable::new();
        let bundle_id = host_sources.intern("bundle.js");
        let render_id = host_names.intern("render");
        host_table.append(Segment::new(0, 0, Some(bundle_id), Some(10), Some(2), Some(render_id)));

        let mut donor_table = MappingTable::new();
        let mut donor_sources = SourceTable::new();
        let donor_names = NameTable::new();
        let original_id = donor_sources.intern("app.ts");
        // Donor segment re-anchors the original side but carries no name.
        donor_table.append(Segment::new(10, 2, Some(original_id), Some(40), Some(8), None));

        extends(&mut host_table, &mut host_sources, &mut host_names, &donor_table, &donor_sources, &donor_names);

        let reanchored = host_table.get(0, 0).unwrap();
        let source_path = host_sources.get(reanchored.source.unwrap()).unwrap();
        assert_eq!(source_path, "app.ts");
        assert_eq!(reanchored.original_line, Some(40));
        let name = host_names.get(reanchored.name.unwrap()).unwrap();
        assert_eq!(name, "render");
    }
}
