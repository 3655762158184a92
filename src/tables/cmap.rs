use std::collections::HashMap;

use crate::error::{FontError, Result};
use crate::stream::Reader;
use crate::tables::Table;

/// `cmap` — codepoint to glyph id mapping. We keep every subtable we can parse and
/// pick the best one at lookup time by platform/encoding preference (data model §3).
#[derive(Debug, Clone)]
pub struct CmapTable {
    subtables: Vec<(EncodingRecord, CmapSubtable)>,
}

#[derive(Debug, Clone, Copy)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
}

#[derive(Debug, Clone)]
enum CmapSubtable {
    Format0(Format0),
    Format4(Format4),
    Format6(Format6),
    Format12(Format12),
    Unsupported(u16),
}

#[derive(Debug, Clone)]
struct Format0 {
    glyph_id_array: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Format4 {
    end_codes: Vec<u16>,
    start_codes: Vec<u16>,
    id_deltas: Vec<i16>,
    id_range_offsets: Vec<u16>,
    glyph_id_array: Vec<u16>,
}

#[derive(Debug, Clone)]
struct Format6 {
    first_code: u16,
    glyph_id_array: Vec<u16>,
}

#[derive(Debug, Clone)]
struct Format12 {
    groups: Vec<SequentialMapGroup>,
}

#[derive(Debug, Clone, Copy)]
struct SequentialMapGroup {
    start_char_code: u32,
    end_char_code: u32,
    start_glyph_code: u32,
}

impl Format0 {
    fn lookup(&self, code: u32) -> Option<u16> {
        if code > 0xFF {
            return None;
        }
        self.glyph_id_array.get(code as usize).map(|&g| g as u16)
    }
}

impl Format4 {
    fn lookup(&self, code: u32) -> Option<u16> {
        if code > 0xFFFF {
            return None;
        }
        let code = code as u16;
        let seg_count = self.end_codes.len();
        if seg_count == 0 {
            return None;
        }

        let mut lo = 0usize;
        let mut hi = seg_count - 1;
        loop {
            let mid = (lo + hi) / 2;
            if code > self.end_codes[mid] {
                if mid == hi {
                    return None;
                }
                lo = mid + 1;
            } else if code < self.start_codes[mid] {
                if mid == lo {
                    return None;
                }
                hi = mid - 1;
            } else {
                let start_code = self.start_codes[mid];
                let id_delta = self.id_deltas[mid] as i32;
                let id_range_offset = self.id_range_offsets[mid];

                if id_range_offset == 0 {
                    return Some((code as i32).wrapping_add(id_delta) as u16);
                }

                let offset_index = id_range_offset as usize / 2
                    + (code as usize - start_code as usize)
                    - (seg_count - mid);
                let glyph_id = *self.glyph_id_array.get(offset_index)?;
                if glyph_id == 0 {
                    return None;
                }
                return Some((glyph_id as i32).wrapping_add(id_delta) as u16);
            }
        }
    }
}

impl Format6 {
    fn lookup(&self, code: u32) -> Option<u16> {
        let code = u16::try_from(code).ok()?;
        if code < self.first_code {
            return None;
        }
        let index = (code - self.first_code) as usize;
        self.glyph_id_array.get(index).copied()
    }
}

impl Format12 {
    fn lookup(&self, code: u32) -> Option<u16> {
        let mut lo = 0usize;
        let mut hi = self.groups.len().checked_sub(1)?;
        loop {
            let mid = (lo + hi) / 2;
            let group = &self.groups[mid];
            if code < group.start_char_code {
                if mid == lo {
                    return None;
                }
                hi = mid - 1;
            } else if code > group.end_char_code {
                if mid == hi {
                    return None;
                }
                lo = mid + 1;
            } else {
                return Some((group.start_glyph_code + (code - group.start_char_code)) as u16);
            }
        }
    }
}

impl CmapSubtable {
    fn lookup(&self, code: u32) -> Option<u16> {
        match self {
            CmapSubtable::Format0(f) => f.lookup(code),
            CmapSubtable::Format4(f) => f.lookup(code),
            CmapSubtable::Format6(f) => f.lookup(code),
            CmapSubtable::Format12(f) => f.lookup(code),
            CmapSubtable::Unsupported(_) => None,
        }
    }
}

/// Preference order for subtable selection: Unicode full repertoire first, then the
/// BMP-only subtable, then symbol and Mac Roman fallbacks.
const PREFERRED_ENCODINGS: [(u16, u16); 4] = [
    (3, 10), // Windows, Unicode full repertoire (format 12)
    (3, 1),  // Windows, Unicode BMP (format 4)
    (3, 0),  // Windows, Symbol
    (1, 0),  // Mac, Roman
];

impl CmapTable {
    fn best_subtable(&self) -> Option<&CmapSubtable> {
        for (platform_id, encoding_id) in PREFERRED_ENCODINGS {
            if let Some((_, sub)) = self
                .subtables
                .iter()
                .find(|(rec, _)| rec.platform_id == platform_id && rec.encoding_id == encoding_id)
            {
                return Some(sub);
            }
        }
        self.subtables.first().map(|(_, sub)| sub)
    }

    pub fn glyph_index(&self, c: char) -> Option<u16> {
        self.best_subtable().and_then(|sub| sub.lookup(c as u32))
    }

    /// All codepoints that map to `glyph_id` across every parsed subtable, for
    /// inspection/debugging rather than the hot shaping path.
    pub fn codepoints_for_glyph(&self, glyph_id: u16) -> Vec<u32> {
        let mut map: HashMap<u32, ()> = HashMap::new();
        if let Some(sub) = self.best_subtable() {
            for code in 0u32..=0x10FFFF {
                if sub.lookup(code) == Some(glyph_id) {
                    map.insert(code, ());
                }
            }
        }
        let mut out: Vec<u32> = map.into_keys().collect();
        out.sort_unstable();
        out
    }
}

impl Table for CmapTable {
    fn parse(reader: &mut Reader, _length: u32) -> Result<Self> {
        let table_start = reader.position();
        let full = reader.sub_reader(0, reader.remaining() + table_start)?;

        let _version = reader.read_u16()?;
        let num_tables = reader.read_u16()?;

        let mut records = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            records.push((
                EncodingRecord {
                    platform_id: reader.read_u16()?,
                    encoding_id: reader.read_u16()?,
                },
                reader.read_u32()?,
            ));
        }

        let mut subtables = Vec::with_capacity(records.len());
        for (record, offset) in records {
            let mut sub = full.sub_reader(offset as usize, full.remaining())?;
            let format = sub.read_u16()?;
            let parsed = match format {
                0 => {
                    let _length = sub.read_u16()?;
                    let _language = sub.read_u16()?;
                    let glyph_id_array = sub.read_bytes(256)?.to_vec();
                    CmapSubtable::Format0(Format0 { glyph_id_array })
                }
                4 => {
                    let _length = sub.read_u16()?;
                    let _language = sub.read_u16()?;
                    let seg_count_x2 = sub.read_u16()?;
                    let seg_count = (seg_count_x2 / 2) as usize;
                    let _search_range = sub.read_u16()?;
                    let _entry_selector = sub.read_u16()?;
                    let _range_shift = sub.read_u16()?;

                    let mut end_codes = Vec::with_capacity(seg_count);
                    for _ in 0..seg_count {
                        end_codes.push(sub.read_u16()?);
                    }
                    let _reserved_pad = sub.read_u16()?;
                    let mut start_codes = Vec::with_capacity(seg_count);
                    for _ in 0..seg_count {
                        start_codes.push(sub.read_u16()?);
                    }
                    let mut id_deltas = Vec::with_capacity(seg_count);
                    for _ in 0..seg_count {
                        id_deltas.push(sub.read_i16()?);
                    }
                    let id_range_offset_pos = sub.position();
                    let mut id_range_offsets = Vec::with_capacity(seg_count);
                    for _ in 0..seg_count {
                        id_range_offsets.push(sub.read_u16()?);
                    }
                    let glyph_id_array_start = sub.position();
                    let _ = id_range_offset_pos;
                    let glyph_id_array_len = sub.remaining() / 2;
                    let mut glyph_id_array = Vec::with_capacity(glyph_id_array_len);
                    for _ in 0..glyph_id_array_len {
                        glyph_id_array.push(sub.read_u16()?);
                    }
                    let _ = glyph_id_array_start;

                    CmapSubtable::Format4(Format4 {
                        end_codes,
                        start_codes,
                        id_deltas,
                        id_range_offsets,
                        glyph_id_array,
                    })
                }
                6 => {
                    let _length = sub.read_u16()?;
                    let _language = sub.read_u16()?;
                    let first_code = sub.read_u16()?;
                    let entry_count = sub.read_u16()?;
                    let mut glyph_id_array = Vec::with_capacity(entry_count as usize);
                    for _ in 0..entry_count {
                        glyph_id_array.push(sub.read_u16()?);
                    }
                    CmapSubtable::Format6(Format6 {
                        first_code,
                        glyph_id_array,
                    })
                }
                12 => {
                    let _reserved = sub.read_u16()?;
                    let _length = sub.read_u32()?;
                    let _language = sub.read_u32()?;
                    let num_groups = sub.read_u32()?;
                    let mut groups = Vec::with_capacity(num_groups as usize);
                    for _ in 0..num_groups {
                        groups.push(SequentialMapGroup {
                            start_char_code: sub.read_u32()?,
                            end_char_code: sub.read_u32()?,
                            start_glyph_code: sub.read_u32()?,
                        });
                    }
                    CmapSubtable::Format12(Format12 { groups })
                }
                other => CmapSubtable::Unsupported(other),
            };
            subtables.push((record, parsed));
        }

        if subtables.is_empty() {
            return Err(FontError::BadCmapSubtable(0));
        }

        Ok(CmapTable { subtables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format4_font() -> Vec<u8> {
        // header
        let mut d = Vec::new();
        d.extend_from_slice(&0u16.to_be_bytes()); // version
        d.extend_from_slice(&1u16.to_be_bytes()); // numTables
        d.extend_from_slice(&3u16.to_be_bytes()); // platform windows
        d.extend_from_slice(&1u16.to_be_bytes()); // encoding unicode bmp
        d.extend_from_slice(&12u32.to_be_bytes()); // offset to subtable

        // format 4 subtable, single segment mapping 'A'(0x41)->5
        let seg_count: u16 = 2; // one real segment + terminator 0xFFFF
        let mut sub = Vec::new();
        sub.extend_from_slice(&4u16.to_be_bytes()); // format
        sub.extend_from_slice(&0u16.to_be_bytes()); // length placeholder
        sub.extend_from_slice(&0u16.to_be_bytes()); // language
        sub.extend_from_slice(&(seg_count * 2).to_be_bytes());
        sub.extend_from_slice(&0u16.to_be_bytes()); // searchRange
        sub.extend_from_slice(&0u16.to_be_bytes()); // entrySelector
        sub.extend_from_slice(&0u16.to_be_bytes()); // rangeShift
        sub.extend_from_slice(&0x0041u16.to_be_bytes()); // endCode[0]
        sub.extend_from_slice(&0xFFFFu16.to_be_bytes()); // endCode[1]
        sub.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
        sub.extend_from_slice(&0x0041u16.to_be_bytes()); // startCode[0]
        sub.extend_from_slice(&0xFFFFu16.to_be_bytes()); // startCode[1]
        sub.extend_from_slice(&(5i16 - 0x41).to_be_bytes()); // idDelta[0]
        sub.extend_from_slice(&1i16.to_be_bytes()); // idDelta[1]
        sub.extend_from_slice(&0u16.to_be_bytes()); // idRangeOffset[0]
        sub.extend_from_slice(&0u16.to_be_bytes()); // idRangeOffset[1]

        d.extend_from_slice(&sub);
        d
    }

    #[test]
    fn format4_maps_codepoint_to_glyph() {
        let data = format4_font();
        let mut r = Reader::new(&data);
        let cmap = CmapTable::parse(&mut r, data.len() as u32).unwrap();
        assert_eq!(cmap.glyph_index('A'), Some(5));
        assert_eq!(cmap.glyph_index('\u{1}'), None);
    }
}
