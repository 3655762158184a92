use crate::error::{FontError, Result};
use crate::stream::Reader;

/// `loca` — per-glyph offsets into `glyf`. `offsets[i]..offsets[i+1]` bounds glyph `i`;
/// equal consecutive offsets mean an empty glyph (invariant (b) in the data model).
#[derive(Debug, Clone)]
pub enum LocaTable {
    Short(Vec<u16>),
    Long(Vec<u32>),
}

impl LocaTable {
    pub fn parse(reader: &mut Reader, num_glyphs: u16, is_long: bool) -> Result<Self> {
        let count = num_glyphs as usize + 1;
        if is_long {
            let mut offsets = Vec::with_capacity(count);
            for _ in 0..count {
                offsets.push(reader.read_u32()?);
            }
            Ok(LocaTable::Long(offsets))
        } else {
            let mut offsets = Vec::with_capacity(count);
            for _ in 0..count {
                offsets.push(reader.read_u16()?);
            }
            Ok(LocaTable::Short(offsets))
        }
    }

    /// Byte offset of glyph `index` into `glyf`, already un-halved for the short format.
    pub fn offset(&self, index: usize) -> Result<u32> {
        match self {
            LocaTable::Short(offsets) => offsets
                .get(index)
                .map(|&o| o as u32 * 2)
                .ok_or(FontError::BadGlyphId(index as u32)),
            LocaTable::Long(offsets) => offsets
                .get(index)
                .copied()
                .ok_or(FontError::BadGlyphId(index as u32)),
        }
    }
}
