use crate::error::Result;
use crate::stream::Reader;
use crate::tables::Table;

/// `maxp` — maximum profile. Only `numGlyphs` is used by this crate; the
/// version-1.0 hinting-related maxima are irrelevant since we never hint.
#[derive(Debug, Clone, Copy)]
pub struct MaxpTable {
    pub num_glyphs: u16,
}

impl Table for MaxpTable {
    fn parse(reader: &mut Reader, _length: u32) -> Result<Self> {
        let _version = reader.read_fixed()?;
        let num_glyphs = reader.read_u16()?;
        Ok(MaxpTable { num_glyphs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_num_glyphs() {
        let mut d = Vec::new();
        d.extend_from_slice(&0x00005000u32.to_be_bytes()); // version 0.5
        d.extend_from_slice(&421u16.to_be_bytes());
        let mut r = Reader::new(&d);
        let maxp = MaxpTable::parse(&mut r, d.len() as u32).unwrap();
        assert_eq!(maxp.num_glyphs, 421);
    }
}
