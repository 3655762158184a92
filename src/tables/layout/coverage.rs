use crate::error::Result;
use crate::stream::Reader;

/// OpenType Coverage table (formats 1 and 2), shared by `GSUB` and `GPOS`.
#[derive(Debug, Clone)]
pub enum Coverage {
    Format1 { glyphs: Vec<u16> },
    Format2 { ranges: Vec<RangeRecord> },
}

#[derive(Debug, Clone, Copy)]
pub struct RangeRecord {
    pub start: u16,
    pub end: u16,
    pub start_coverage_index: u16,
}

impl Coverage {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let format = reader.read_u16()?;
        match format {
            1 => {
                let count = reader.read_u16()?;
                let mut glyphs = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    glyphs.push(reader.read_u16()?);
                }
                Ok(Coverage::Format1 { glyphs })
            }
            _ => {
                let count = reader.read_u16()?;
                let mut ranges = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    ranges.push(RangeRecord {
                        start: reader.read_u16()?,
                        end: reader.read_u16()?,
                        start_coverage_index: reader.read_u16()?,
                    });
                }
                Ok(Coverage::Format2 { ranges })
            }
        }
    }

    /// Coverage index of `glyph_id`, if covered.
    pub fn index_of(&self, glyph_id: u16) -> Option<u16> {
        match self {
            Coverage::Format1 { glyphs } => {
                glyphs.iter().position(|&g| g == glyph_id).map(|i| i as u16)
            }
            Coverage::Format2 { ranges } => ranges.iter().find_map(|r| {
                if glyph_id >= r.start && glyph_id <= r.end {
                    Some(r.start_coverage_index + (glyph_id - r.start))
                } else {
                    None
                }
            }),
        }
    }

    pub fn contains(&self, glyph_id: u16) -> bool {
        self.index_of(glyph_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format1_indexes_by_position() {
        let mut d = Vec::new();
        d.extend_from_slice(&1u16.to_be_bytes());
        d.extend_from_slice(&3u16.to_be_bytes());
        for g in [10u16, 20, 30] {
            d.extend_from_slice(&g.to_be_bytes());
        }
        let mut r = Reader::new(&d);
        let cov = Coverage::parse(&mut r).unwrap();
        assert_eq!(cov.index_of(20), Some(1));
        assert_eq!(cov.index_of(99), None);
    }

    #[test]
    fn format2_indexes_by_range() {
        let mut d = Vec::new();
        d.extend_from_slice(&2u16.to_be_bytes());
        d.extend_from_slice(&1u16.to_be_bytes());
        d.extend_from_slice(&100u16.to_be_bytes());
        d.extend_from_slice(&110u16.to_be_bytes());
        d.extend_from_slice(&0u16.to_be_bytes());
        let mut r = Reader::new(&d);
        let cov = Coverage::parse(&mut r).unwrap();
        assert_eq!(cov.index_of(105), Some(5));
    }
}
