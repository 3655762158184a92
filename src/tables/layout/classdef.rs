use crate::error::Result;
use crate::stream::Reader;

/// OpenType ClassDef table (formats 1 and 2), shared by `GSUB` and `GPOS`.
#[derive(Debug, Clone)]
pub enum ClassDef {
    Format1 { start_glyph: u16, classes: Vec<u16> },
    Format2 { ranges: Vec<ClassRangeRecord> },
}

#[derive(Debug, Clone, Copy)]
pub struct ClassRangeRecord {
    pub start: u16,
    pub end: u16,
    pub class: u16,
}

impl ClassDef {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let format = reader.read_u16()?;
        match format {
            1 => {
                let start_glyph = reader.read_u16()?;
                let count = reader.read_u16()?;
                let mut classes = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    classes.push(reader.read_u16()?);
                }
                Ok(ClassDef::Format1 { start_glyph, classes })
            }
            _ => {
                let count = reader.read_u16()?;
                let mut ranges = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    ranges.push(ClassRangeRecord {
                        start: reader.read_u16()?,
                        end: reader.read_u16()?,
                        class: reader.read_u16()?,
                    });
                }
                Ok(ClassDef::Format2 { ranges })
            }
        }
    }

    pub fn class_of(&self, glyph_id: u16) -> u16 {
        match self {
            ClassDef::Format1 { start_glyph, classes } => {
                if glyph_id < *start_glyph {
                    return 0;
                }
                let idx = (glyph_id - start_glyph) as usize;
                classes.get(idx).copied().unwrap_or(0)
            }
            ClassDef::Format2 { ranges } => ranges
                .iter()
                .find(|r| glyph_id >= r.start && glyph_id <= r.end)
                .map(|r| r.class)
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format1_offsets_from_start_glyph() {
        let mut d = Vec::new();
        d.extend_from_slice(&1u16.to_be_bytes());
        d.extend_from_slice(&50u16.to_be_bytes()); // startGlyph
        d.extend_from_slice(&3u16.to_be_bytes());
        for c in [1u16, 2, 1] {
            d.extend_from_slice(&c.to_be_bytes());
        }
        let mut r = Reader::new(&d);
        let cd = ClassDef::parse(&mut r).unwrap();
        assert_eq!(cd.class_of(51), 2);
        assert_eq!(cd.class_of(49), 0);
    }
}
