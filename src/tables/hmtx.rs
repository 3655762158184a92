use crate::error::Result;
use crate::stream::Reader;

/// `hmtx` — per-glyph `(advanceWidth, lsb)`. Glyphs beyond `numberOfHMetrics` share the
/// final advance width and carry only their own `lsb` (data model §3, `hmtx` layout).
#[derive(Debug, Clone)]
pub struct HmtxTable {
    advances: Vec<u16>,
    first_lsbs: Vec<i16>,
    trailing_lsbs: Vec<i16>,
}

impl HmtxTable {
    pub fn parse(reader: &mut Reader, num_glyphs: u16, num_h_metrics: u16) -> Result<Self> {
        let mut advances = Vec::with_capacity(num_h_metrics as usize);
        let mut first_lsbs = Vec::with_capacity(num_h_metrics as usize);
        for _ in 0..num_h_metrics {
            advances.push(reader.read_u16()?);
            first_lsbs.push(reader.read_i16()?);
        }

        let trailing_count = num_glyphs.saturating_sub(num_h_metrics) as usize;
        let mut trailing_lsbs = Vec::with_capacity(trailing_count);
        for _ in 0..trailing_count {
            trailing_lsbs.push(reader.read_i16()?);
        }

        Ok(HmtxTable {
            advances,
            first_lsbs,
            trailing_lsbs,
        })
    }

    pub fn advance_width(&self, glyph_id: u16) -> u16 {
        let idx = glyph_id as usize;
        if idx < self.advances.len() {
            self.advances[idx]
        } else {
            self.advances.last().copied().unwrap_or(0)
        }
    }

    pub fn left_side_bearing(&self, glyph_id: u16) -> i16 {
        let idx = glyph_id as usize;
        if idx < self.first_lsbs.len() {
            self.first_lsbs[idx]
        } else {
            self.trailing_lsbs
                .get(idx - self.first_lsbs.len())
                .copied()
                .unwrap_or(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut d = Vec::new();
        // two full metrics, then one trailing lsb-only glyph
        d.extend_from_slice(&600u16.to_be_bytes());
        d.extend_from_slice(&10i16.to_be_bytes());
        d.extend_from_slice(&700u16.to_be_bytes());
        d.extend_from_slice(&(-5i16).to_be_bytes());
        d.extend_from_slice(&3i16.to_be_bytes());
        d
    }

    #[test]
    fn trailing_glyphs_share_last_advance() {
        let d = sample();
        let mut r = Reader::new(&d);
        let hmtx = HmtxTable::parse(&mut r, 3, 2).unwrap();
        assert_eq!(hmtx.advance_width(0), 600);
        assert_eq!(hmtx.advance_width(1), 700);
        assert_eq!(hmtx.advance_width(2), 700);
        assert_eq!(hmtx.left_side_bearing(1), -5);
        assert_eq!(hmtx.left_side_bearing(2), 3);
    }

    #[test]
    fn out_of_range_glyph_reuses_last_advance() {
        let d = sample();
        let mut r = Reader::new(&d);
        let hmtx = HmtxTable::parse(&mut r, 3, 2).unwrap();
        assert_eq!(hmtx.advance_width(99), 700);
    }
}
