use crate::error::Result;
use crate::stream::Reader;
use crate::tables::Table;

/// `hhea` — horizontal header: line metrics and the `hmtx` split point.
#[derive(Debug, Clone, Copy)]
pub struct HheaTable {
    pub ascent: i16,
    pub descent: i16,
    pub line_gap: i16,
    pub number_of_h_metrics: u16,
}

impl HheaTable {
    /// Font-unit line height: `ascent - descent + lineGap`.
    pub fn line_height(&self) -> i32 {
        self.ascent as i32 - self.descent as i32 + self.line_gap as i32
    }
}

impl Table for HheaTable {
    fn parse(reader: &mut Reader, _length: u32) -> Result<Self> {
        let _table_version = reader.read_fixed()?;
        let ascent = reader.read_i16()?;
        let descent = reader.read_i16()?;
        let line_gap = reader.read_i16()?;
        reader.skip(2 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2)?; // advanceWidthMax .. metricDataFormat
        let number_of_h_metrics = reader.read_u16()?;

        Ok(HheaTable {
            ascent,
            descent,
            line_gap,
            number_of_h_metrics,
        })
    }
}
