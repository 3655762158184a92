use crate::error::Result;
use crate::stream::Reader;
use crate::tables::Table;

/// `head` — font header: global metrics, bbox, and the `loca` offset format.
#[derive(Debug, Clone, Copy)]
pub struct HeadTable {
    pub font_revision: f32,
    pub units_per_em: u16,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
    pub index_to_loc_format: i16,
}

impl HeadTable {
    pub const MAGIC_NUMBER: u32 = 0x5F0F3CF5;

    pub fn is_long_loca_format(&self) -> bool {
        self.index_to_loc_format == 1
    }
}

impl Table for HeadTable {
    fn parse(reader: &mut Reader, _length: u32) -> Result<Self> {
        let _table_version = reader.read_fixed()?;
        let font_revision = reader.read_fixed()?;
        let _checksum_adjustment = reader.read_u32()?;
        let _magic_number = reader.read_u32()?;
        // Some fonts in the wild carry a corrupted magic number; it is diagnostic only,
        // not required for decoding, so we don't reject the font over it.
        let flags = reader.read_u16()?;
        let units_per_em = reader.read_u16()?;
        let _created = reader.read_long_datetime()?;
        let _modified = reader.read_long_datetime()?;
        let x_min = reader.read_i16()?;
        let y_min = reader.read_i16()?;
        let x_max = reader.read_i16()?;
        let y_max = reader.read_i16()?;
        let mac_style = reader.read_u16()?;
        let lowest_rec_ppem = reader.read_u16()?;
        let _font_direction_hint = reader.read_i16()?;
        let index_to_loc_format = reader.read_i16()?;
        let _glyph_data_format = reader.read_i16()?;
        let _ = flags;

        Ok(HeadTable {
            font_revision,
            units_per_em,
            x_min,
            y_min,
            x_max,
            y_max,
            mac_style,
            lowest_rec_ppem,
            index_to_loc_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut d = Vec::new();
        d.extend_from_slice(&1u32.to_be_bytes()); // version 1.0
        d.extend_from_slice(&0x00010000u32.to_be_bytes()); // revision 1.0
        d.extend_from_slice(&0u32.to_be_bytes()); // checksum adj
        d.extend_from_slice(&HeadTable::MAGIC_NUMBER.to_be_bytes());
        d.extend_from_slice(&0u16.to_be_bytes()); // flags
        d.extend_from_slice(&2048u16.to_be_bytes()); // upm
        d.extend_from_slice(&0u64.to_be_bytes()); // created
        d.extend_from_slice(&0u64.to_be_bytes()); // modified
        d.extend_from_slice(&(-100i16).to_be_bytes());
        d.extend_from_slice(&(-200i16).to_be_bytes());
        d.extend_from_slice(&1500i16.to_be_bytes());
        d.extend_from_slice(&1800i16.to_be_bytes());
        d.extend_from_slice(&0u16.to_be_bytes()); // mac_style
        d.extend_from_slice(&9u16.to_be_bytes()); // lowest rec ppem
        d.extend_from_slice(&2i16.to_be_bytes()); // dir hint
        d.extend_from_slice(&1i16.to_be_bytes()); // index to loc format (long)
        d.extend_from_slice(&0i16.to_be_bytes()); // glyph data format
        d
    }

    #[test]
    fn parses_units_per_em_and_bbox() {
        let data = sample();
        let mut r = Reader::new(&data);
        let head = HeadTable::parse(&mut r, data.len() as u32).unwrap();
        assert_eq!(head.units_per_em, 2048);
        assert_eq!(head.x_min, -100);
        assert_eq!(head.y_max, 1800);
        assert!(head.is_long_loca_format());
    }
}
