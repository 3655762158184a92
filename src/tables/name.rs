use crate::error::Result;
use crate::stream::Reader;
use crate::tables::Table;

/// `name` — human-readable strings (family name, full name, PostScript name, ...).
/// Decodes Windows (UTF-16BE) and Macintosh (Mac Roman) platform strings; other
/// platforms are kept as raw records but decode to an empty string.
#[derive(Debug, Clone)]
pub struct NameTable {
    records: Vec<(NameRecord, String)>,
}

#[derive(Debug, Clone, Copy)]
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
}

impl NameRecord {
    pub const COPYRIGHT_NOTICE: u16 = 0;
    pub const FONT_FAMILY_NAME: u16 = 1;
    pub const FONT_SUBFAMILY_NAME: u16 = 2;
    pub const UNIQUE_FONT_ID: u16 = 3;
    pub const FULL_FONT_NAME: u16 = 4;
    pub const VERSION_STRING: u16 = 5;
    pub const POSTSCRIPT_NAME: u16 = 6;
    pub const TRADEMARK: u16 = 7;
    pub const MANUFACTURER_NAME: u16 = 8;
    pub const DESIGNER: u16 = 9;
    pub const DESCRIPTION: u16 = 10;
    pub const VENDOR_URL: u16 = 11;
    pub const DESIGNER_URL: u16 = 12;
    pub const LICENSE_DESCRIPTION: u16 = 13;
    pub const LICENSE_URL: u16 = 14;
    pub const TYPOGRAPHIC_FAMILY_NAME: u16 = 16;
    pub const TYPOGRAPHIC_SUBFAMILY_NAME: u16 = 17;
    pub const COMPATIBLE_FULL_NAME: u16 = 18;
    pub const SAMPLE_TEXT: u16 = 19;
    pub const POSTSCRIPT_CID: u16 = 20;
    pub const WWS_FAMILY_NAME: u16 = 21;
    pub const WWS_SUBFAMILY_NAME: u16 = 22;
    pub const LIGHT_BACKGROUND_PALETTE: u16 = 23;
    pub const DARK_BACKGROUND_PALETTE: u16 = 24;
}

// Mac Roman code points 0x80..=0xFF, in order. Index 0 corresponds to byte 0x80.
// The two typographic ligatures (fi, fl) are represented by their single Unicode
// ligature code points rather than two-character strings, since this is a `[char; 128]`.
const MAC_ROMAN_HIGH: [char; 128] = [
    'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è', 'ê', 'ë', 'í',
    'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü', '†', '°', '¢', '£', '§', '•',
    '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø', '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏',
    'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø', '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', ' ', 'À',
    'Ã', 'Õ', 'Œ', 'œ', '–', '—', '\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}', '÷', '◊', 'ÿ',
    'Ÿ', '⁄', '€', '‹', '›', '\u{fb01}', '\u{fb02}', '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë',
    'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô', '\u{f8ff}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙',
    '˚', '¸', '˝', '˛', 'ˇ',
];

fn decode_mac_roman(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                MAC_ROMAN_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn decode_record(platform_id: u16, bytes: &[u8]) -> String {
    match platform_id {
        0 | 3 => decode_utf16be(bytes),
        1 => decode_mac_roman(bytes),
        _ => String::new(),
    }
}

/// Lower is more preferred: Windows Unicode BMP (3,1), then Macintosh Roman (1,0),
/// then anything else in file order.
fn platform_rank(platform_id: u16, encoding_id: u16) -> u8 {
    match (platform_id, encoding_id) {
        (3, 1) => 0,
        (1, 0) => 1,
        _ => 2,
    }
}

impl NameTable {
    pub fn get(&self, name_id: u16) -> Option<&str> {
        self.records
            .iter()
            .filter(|(r, s)| r.name_id == name_id && !s.is_empty())
            .min_by_key(|(r, _)| platform_rank(r.platform_id, r.encoding_id))
            .map(|(_, s)| s.as_str())
    }

    pub fn font_family(&self) -> Option<&str> {
        self.get(NameRecord::FONT_FAMILY_NAME)
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get(NameRecord::FULL_FONT_NAME)
    }

    pub fn style_name(&self) -> Option<&str> {
        self.get(NameRecord::FONT_SUBFAMILY_NAME)
    }

    pub fn postscript_name(&self) -> Option<&str> {
        self.get(NameRecord::POSTSCRIPT_NAME)
    }
}

impl Table for NameTable {
    fn parse(reader: &mut Reader, _length: u32) -> Result<Self> {
        let table_start_remaining = reader.remaining();
        let full = reader.sub_reader(0, reader.position() + table_start_remaining)?;

        let _format = reader.read_u16()?;
        let count = reader.read_u16()?;
        let string_offset = reader.read_u16()?;

        struct Raw {
            platform_id: u16,
            encoding_id: u16,
            language_id: u16,
            name_id: u16,
            length: u16,
            offset: u16,
        }

        let mut raws = Vec::with_capacity(count as usize);
        for _ in 0..count {
            raws.push(Raw {
                platform_id: reader.read_u16()?,
                encoding_id: reader.read_u16()?,
                language_id: reader.read_u16()?,
                name_id: reader.read_u16()?,
                length: reader.read_u16()?,
                offset: reader.read_u16()?,
            });
        }

        let mut records = Vec::with_capacity(raws.len());
        for raw in raws {
            let start = string_offset as usize + raw.offset as usize;
            let bytes = full.sub_reader(start, raw.length as usize)?.read_bytes(raw.length as usize)?;
            let text = decode_record(raw.platform_id, bytes);
            records.push((
                NameRecord {
                    platform_id: raw.platform_id,
                    encoding_id: raw.encoding_id,
                    language_id: raw.language_id,
                    name_id: raw.name_id,
                },
                text,
            ));
        }

        Ok(NameTable { records })
    }
}
