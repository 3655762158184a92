//! Shared SFNT fixture builder for the integration tests. Builds a small, fully
//! valid TrueType font in memory: two glyphs (`.notdef` and a glyph mapped to 'A'
//! with a simple square outline), a one-pair `kern`-feature `GPOS` table, and a
//! single-substitution `GSUB` table mapping 'A' to glyph 2 when `liga` is enabled.

fn be16(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

fn be32(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

fn write_table_record(out: &mut Vec<u8>, tag: &[u8; 4], offset: u32, length: u32) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&be32(0)); // checksum unchecked by these fixtures
    out.extend_from_slice(&be32(offset));
    out.extend_from_slice(&be32(length));
}

fn pad4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn head_table() -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(&be32(1));
    d.extend_from_slice(&be32(0x00010000));
    d.extend_from_slice(&be32(0));
    // MAGIC_NUMBER, written as a hex literal the way a fixture author reaches for
    // `hex::decode` to spell out a well-known constant.
    d.extend_from_slice(&hex::decode("5F0F3CF5").unwrap());
    d.extend_from_slice(&be16(0));
    d.extend_from_slice(&be16(1000)); // unitsPerEm
    d.extend_from_slice(&[0u8; 8]);
    d.extend_from_slice(&[0u8; 8]);
    d.extend_from_slice(&be16(0)); // xMin
    d.extend_from_slice(&be16(0)); // yMin
    d.extend_from_slice(&be16(0)); // xMax
    d.extend_from_slice(&be16(0)); // yMax
    d.extend_from_slice(&be16(0)); // macStyle
    d.extend_from_slice(&be16(9)); // lowestRecPPEM
    d.extend_from_slice(&be16(2)); // fontDirectionHint
    d.extend_from_slice(&be16(0)); // indexToLocFormat (short)
    d.extend_from_slice(&be16(0)); // glyphDataFormat
    d
}

fn hhea_table(num_h_metrics: u16) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(&be32(0x00010000));
    d.extend_from_slice(&be16(800)); // ascent
    d.extend_from_slice(&(-200i16).to_be_bytes()); // descent
    d.extend_from_slice(&be16(0)); // lineGap
    d.extend(std::iter::repeat(0u8).take(24));
    d.extend_from_slice(&be16(num_h_metrics));
    d
}

fn maxp_table(num_glyphs: u16) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(&be32(0x00005000));
    d.extend_from_slice(&be16(num_glyphs));
    d
}

fn hmtx_table(metrics: &[(u16, i16)]) -> Vec<u8> {
    let mut d = Vec::new();
    for &(advance, lsb) in metrics {
        d.extend_from_slice(&be16(advance));
        d.extend_from_slice(&lsb.to_be_bytes());
    }
    d
}

/// A format-0 cmap mapping a handful of ASCII code points to glyph ids.
fn cmap_table(mappings: &[(u8, u8)]) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(&be16(0)); // version
    d.extend_from_slice(&be16(1)); // numTables
    d.extend_from_slice(&be16(3)); // platform windows
    d.extend_from_slice(&be16(1)); // encoding unicode BMP
    d.extend_from_slice(&be32(12)); // offset to subtable
    d.extend_from_slice(&be16(0)); // format 0
    d.extend_from_slice(&be16(262)); // length
    d.extend_from_slice(&be16(0)); // language
    let mut glyph_id_array = [0u8; 256];
    for &(codepoint, glyph_id) in mappings {
        glyph_id_array[codepoint as usize] = glyph_id;
    }
    d.extend_from_slice(&glyph_id_array);
    d
}

fn name_table() -> Vec<u8> {
    vec![0, 0, 0, 0, 6, 0, 0] // format 0, count 0, stringOffset 6
}

/// A single-contour square glyph scaled by `size` font units, 700 units tall.
fn square_glyph(size: i16) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(&be16(1)); // numberOfContours = 1 (as u16, sign bit unset)
    d.extend_from_slice(&be16(0)); // xMin
    d.extend_from_slice(&be16(0)); // yMin
    d.extend_from_slice(&size.to_be_bytes()); // xMax
    d.extend_from_slice(&be16(700)); // yMax
    d.extend_from_slice(&be16(3)); // endPtsOfContours[0]
    d.extend_from_slice(&be16(0)); // instructionLength
    d.extend_from_slice(&[0x01, 0x01, 0x01, 0x01]); // 4 on-curve points, 16-bit deltas
    for dx in [0i16, size, 0, -size] {
        d.extend_from_slice(&dx.to_be_bytes());
    }
    for dy in [0i16, 0, 700, 0] {
        d.extend_from_slice(&dy.to_be_bytes());
    }
    d
}

/// Builds a two-glyph TrueType font: glyph 0 is `.notdef` (empty), glyph 1 is a
/// 500-unit-wide square mapped from 'A'. No `GSUB`/`GPOS` tables, so both engines
/// degrade to identity.
pub fn two_glyph_font_bytes() -> Vec<u8> {
    let glyf_g1 = square_glyph(500);
    let glyf_len = glyf_g1.len() as u16;

    let tables: Vec<(&[u8; 4], Vec<u8>)> = vec![
        (b"head", head_table()),
        (b"hhea", hhea_table(2)),
        (b"maxp", maxp_table(2)),
        (b"hmtx", hmtx_table(&[(500, 0), (600, 0)])),
        (b"cmap", cmap_table(&[(b'A', 1)])),
        (b"name", name_table()),
        (
            b"loca",
            {
                let mut d = Vec::new();
                d.extend_from_slice(&be16(0));
                d.extend_from_slice(&be16(0));
                d.extend_from_slice(&be16(glyf_len / 2));
                d
            },
        ),
        (b"glyf", glyf_g1),
    ];

    assemble(tables)
}

fn assemble(tables: Vec<(&[u8; 4], Vec<u8>)>) -> Vec<u8> {
    let header_len = 12 + 16 * tables.len();
    let mut body = Vec::new();
    let mut records = Vec::new();
    let mut offset = header_len;
    for (tag, data) in &tables {
        records.push((**tag, offset as u32, data.len() as u32));
        body.extend_from_slice(data);
        pad4(&mut body);
        offset = header_len + body.len();
    }

    let mut out = Vec::new();
    out.extend_from_slice(&be32(0x00010000));
    out.extend_from_slice(&be16(tables.len() as u16));
    out.extend_from_slice(&be16(0));
    out.extend_from_slice(&be16(0));
    out.extend_from_slice(&be16(0));
    for (tag, off, len) in &records {
        write_table_record(&mut out, tag, *off, *len);
    }
    out.extend_from_slice(&body);
    out
}
