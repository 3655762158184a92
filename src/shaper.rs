//! Text shaping and layout: code points to positioned, scaled glyphs (§4.9). Drives
//! `cmap` → `GSUB` → `hmtx` → `GPOS` in that order, then applies line spacing,
//! alignment and rotation. Knows nothing about SVG/XML; [`crate::path::emit_path`]
//! turns the glyphs this module produces into draw commands.

use crate::font::Font;
use crate::options::{HAlign, RotationMode, ShapeOptions, VAlign};
use crate::outline::BBox;
use crate::warnings::{Warning, Warnings};

/// One glyph placed in pixel space, ready to be scaled/translated into draw commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedGlyph {
    pub glyph_id: u16,
    pub x: f32,
    pub y: f32,
    pub advance: f32,
}

/// The result of shaping a (possibly multi-line) string against a `Font`: positioned
/// glyphs, the scale they were laid out at, the block's pixel bbox, the caller's
/// opaque color, and any recoverable conditions hit along the way.
#[derive(Debug, Clone)]
pub struct TextRun {
    glyphs: Vec<PositionedGlyph>,
    scale: f32,
    bbox: BBox,
    color: Option<String>,
    warnings: Warnings,
}

impl TextRun {
    pub fn glyphs(&self) -> &[PositionedGlyph] {
        &self.glyphs
    }

    /// Every glyph id that appears in this run, deduplicated and sorted — the set an
    /// `svg2`/`reuse` caller needs to emit a `<symbol>` for.
    pub fn distinct_glyph_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.glyphs.iter().map(|g| g.glyph_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// The pixel `(width, height)` of the block's bbox.
    pub fn pixel_size(&self) -> (f32, f32) {
        if self.bbox.is_empty() {
            (0.0, 0.0)
        } else {
            (self.bbox.x_max - self.bbox.x_min, self.bbox.y_max - self.bbox.y_min)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, f32, f32, f32)> + '_ {
        let scale = self.scale;
        self.glyphs.iter().map(move |g| (g.glyph_id, g.x, g.y, scale))
    }
}

impl<'a> IntoIterator for &'a TextRun {
    type Item = (u16, f32, f32, f32);
    type IntoIter = Box<dyn Iterator<Item = (u16, f32, f32, f32)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

fn horizontal_shift(halign: HAlign, container_width: f32, content_width: f32) -> f32 {
    match halign {
        HAlign::Left => 0.0,
        HAlign::Center => (container_width - content_width) / 2.0,
        HAlign::Right => container_width - content_width,
    }
}

fn vertical_anchor(valign: VAlign, bbox: BBox, base_y: f32) -> f32 {
    match valign {
        VAlign::Top => bbox.y_min,
        VAlign::Bottom => bbox.y_max,
        VAlign::Center => (bbox.y_min + bbox.y_max) / 2.0,
        VAlign::Base => base_y,
    }
}

fn rotate_point(x: f32, y: f32, cx: f32, cy: f32, theta: f32) -> (f32, f32) {
    let (dx, dy) = (x - cx, y - cy);
    let (s, c) = theta.sin_cos();
    (cx + dx * c - dy * s, cy + dx * s + dy * c)
}

struct RawGlyph {
    glyph_id: u16,
    x: f32,
    y: f32,
}

struct RawLine {
    glyphs: Vec<RawGlyph>,
    width: f32,
}

fn glyph_bbox_px(font: &Font, glyph_id: u16, x: f32, y: f32, scale: f32, warnings: &mut Warnings) -> BBox {
    let (x_min, y_min, x_max, y_max) = font.glyph_reporting(glyph_id, warnings).bbox();
    let mut b = BBox::EMPTY;
    b.extend(x + x_min * scale, y - y_max * scale);
    b.extend(x + x_max * scale, y - y_min * scale);
    b
}

/// Shapes `text` against `font` per `options` (§4.9, steps 1-10).
pub fn shape(font: &Font, text: &str, options: &ShapeOptions) -> TextRun {
    let mut warnings = Warnings::new();
    let units_per_em = (font.units_per_em().max(1)) as f32;
    let scale = options.size / units_per_em;
    let feature_tags = font.enabled_feature_tags(&options.feature_overrides, &mut warnings);

    let line_height_px = font.line_height() as f32 * scale * options.linespacing;
    let first_baseline = font.ascent() as f32 * scale;

    let mut lines: Vec<RawLine> = Vec::new();
    for (line_index, line_text) in text.split('\n').enumerate() {
        let mut glyph_ids = Vec::new();
        for ch in line_text.chars() {
            match font.try_glyph_index(ch) {
                Some(id) => glyph_ids.push(id),
                None => {
                    warnings.push(Warning::MissingGlyph { codepoint: ch as u32 });
                    glyph_ids.push(0);
                }
            }
        }

        let glyph_ids = font.apply_gsub(&glyph_ids, &feature_tags, &mut warnings);
        let adjustments = font.apply_gpos(&glyph_ids, &feature_tags, &mut warnings);

        let baseline_y = first_baseline + line_index as f32 * line_height_px;
        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::with_capacity(glyph_ids.len());
        for (i, &glyph_id) in glyph_ids.iter().enumerate() {
            let adj = adjustments.get(i).copied().unwrap_or_default();
            let x = pen_x + adj.dx as f32 * scale;
            let y = baseline_y - adj.dy as f32 * scale;
            glyphs.push(RawGlyph { glyph_id, x, y });

            let advance_units = font.hmtx_advance(glyph_id) as i32 + adj.advance_dx;
            pen_x += advance_units as f32 * scale;
        }

        lines.push(RawLine { width: pen_x, glyphs });
    }

    let block_width = lines.iter().fold(0.0f32, |acc, l| acc.max(l.width));

    let mut natural_bbox = BBox::EMPTY;
    for line in &lines {
        for g in &line.glyphs {
            natural_bbox = natural_bbox.union(&glyph_bbox_px(font, g.glyph_id, g.x, g.y, scale, &mut warnings));
        }
    }
    if natural_bbox.is_empty() {
        natural_bbox = BBox { x_min: 0.0, y_min: 0.0, x_max: block_width, y_max: first_baseline };
    }

    let theta = options.rotation.to_radians();
    let mut positioned = Vec::new();

    match options.rotation_mode {
        RotationMode::Anchor => {
            let pivot = (natural_bbox.x_min, natural_bbox.y_min);
            let mut rotated_bbox = BBox::EMPTY;
            let mut rotated: Vec<(u16, f32, f32)> = Vec::new();
            for line in &lines {
                for g in &line.glyphs {
                    let (rx, ry) = rotate_point(g.x, g.y, pivot.0, pivot.1, theta);
                    rotated_bbox = rotated_bbox.union(&glyph_bbox_px(font, g.glyph_id, rx, ry, scale, &mut warnings));
                    rotated.push((g.glyph_id, rx, ry));
                }
            }
            if rotated_bbox.is_empty() {
                rotated_bbox = natural_bbox;
            }

            let h_shift = horizontal_shift(options.halign, block_width, rotated_bbox.x_max - rotated_bbox.x_min);
            let (_, base_y) = rotate_point(pivot.0, first_baseline, pivot.0, pivot.1, theta);
            let v_anchor = vertical_anchor(options.valign, rotated_bbox, base_y);

            for (glyph_id, x, y) in rotated {
                let advance = font.hmtx_advance(glyph_id) as f32 * scale;
                positioned.push(PositionedGlyph { glyph_id, x: x + h_shift, y: y - v_anchor, advance });
            }
        }
        RotationMode::Default => {
            let v_anchor = vertical_anchor(options.valign, natural_bbox, first_baseline);
            for line in &lines {
                let h_shift = horizontal_shift(options.halign, block_width, line.width);
                for g in &line.glyphs {
                    let ax = g.x + h_shift;
                    let ay = g.y - v_anchor;
                    let (rx, ry) = rotate_point(ax, ay, 0.0, 0.0, theta);
                    let advance = font.hmtx_advance(g.glyph_id) as f32 * scale;
                    positioned.push(PositionedGlyph { glyph_id: g.glyph_id, x: rx, y: ry, advance });
                }
            }
        }
    }

    let mut bbox = BBox::EMPTY;
    for g in &positioned {
        bbox = bbox.union(&glyph_bbox_px(font, g.glyph_id, g.x, g.y, scale, &mut warnings));
    }
    if options.valign == VAlign::Base && !bbox.is_empty() {
        bbox.extend(bbox.x_min, 0.0);
        bbox.extend(bbox.x_max, 0.0);
    }

    TextRun {
        glyphs: positioned,
        scale,
        bbox,
        color: options.color.clone(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Font;

    fn write_table_record(out: &mut Vec<u8>, tag: &[u8; 4], offset: u32, length: u32) {
        out.extend_from_slice(tag);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&offset.to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
    }

    fn pad4(buf: &mut Vec<u8>) {
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
    }

    /// A two-glyph font (`.notdef` plus one glyph mapped to 'A') with a 10px simple
    /// square outline, enough to exercise advance accumulation and bbox-union.
    fn two_glyph_font_bytes() -> Vec<u8> {
        let mut head = Vec::new();
        head.extend_from_slice(&1u32.to_be_bytes());
        head.extend_from_slice(&0x00010000u32.to_be_bytes());
        head.extend_from_slice(&0u32.to_be_bytes());
        head.extend_from_slice(&crate::tables::head::HeadTable::MAGIC_NUMBER.to_be_bytes());
        head.extend_from_slice(&0u16.to_be_bytes());
        head.extend_from_slice(&1000u16.to_be_bytes());
        head.extend_from_slice(&0u64.to_be_bytes());
        head.extend_from_slice(&0u64.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0u16.to_be_bytes());
        head.extend_from_slice(&9u16.to_be_bytes());
        head.extend_from_slice(&2i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());

        let mut hhea = Vec::new();
        hhea.extend_from_slice(&0x00010000u32.to_be_bytes());
        hhea.extend_from_slice(&800i16.to_be_bytes());
        hhea.extend_from_slice(&(-200i16).to_be_bytes());
        hhea.extend_from_slice(&0i16.to_be_bytes());
        hhea.extend(std::iter::repeat(0u8).take(24));
        hhea.extend_from_slice(&2u16.to_be_bytes());

        let mut maxp = Vec::new();
        maxp.extend_from_slice(&0x00005000u32.to_be_bytes());
        maxp.extend_from_slice(&2u16.to_be_bytes());

        let mut hmtx = Vec::new();
        hmtx.extend_from_slice(&500u16.to_be_bytes());
        hmtx.extend_from_slice(&0i16.to_be_bytes());
        hmtx.extend_from_slice(&600u16.to_be_bytes());
        hmtx.extend_from_slice(&0i16.to_be_bytes());

        let mut cmap = Vec::new();
        cmap.extend_from_slice(&0u16.to_be_bytes());
        cmap.extend_from_slice(&1u16.to_be_bytes());
        cmap.extend_from_slice(&3u16.to_be_bytes());
        cmap.extend_from_slice(&1u16.to_be_bytes());
        cmap.extend_from_slice(&12u32.to_be_bytes());
        cmap.extend_from_slice(&0u16.to_be_bytes());
        cmap.extend_from_slice(&262u16.to_be_bytes());
        cmap.extend_from_slice(&0u16.to_be_bytes());
        let mut glyph_id_array = [0u8; 256];
        glyph_id_array[b'A' as usize] = 1;
        cmap.extend_from_slice(&glyph_id_array);

        let name = vec![0u8, 0, 0, 0, 6, 0, 0];

        // loca: glyph 0 empty, glyph 1 a 10-point-ish square (we only need a
        // plausible simple glyph so `outline()` succeeds).
        let mut glyf = Vec::new();
        {
            glyf.extend_from_slice(&1i16.to_be_bytes()); // one contour
            glyf.extend_from_slice(&0i16.to_be_bytes());
            glyf.extend_from_slice(&0i16.to_be_bytes());
            glyf.extend_from_slice(&500i16.to_be_bytes());
            glyf.extend_from_slice(&700i16.to_be_bytes());
            glyf.extend_from_slice(&3u16.to_be_bytes()); // endPtsOfContours[0]
            glyf.extend_from_slice(&0u16.to_be_bytes()); // instructionLength
            // flags: 4 on-curve points
            glyf.extend_from_slice(&[0x01, 0x01, 0x01, 0x01]);
            // xCoordinates as plain i16 deltas (flags without short bit => 2-byte signed deltas)
            for dx in [0i16, 500, 0, -500] {
                glyf.extend_from_slice(&dx.to_be_bytes());
            }
            for dy in [0i16, 0, 700, 0] {
                glyf.extend_from_slice(&dy.to_be_bytes());
            }
        }
        let glyf_len = glyf.len() as u16;

        let loca = {
            let mut d = Vec::new();
            d.extend_from_slice(&0u16.to_be_bytes());
            d.extend_from_slice(&0u16.to_be_bytes());
            d.extend_from_slice(&((glyf_len / 2) as u16).to_be_bytes());
            d
        };

        let tables: [(&[u8; 4], Vec<u8>); 8] = [
            (b"head", head),
            (b"hhea", hhea),
            (b"maxp", maxp),
            (b"hmtx", hmtx),
            (b"cmap", cmap),
            (b"name", name),
            (b"loca", loca),
            (b"glyf", glyf),
        ];

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
        out.extend_from_slice(&0x00010000u32.to_be_bytes());
        out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        for (tag, off, len) in &records {
            write_table_record(&mut out, tag, *off, *len);
        }
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn single_char_advances_by_hmtx_width() {
        let font = Font::load(two_glyph_font_bytes()).unwrap();
        let options = ShapeOptions::default().with_size(1000.0);
        let run = shape(&font, "A", &options);
        assert_eq!(run.glyphs().len(), 1);
        assert_eq!(run.glyphs()[0].glyph_id, 1);
        assert!((run.glyphs()[0].advance - 600.0).abs() < 0.01);
    }

    #[test]
    fn unmapped_codepoint_records_a_warning() {
        let font = Font::load(two_glyph_font_bytes()).unwrap();
        let run = shape(&font, "\u{1F600}", &ShapeOptions::default());
        assert_eq!(run.glyphs()[0].glyph_id, 0);
        assert!(!run.warnings().is_empty());
    }

    #[test]
    fn two_lines_stack_by_line_height() {
        let font = Font::load(two_glyph_font_bytes()).unwrap();
        let options = ShapeOptions::default().with_size(1000.0);
        let run = shape(&font, "A\nA", &options);
        let ys: Vec<f32> = run.glyphs().iter().map(|g| g.y).collect();
        assert_eq!(ys.len(), 2);
        assert!(ys[1] > ys[0]);
    }

    #[test]
    fn right_align_shifts_shorter_line_to_match_width() {
        let font = Font::load(two_glyph_font_bytes()).unwrap();
        let mut options = ShapeOptions::default().with_size(1000.0);
        options.halign = HAlign::Right;
        let run = shape(&font, "AA\nA", &options);
        let xs: Vec<f32> = run.glyphs().iter().map(|g| g.x).collect();
        assert!(xs[2] > 0.0);
    }

    #[test]
    fn distinct_glyph_ids_deduplicates() {
        let font = Font::load(two_glyph_font_bytes()).unwrap();
        let run = shape(&font, "AAA", &ShapeOptions::default());
        assert_eq!(run.distinct_glyph_ids(), vec![1]);
    }
}
