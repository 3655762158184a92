use crate::error::{FontError, Result};
use crate::outline::{Contour, Outline};
use crate::stream::Reader;
use crate::tables::loca::LocaTable;

/// `glyf` — TrueType glyph outlines, indexed by `loca`.
#[derive(Debug, Clone)]
pub struct GlyfTable<'a> {
    data: &'a [u8],
}

/// Compound-component flag bits (OpenType `glyf` spec).
mod flag {
    pub const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    pub const ARGS_ARE_XY_VALUES: u16 = 0x0002;
    pub const WE_HAVE_A_SCALE: u16 = 0x0008;
    pub const MORE_COMPONENTS: u16 = 0x0020;
    pub const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    pub const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
}

/// On-curve bit of the simple-glyph point flag byte; 0x2/0x10 = short-x,same-x;
/// 0x4/0x20 = short-y,same-y; 0x8 = repeat.
mod point_flag {
    pub const ON_CURVE: u8 = 0x01;
    pub const X_SHORT: u8 = 0x02;
    pub const Y_SHORT: u8 = 0x04;
    pub const REPEAT: u8 = 0x08;
    pub const X_SAME_OR_POSITIVE: u8 = 0x10;
    pub const Y_SAME_OR_POSITIVE: u8 = 0x20;
}

/// Compound component translations are clamped to this range to keep malformed
/// fonts from producing outlines the path emitter can't reasonably represent.
const MAX_COMPONENT_OFFSET: f32 = 32_768.0;

const MAX_COMPOUND_DEPTH: u32 = 64;

impl<'a> GlyfTable<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        GlyfTable { data }
    }

    pub fn outline(&self, loca: &LocaTable, glyph_id: u16, num_glyphs: u16) -> Result<Outline> {
        self.outline_depth(loca, glyph_id, num_glyphs, 0)
    }

    fn outline_depth(
        &self,
        loca: &LocaTable,
        glyph_id: u16,
        num_glyphs: u16,
        depth: u32,
    ) -> Result<Outline> {
        if depth > MAX_COMPOUND_DEPTH {
            return Err(FontError::CompoundDepth(depth));
        }
        if glyph_id >= num_glyphs {
            return Err(FontError::BadGlyphId(glyph_id as u32));
        }

        let start = loca.offset(glyph_id as usize)?;
        let end = loca.offset(glyph_id as usize + 1)?;
        if end <= start {
            return Ok(Outline::new());
        }

        let mut reader = Reader::new(self.data).sub_reader(start as usize, (end - start) as usize)?;
        let number_of_contours = reader.read_i16()?;
        let _x_min = reader.read_i16()?;
        let _y_min = reader.read_i16()?;
        let _x_max = reader.read_i16()?;
        let _y_max = reader.read_i16()?;

        if number_of_contours >= 0 {
            decode_simple(&mut reader, number_of_contours as usize)
        } else {
            decode_compound(&mut reader, loca, self, num_glyphs, depth)
        }
    }
}

fn decode_simple(reader: &mut Reader, num_contours: usize) -> Result<Outline> {
    let mut end_pts_of_contours = Vec::with_capacity(num_contours);
    for _ in 0..num_contours {
        end_pts_of_contours.push(reader.read_u16()?);
    }

    let instruction_length = reader.read_u16()?;
    reader.skip(instruction_length as usize)?;

    let num_points = end_pts_of_contours.last().map(|&e| e as usize + 1).unwrap_or(0);

    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let f = reader.read_u8()?;
        flags.push(f);
        if f & point_flag::REPEAT != 0 {
            let repeat = reader.read_u8()?;
            for _ in 0..repeat {
                if flags.len() >= num_points {
                    break;
                }
                flags.push(f);
            }
        }
    }

    let mut xs = Vec::with_capacity(num_points);
    let mut x = 0i32;
    for &f in &flags {
        if f & point_flag::X_SHORT != 0 {
            let d = reader.read_u8()? as i32;
            x += if f & point_flag::X_SAME_OR_POSITIVE != 0 { d } else { -d };
        } else if f & point_flag::X_SAME_OR_POSITIVE == 0 {
            x += reader.read_i16()? as i32;
        }
        xs.push(x);
    }

    let mut ys = Vec::with_capacity(num_points);
    let mut y = 0i32;
    for &f in &flags {
        if f & point_flag::Y_SHORT != 0 {
            let d = reader.read_u8()? as i32;
            y += if f & point_flag::Y_SAME_OR_POSITIVE != 0 { d } else { -d };
        } else if f & point_flag::Y_SAME_OR_POSITIVE == 0 {
            y += reader.read_i16()? as i32;
        }
        ys.push(y);
    }

    let mut outline = Outline::new();
    let mut start = 0usize;
    for &end in &end_pts_of_contours {
        let end = end as usize;
        if end < start || end >= xs.len() {
            return Err(FontError::TruncatedTable {
                offset: reader.position(),
                needed: 0,
                available: 0,
            });
        }
        let points: Vec<(f32, f32, bool)> = (start..=end)
            .map(|i| (xs[i] as f32, ys[i] as f32, flags[i] & point_flag::ON_CURVE != 0))
            .collect();
        outline.contours.push(contour_from_points(&points));
        start = end + 1;
    }

    Ok(outline)
}

/// Walks a TrueType point list (on/off-curve) into a canonical contour, inserting the
/// implicit on-curve midpoint between consecutive off-curve points (invariant (c)).
fn contour_from_points(points: &[(f32, f32, bool)]) -> Contour {
    let mut contour = Contour::new();
    if points.is_empty() {
        return contour;
    }

    let n = points.len();
    let midpoint = |a: (f32, f32, bool), b: (f32, f32, bool)| ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);

    let (start_x, start_y) = if points[0].2 {
        (points[0].0, points[0].1)
    } else if points[n - 1].2 {
        (points[n - 1].0, points[n - 1].1)
    } else {
        midpoint(points[n - 1], points[0])
    };
    contour.move_to(start_x, start_y);

    let mut cur = (start_x, start_y);
    let mut pending_off: Option<(f32, f32)> = None;

    let first_on_index = if points[0].2 { 0 } else { n };
    for step in 0..n {
        let idx = (first_on_index + step) % n;
        let (x, y, on_curve) = points[idx];
        if on_curve {
            match pending_off.take() {
                Some((cx, cy)) => contour.quad_to(cx, cy, x, y),
                None => contour.line_to(x, y),
            }
            cur = (x, y);
        } else {
            match pending_off {
                Some((cx, cy)) => {
                    let (mx, my) = midpoint((cx, cy, false), (x, y, false));
                    contour.quad_to(cx, cy, mx, my);
                    cur = (mx, my);
                    pending_off = Some((x, y));
                }
                None => pending_off = Some((x, y)),
            }
        }
    }

    if let Some((cx, cy)) = pending_off {
        contour.quad_to(cx, cy, start_x, start_y);
    } else if cur != (start_x, start_y) {
        contour.line_to(start_x, start_y);
    }
    contour.close();
    contour
}

fn decode_compound(
    reader: &mut Reader,
    loca: &LocaTable,
    table: &GlyfTable,
    num_glyphs: u16,
    depth: u32,
) -> Result<Outline> {
    let mut outline = Outline::new();

    loop {
        let flags = reader.read_u16()?;
        let glyph_index = reader.read_u16()?;

        let (arg1, arg2) = if flags & flag::ARG_1_AND_2_ARE_WORDS != 0 {
            (reader.read_i16()? as f32, reader.read_i16()? as f32)
        } else {
            (reader.read_i8()? as f32, reader.read_i8()? as f32)
        };

        let (xx, xy, yx, yy) = if flags & flag::WE_HAVE_A_TWO_BY_TWO != 0 {
            (
                reader.read_f2dot14()?,
                reader.read_f2dot14()?,
                reader.read_f2dot14()?,
                reader.read_f2dot14()?,
            )
        } else if flags & flag::WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            (reader.read_f2dot14()?, 0.0, 0.0, reader.read_f2dot14()?)
        } else if flags & flag::WE_HAVE_A_SCALE != 0 {
            let s = reader.read_f2dot14()?;
            (s, 0.0, 0.0, s)
        } else {
            (1.0, 0.0, 0.0, 1.0)
        };

        let child = table.outline_depth(loca, glyph_index, num_glyphs, depth + 1)?;

        let transformed = if flags & flag::ARGS_ARE_XY_VALUES != 0 {
            let dx = arg1.clamp(-MAX_COMPONENT_OFFSET, MAX_COMPONENT_OFFSET);
            let dy = arg2.clamp(-MAX_COMPONENT_OFFSET, MAX_COMPONENT_OFFSET);
            if xx == 1.0 && xy == 0.0 && yx == 0.0 && yy == 1.0 {
                child.translated(dx, dy)
            } else {
                child.transformed(xx, xy, yx, yy, dx, dy)
            }
        } else {
            // Point-anchored attachment (arg1/arg2 are point indices): matching point
            // positions between parent and child is out of scope; place at the origin.
            child.transformed(xx, xy, yx, yy, 0.0, 0.0)
        };

        outline.extend(transformed);

        if flags & flag::MORE_COMPONENTS == 0 {
            break;
        }
    }

    Ok(outline)
}
