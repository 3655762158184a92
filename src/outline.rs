//! Canonical glyph outline representation shared by the TrueType and CFF decoders.

/// One drawing instruction in font-unit space, quadratic or cubic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    QuadTo { cx: f32, cy: f32, x: f32, y: f32 },
    CubicTo { c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32 },
    ClosePath,
}

/// A closed contour: starts with `MoveTo`, ends with `ClosePath` (invariant (c)).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    pub segments: Vec<Segment>,
}

impl Contour {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.segments.push(Segment::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.segments.push(Segment::LineTo { x, y });
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.segments.push(Segment::QuadTo { cx, cy, x, y });
    }

    pub fn cubic_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        self.segments
            .push(Segment::CubicTo { c1x, c1y, c2x, c2y, x, y });
    }

    pub fn close(&mut self) {
        self.segments.push(Segment::ClosePath);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub const EMPTY: BBox = BBox {
        x_min: f32::MAX,
        y_min: f32::MAX,
        x_max: f32::MIN,
        y_max: f32::MIN,
    };

    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max
    }

    pub fn extend(&mut self, x: f32, y: f32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// A fully decoded glyph outline: contours plus the bbox they trace out.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub contours: Vec<Contour>,
}

impl Outline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bbox(&self) -> BBox {
        let mut bbox = BBox::EMPTY;
        for contour in &self.contours {
            for seg in &contour.segments {
                match *seg {
                    Segment::MoveTo { x, y } | Segment::LineTo { x, y } => bbox.extend(x, y),
                    Segment::QuadTo { cx, cy, x, y } => {
                        bbox.extend(cx, cy);
                        bbox.extend(x, y);
                    }
                    Segment::CubicTo { c1x, c1y, c2x, c2y, x, y } => {
                        bbox.extend(c1x, c1y);
                        bbox.extend(c2x, c2y);
                        bbox.extend(x, y);
                    }
                    Segment::ClosePath => {}
                }
            }
        }
        bbox
    }

    /// Translates every point in every contour by `(dx, dy)`, used when compositing
    /// compound-glyph components or instantiating flex/hint-free CFF output.
    pub fn translated(&self, dx: f32, dy: f32) -> Outline {
        let contours = self
            .contours
            .iter()
            .map(|c| Contour {
                segments: c
                    .segments
                    .iter()
                    .map(|s| match *s {
                        Segment::MoveTo { x, y } => Segment::MoveTo { x: x + dx, y: y + dy },
                        Segment::LineTo { x, y } => Segment::LineTo { x: x + dx, y: y + dy },
                        Segment::QuadTo { cx, cy, x, y } => Segment::QuadTo {
                            cx: cx + dx,
                            cy: cy + dy,
                            x: x + dx,
                            y: y + dy,
                        },
                        Segment::CubicTo { c1x, c1y, c2x, c2y, x, y } => Segment::CubicTo {
                            c1x: c1x + dx,
                            c1y: c1y + dy,
                            c2x: c2x + dx,
                            c2y: c2y + dy,
                            x: x + dx,
                            y: y + dy,
                        },
                        Segment::ClosePath => Segment::ClosePath,
                    })
                    .collect(),
            })
            .collect();
        Outline { contours }
    }

    /// Applies a full 2x2 affine plus translation, used for compound-glyph components
    /// carrying a scale or rotation rather than a pure translation.
    pub fn transformed(&self, xx: f32, xy: f32, yx: f32, yy: f32, dx: f32, dy: f32) -> Outline {
        let tp = |x: f32, y: f32| (xx * x + xy * y + dx, yx * x + yy * y + dy);
        let contours = self
            .contours
            .iter()
            .map(|c| Contour {
                segments: c
                    .segments
                    .iter()
                    .map(|s| match *s {
                        Segment::MoveTo { x, y } => {
                            let (x, y) = tp(x, y);
                            Segment::MoveTo { x, y }
                        }
                        Segment::LineTo { x, y } => {
                            let (x, y) = tp(x, y);
                            Segment::LineTo { x, y }
                        }
                        Segment::QuadTo { cx, cy, x, y } => {
                            let (cx, cy) = tp(cx, cy);
                            let (x, y) = tp(x, y);
                            Segment::QuadTo { cx, cy, x, y }
                        }
                        Segment::CubicTo { c1x, c1y, c2x, c2y, x, y } => {
                            let (c1x, c1y) = tp(c1x, c1y);
                            let (c2x, c2y) = tp(c2x, c2y);
                            let (x, y) = tp(x, y);
                            Segment::CubicTo { c1x, c1y, c2x, c2y, x, y }
                        }
                        Segment::ClosePath => Segment::ClosePath,
                    })
                    .collect(),
            })
            .collect();
        Outline { contours }
    }

    pub fn extend(&mut self, other: Outline) {
        self.contours.extend(other.contours);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_covers_control_points() {
        let mut c = Contour::new();
        c.move_to(0.0, 0.0);
        c.quad_to(10.0, 20.0, 5.0, 5.0);
        c.close();
        let outline = Outline { contours: vec![c] };
        let bbox = outline.bbox();
        assert_eq!(bbox.x_max, 10.0);
        assert_eq!(bbox.y_max, 20.0);
    }

    #[test]
    fn translated_shifts_every_point() {
        let mut c = Contour::new();
        c.move_to(1.0, 1.0);
        c.line_to(2.0, 2.0);
        c.close();
        let outline = Outline { contours: vec![c] };
        let shifted = outline.translated(10.0, -5.0);
        match shifted.contours[0].segments[0] {
            Segment::MoveTo { x, y } => {
                assert_eq!(x, 11.0);
                assert_eq!(y, -4.0);
            }
            _ => panic!("expected MoveTo"),
        }
    }
}
