//! Translates canonical outlines into draw commands in target (pixel, y-down)
//! coordinates (§4.10). Format-agnostic: knows nothing about SVG, XML, or
//! symbol/use reuse, which is the out-of-scope serializer's job.

use crate::outline::{Outline, Segment};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    QuadTo { cx: f32, cy: f32, x: f32, y: f32 },
    CubicTo { c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32 },
    Close,
}

/// Converts `outline` (font-unit space, y-up) into path commands in target space
/// (pixels, y-down), scaled by `scale` and placed at `(origin_x, origin_y)`.
pub fn emit_path(outline: &Outline, scale: f32, origin_x: f32, origin_y: f32) -> Vec<PathCommand> {
    let to_target = |x: f32, y: f32| (origin_x + x * scale, origin_y - y * scale);

    let mut commands = Vec::new();
    for contour in &outline.contours {
        for seg in &contour.segments {
            let cmd = match *seg {
                Segment::MoveTo { x, y } => {
                    let (x, y) = to_target(x, y);
                    PathCommand::MoveTo { x, y }
                }
                Segment::LineTo { x, y } => {
                    let (x, y) = to_target(x, y);
                    PathCommand::LineTo { x, y }
                }
                Segment::QuadTo { cx, cy, x, y } => {
                    let (cx, cy) = to_target(cx, cy);
                    let (x, y) = to_target(x, y);
                    PathCommand::QuadTo { cx, cy, x, y }
                }
                Segment::CubicTo { c1x, c1y, c2x, c2y, x, y } => {
                    let (c1x, c1y) = to_target(c1x, c1y);
                    let (c2x, c2y) = to_target(c2x, c2y);
                    let (x, y) = to_target(x, y);
                    PathCommand::CubicTo { c1x, c1y, c2x, c2y, x, y }
                }
                Segment::ClosePath => PathCommand::Close,
            };
            commands.push(cmd);
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::Contour;

    #[test]
    fn negates_and_scales_y() {
        let mut c = Contour::new();
        c.move_to(0.0, 100.0);
        c.line_to(10.0, 0.0);
        c.close();
        let outline = Outline { contours: vec![c] };

        let commands = emit_path(&outline, 0.5, 0.0, 0.0);
        assert_eq!(commands[0], PathCommand::MoveTo { x: 0.0, y: -50.0 });
        assert_eq!(commands[1], PathCommand::LineTo { x: 5.0, y: 0.0 });
        assert_eq!(commands[2], PathCommand::Close);
    }

    #[test]
    fn offsets_by_origin() {
        let mut c = Contour::new();
        c.move_to(0.0, 0.0);
        c.close();
        let outline = Outline { contours: vec![c] };

        let commands = emit_path(&outline, 1.0, 20.0, 30.0);
        assert_eq!(commands[0], PathCommand::MoveTo { x: 20.0, y: 30.0 });
    }
}
