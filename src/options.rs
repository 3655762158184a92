//! `ShapeOptions` — the explicit, per-call configuration value used in place of
//! process-wide layout globals.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Base,
    Bottom,
}

/// Where rotation pivots relative to alignment (§9, Open Question b).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Rotate about the line origin after alignment is computed.
    Default,
    /// Rotate about the block bbox's top-left corner before alignment is computed
    /// on the rotated block.
    Anchor,
}

/// Per-call shaping/layout/rendering configuration (§6 "Font query interface" and
/// "Configuration surface").
#[derive(Debug, Clone)]
pub struct ShapeOptions {
    pub size: f32,
    pub color: Option<String>,
    pub halign: HAlign,
    pub valign: VAlign,
    pub linespacing: f32,
    pub rotation: f32,
    pub rotation_mode: RotationMode,
    /// Per-call overrides layered on top of the font's `features` mapping; `None`
    /// entries are not present here, only tags this call wants to flip.
    pub feature_overrides: HashMap<[u8; 4], bool>,
    /// Emit each distinct glyph outline once and reference it by position (`true`,
    /// "svg2" reuse mode) versus duplicating outlines inline per occurrence.
    pub reuse: bool,
    pub precision: usize,
    /// Ask the layout for extra debug geometry (baseline, glyph bboxes, origin marks).
    pub debug: bool,
}

impl Default for ShapeOptions {
    fn default() -> Self {
        ShapeOptions {
            size: 48.0,
            color: None,
            halign: HAlign::Left,
            valign: VAlign::Base,
            linespacing: 1.0,
            rotation: 0.0,
            rotation_mode: RotationMode::Default,
            feature_overrides: HashMap::new(),
            reuse: true,
            precision: 2,
            debug: false,
        }
    }
}

impl ShapeOptions {
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_feature(mut self, tag: [u8; 4], enabled: bool) -> Self {
        self.feature_overrides.insert(tag, enabled);
        self
    }
}
