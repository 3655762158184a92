//! glyph-path: decodes TrueType/OpenType fonts and lays out text as positioned glyph
//! outlines, ready to be turned into path data by a renderer-specific layer.

mod cached;
mod error;
mod font;
mod options;
mod outline;
mod path;
mod shaper;
mod stream;
mod tables;
mod warnings;

pub use cached::OutlineCache;
pub use error::{FontError, Result};
pub use font::{Font, Glyph};
pub use options::{HAlign, RotationMode, ShapeOptions, VAlign};
pub use outline::{BBox, Contour, Outline, Segment};
pub use path::{emit_path, PathCommand};
pub use shaper::{PositionedGlyph, TextRun};
pub use stream::{calculate_checksum, Reader};
pub use tables::cff::CffTable;
pub use tables::cmap::CmapTable;
pub use tables::glyf::GlyfTable;
pub use tables::head::HeadTable;
pub use tables::hhea::HheaTable;
pub use tables::hmtx::HmtxTable;
pub use tables::layout::{classdef::ClassDef, coverage::Coverage, GposTable, GsubTable, ValueRecord};
pub use tables::loca::LocaTable;
pub use tables::maxp::MaxpTable;
pub use tables::name::NameTable;
pub use tables::{Table, TableRecord};
pub use warnings::{Warning, Warnings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_exports_resolve() {
        let _ = ShapeOptions::default();
        let _ = OutlineCache::new();
    }
}
