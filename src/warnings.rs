//! Structured, queryable counterpart to the `log::warn!` calls scattered through the
//! decoders (§2.1). Every recoverable decode-time condition is reported both ways:
//! once through `log` for anyone watching the log stream, and once here for callers
//! who want to inspect what happened after a shaping call.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A code point had no entry in `cmap`; glyph id 0 (`.notdef`) was substituted.
    MissingGlyph { codepoint: u32 },
    /// A `GSUB`/`GPOS` lookup subtable used a format or type this engine doesn't
    /// evaluate; the lookup was skipped and the sequence left unchanged.
    UnsupportedLookup { table: &'static str, lookup_type: u16 },
    /// A feature tag requested by the caller or font default has no effect because
    /// it's unrecognized; it is accepted but ignored.
    UnknownFeatureTag { tag: [u8; 4] },
    /// `glyph(id).outline()` failed to decode; `.notdef` was substituted.
    GlyphDecodeFailed { glyph_id: u16 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingGlyph { codepoint } => {
                write!(f, "no glyph for code point U+{codepoint:04X}, using .notdef")
            }
            Warning::UnsupportedLookup { table, lookup_type } => {
                write!(f, "{table}: unsupported lookup type {lookup_type}, lookup skipped")
            }
            Warning::UnknownFeatureTag { tag } => {
                write!(f, "unknown feature tag {:?}, ignored", String::from_utf8_lossy(tag))
            }
            Warning::GlyphDecodeFailed { glyph_id } => {
                write!(f, "glyph {glyph_id} failed to decode, substituted .notdef")
            }
        }
    }
}

/// Accumulates `Warning`s raised during a single shaping call. Each push also goes
/// through `log::warn!`, so the accumulator is for callers that want typed access,
/// not the only place the condition is reported.
#[derive(Debug, Clone, Default)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.0.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Warning] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_records_in_order() {
        let mut warnings = Warnings::new();
        warnings.push(Warning::MissingGlyph { codepoint: 0x41 });
        warnings.push(Warning::UnknownFeatureTag { tag: *b"zzzz" });
        assert_eq!(warnings.as_slice().len(), 2);
        assert!(!warnings.is_empty());
    }
}
