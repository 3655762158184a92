use std::io;

pub type Result<T> = std::result::Result<T, FontError>;

/// Errors produced while loading a font or decoding an individual glyph.
///
/// Parse-time errors returned from [`crate::Font::load`]/[`crate::Font::load_file`] are fatal:
/// the `Font` is never constructed. Decode-time errors surfaced from glyph outline decoding
/// are recovered by the caller substituting `.notdef`; they are returned here so a caller that
/// wants to know *why* still can.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("bad SFNT signature: {0:#x}")]
    BadSignature(u32),

    #[error("truncated table: needed {needed} bytes at offset {offset}, have {available}")]
    TruncatedTable {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("missing required table: {0}")]
    MissingRequiredTable(&'static str),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported lookup type {0} in {1}")]
    UnsupportedLookup(u16, &'static str),

    #[error("unsupported CFF charstring operator {0:#x}")]
    UnsupportedOp(u8),

    #[error("compound glyph recursion exceeded depth {0}")]
    CompoundDepth(u32),

    #[error("CFF charstring VM error: {0}")]
    CharstringVM(&'static str),

    #[error("glyph id {0} is out of range")]
    BadGlyphId(u32),

    #[error("unsupported cmap subtable format {0}")]
    BadCmapSubtable(u16),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_table_name_in_missing_table() {
        let err = FontError::MissingRequiredTable("cmap");
        assert_eq!(err.to_string(), "missing required table: cmap");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "nope");
        let err: FontError = io_err.into();
        assert!(matches!(err, FontError::Io(_)));
    }
}
