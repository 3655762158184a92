//! The public façade: `Font::load`/`load_file`, glyph queries, and text shaping (§6
//! "External Interfaces"). Holds owned table data plus byte ranges for the tables that
//! are reconstructed fresh on each call (`glyf`/`CFF `/`CFF2`/`GSUB`/`GPOS`) rather than
//! stored as borrowing wrappers, so `Font` itself never borrows from its own buffer.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read as _;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::cached::OutlineCache;
use crate::error::{FontError, Result};
use crate::options::ShapeOptions;
use crate::outline::Outline;
use crate::shaper::{self, TextRun};
use crate::stream::Reader;
use crate::tables::cff::CffTable;
use crate::tables::cmap::CmapTable;
use crate::tables::glyf::GlyfTable;
use crate::tables::head::HeadTable;
use crate::tables::hhea::HheaTable;
use crate::tables::hmtx::HmtxTable;
use crate::tables::layout::gpos::ValueRecord;
use crate::tables::layout::{GposTable, GsubTable};
use crate::tables::loca::LocaTable;
use crate::tables::maxp::MaxpTable;
use crate::tables::name::NameTable;
use crate::tables::{Table, TableRecord};
use crate::warnings::{Warning, Warnings};

const SFNT_VERSION: u32 = 0x0001_0000;
const SFNT_TRUE: u32 = 0x7472_7565; // 'true'
const SFNT_OTTO: u32 = 0x4F54_544F; // 'OTTO'
const SFNT_TYP1: u32 = 0x7479_7031; // 'typ1'

/// Where glyph outlines for this font actually live: TrueType quadratic contours in
/// `glyf`/`loca`, or a `CFF `/`CFF2` charstring index.
#[derive(Debug, Clone)]
enum OutlineSource {
    TrueType { loca: LocaTable, range: (usize, usize) },
    Cff { range: (usize, usize), cff_tag: &'static str },
}

struct FontInner {
    data: Vec<u8>,
    head: HeadTable,
    hhea: HheaTable,
    maxp: MaxpTable,
    hmtx: HmtxTable,
    name: NameTable,
    cmap: CmapTable,
    outline_source: OutlineSource,
    gsub_range: Option<(usize, usize)>,
    gpos_range: Option<(usize, usize)>,
}

impl FontInner {
    fn decode_outline(&self, glyph_id: u16) -> Result<Outline> {
        match &self.outline_source {
            OutlineSource::TrueType { loca, range } => {
                let (start, end) = *range;
                let glyf = GlyfTable::new(&self.data[start..end]);
                glyf.outline(loca, glyph_id, self.maxp.num_glyphs)
            }
            OutlineSource::Cff { range, cff_tag } => {
                let (start, end) = *range;
                let cff = CffTable::parse(&self.data[start..end], cff_tag)?;
                cff.outline(glyph_id)
            }
        }
    }

    fn gsub(&self) -> Result<Option<GsubTable<'_>>> {
        match self.gsub_range {
            Some((start, end)) => Ok(Some(GsubTable::parse(&self.data[start..end])?)),
            None => Ok(None),
        }
    }

    fn gpos(&self) -> Result<Option<GposTable<'_>>> {
        match self.gpos_range {
            Some((start, end)) => Ok(Some(GposTable::parse(&self.data[start..end])?)),
            None => Ok(None),
        }
    }
}

/// A decoded glyph: its outline in font units plus its `hmtx` advance width.
#[derive(Debug, Clone)]
pub struct Glyph {
    outline: Outline,
    advance: u16,
}

impl Glyph {
    pub fn outline(&self) -> &[crate::outline::Contour] {
        &self.outline.contours
    }

    pub fn advance(&self) -> u16 {
        self.advance
    }

    pub fn bbox(&self) -> (f32, f32, f32, f32) {
        let b = self.outline.bbox();
        if b.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            (b.x_min, b.y_min, b.x_max, b.y_max)
        }
    }
}

/// A loaded, immutable-except-for-its-feature-map font. Cheap to clone: every clone
/// shares the same parsed tables, feature map and outline cache (§5).
#[derive(Clone)]
pub struct Font {
    inner: Arc<FontInner>,
    features: Arc<RwLock<HashMap<[u8; 4], bool>>>,
    outlines: OutlineCache,
    default_options: ShapeOptions,
}

fn find_table<'a>(records: &'a [TableRecord], wanted: &[u8; 4]) -> Option<&'a TableRecord> {
    records.iter().find(|r| &r.tag == wanted)
}

fn table_slice<'a>(data: &'a [u8], record: &TableRecord) -> Result<&'a [u8]> {
    let start = record.offset as usize;
    let end = start
        .checked_add(record.length as usize)
        .ok_or(FontError::TruncatedTable {
            offset: start,
            needed: record.length as usize,
            available: data.len(),
        })?;
    data.get(start..end).ok_or(FontError::TruncatedTable {
        offset: start,
        needed: record.length as usize,
        available: data.len(),
    })
}

fn parse_table<T: Table>(data: &[u8], record: &TableRecord) -> Result<T> {
    let slice = table_slice(data, record)?;
    let mut reader = Reader::new(slice);
    T::parse(&mut reader, record.length)
}

fn default_features() -> HashMap<[u8; 4], bool> {
    let mut map = HashMap::new();
    map.insert(*b"kern", true);
    map.insert(*b"liga", true);
    map.insert(*b"calt", true);
    map
}

impl Font {
    /// Parses an in-memory font. Fatal on any structural problem: a bad signature, a
    /// missing required table, or a table whose offset/length runs past the buffer.
    pub fn load(data: Vec<u8>) -> Result<Self> {
        let mut reader = Reader::new(&data);
        let version = reader.read_u32()?;
        if !matches!(version, SFNT_VERSION | SFNT_TRUE | SFNT_OTTO | SFNT_TYP1) {
            return Err(FontError::BadSignature(version));
        }
        let num_tables = reader.read_u16()?;
        reader.skip(2 + 2 + 2)?; // searchRange, entrySelector, rangeShift

        let mut records = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            records.push(TableRecord::parse(&mut reader)?);
        }
        for record in &records {
            table_slice(&data, record)?;
        }

        let head_rec = find_table(&records, b"head").ok_or(FontError::MissingRequiredTable("head"))?;
        let hhea_rec = find_table(&records, b"hhea").ok_or(FontError::MissingRequiredTable("hhea"))?;
        let maxp_rec = find_table(&records, b"maxp").ok_or(FontError::MissingRequiredTable("maxp"))?;
        let hmtx_rec = find_table(&records, b"hmtx").ok_or(FontError::MissingRequiredTable("hmtx"))?;
        let cmap_rec = find_table(&records, b"cmap").ok_or(FontError::MissingRequiredTable("cmap"))?;
        let name_rec = find_table(&records, b"name").ok_or(FontError::MissingRequiredTable("name"))?;

        let head: HeadTable = parse_table(&data, head_rec)?;
        let hhea: HheaTable = parse_table(&data, hhea_rec)?;
        let maxp: MaxpTable = parse_table(&data, maxp_rec)?;
        let name: NameTable = parse_table(&data, name_rec)?;
        let cmap: CmapTable = parse_table(&data, cmap_rec)?;

        let hmtx = {
            let slice = table_slice(&data, hmtx_rec)?;
            let mut r = Reader::new(slice);
            HmtxTable::parse(&mut r, maxp.num_glyphs, hhea.number_of_h_metrics)?
        };

        let outline_source = if let Some(glyf_rec) = find_table(&records, b"glyf") {
            let loca_rec = find_table(&records, b"loca").ok_or(FontError::MissingRequiredTable("loca"))?;
            let loca = {
                let slice = table_slice(&data, loca_rec)?;
                let mut r = Reader::new(slice);
                LocaTable::parse(&mut r, maxp.num_glyphs, head.is_long_loca_format())?
            };
            let start = glyf_rec.offset as usize;
            let end = start + glyf_rec.length as usize;
            OutlineSource::TrueType { loca, range: (start, end) }
        } else if let Some(cff_rec) = find_table(&records, b"CFF ") {
            let start = cff_rec.offset as usize;
            let end = start + cff_rec.length as usize;
            OutlineSource::Cff { range: (start, end), cff_tag: "CFF " }
        } else if let Some(cff2_rec) = find_table(&records, b"CFF2") {
            let start = cff2_rec.offset as usize;
            let end = start + cff2_rec.length as usize;
            OutlineSource::Cff { range: (start, end), cff_tag: "CFF2" }
        } else {
            return Err(FontError::MissingRequiredTable("glyf or CFF"));
        };

        let gsub_range = find_table(&records, b"GSUB")
            .map(|r| (r.offset as usize, r.offset as usize + r.length as usize));
        let gpos_range = find_table(&records, b"GPOS")
            .map(|r| (r.offset as usize, r.offset as usize + r.length as usize));

        let inner = FontInner {
            data,
            head,
            hhea,
            maxp,
            hmtx,
            name,
            cmap,
            outline_source,
            gsub_range,
            gpos_range,
        };

        Ok(Font {
            inner: Arc::new(inner),
            features: Arc::new(RwLock::new(default_features())),
            outlines: OutlineCache::new(),
            default_options: ShapeOptions::default(),
        })
    }

    /// Reads and parses a font file from disk.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Self::load(data)
    }

    pub fn units_per_em(&self) -> u16 {
        self.inner.head.units_per_em
    }

    pub fn num_glyphs(&self) -> u16 {
        self.inner.maxp.num_glyphs
    }

    pub fn family_name(&self) -> Option<&str> {
        self.inner.name.font_family()
    }

    pub fn style_name(&self) -> Option<&str> {
        self.inner.name.style_name()
    }

    pub fn full_name(&self) -> Option<&str> {
        self.inner.name.full_name()
    }

    pub fn default_options(&self) -> &ShapeOptions {
        &self.default_options
    }

    pub fn set_default_options(&mut self, options: ShapeOptions) {
        self.default_options = options;
    }

    /// Looks up `codepoint` via `cmap`; unmapped code points resolve to `.notdef` (id 0).
    pub fn glyph_index(&self, codepoint: char) -> u16 {
        self.inner.cmap.glyph_index(codepoint).unwrap_or(0)
    }

    pub(crate) fn try_glyph_index(&self, codepoint: char) -> Option<u16> {
        self.inner.cmap.glyph_index(codepoint)
    }

    /// Decodes `glyph_id`'s outline (memoized in the outline cache) and pairs it with
    /// its `hmtx` advance. Decode failures are recovered by substituting `.notdef` and
    /// logging a warning; this call never fails.
    pub fn glyph(&self, glyph_id: u16) -> Glyph {
        let advance = self.inner.hmtx.advance_width(glyph_id);
        Glyph { outline: self.outline_or_notdef(glyph_id, None), advance }
    }

    /// Like [`Font::glyph`] but records a decode failure into `warnings` instead of
    /// only logging it; used by the shaper so a `TextRun`'s warnings reflect glyph
    /// decode failures hit while laying out the run.
    pub(crate) fn glyph_reporting(&self, glyph_id: u16, warnings: &mut Warnings) -> Glyph {
        let advance = self.inner.hmtx.advance_width(glyph_id);
        Glyph { outline: self.outline_or_notdef(glyph_id, Some(warnings)), advance }
    }

    fn outline_or_notdef(&self, glyph_id: u16, mut warnings: Option<&mut Warnings>) -> Outline {
        let inner = Arc::clone(&self.inner);
        let decoded = self
            .outlines
            .get_or_decode(glyph_id, || inner.decode_outline(glyph_id));
        match decoded {
            Ok(outline) => outline,
            Err(err) => {
                if let Some(w) = warnings.as_mut() {
                    w.push(Warning::GlyphDecodeFailed { glyph_id });
                } else {
                    log::warn!("glyph {glyph_id} failed to decode ({err}), substituting .notdef");
                }
                if glyph_id == 0 {
                    Outline::new()
                } else {
                    self.outline_or_notdef(0, warnings)
                }
            }
        }
    }

    pub(crate) fn hmtx_advance(&self, glyph_id: u16) -> u16 {
        self.inner.hmtx.advance_width(glyph_id)
    }

    pub(crate) fn ascent(&self) -> i16 {
        self.inner.hhea.ascent
    }

    pub(crate) fn descent(&self) -> i16 {
        self.inner.hhea.descent
    }

    pub(crate) fn line_height(&self) -> i32 {
        self.inner.hhea.line_height()
    }

    /// Returns the enabled feature tags for this font layered with `overrides`, in no
    /// particular order (lookup order, not feature order, governs application). Any
    /// enabled tag this font's `GSUB`/`GPOS` `FeatureList`s never declare is recorded
    /// into `warnings` and still returned (it simply never matches a lookup).
    pub(crate) fn enabled_feature_tags(
        &self,
        overrides: &HashMap<[u8; 4], bool>,
        warnings: &mut Warnings,
    ) -> Vec<[u8; 4]> {
        let features = self.features.read().unwrap();
        let mut enabled: HashMap<[u8; 4], bool> = features.clone();
        for (&t, &on) in overrides {
            enabled.insert(t, on);
        }
        drop(features);

        let known = self.known_feature_tags();
        enabled
            .into_iter()
            .filter(|&(_, on)| on)
            .map(|(t, _)| t)
            .map(|t| {
                if !known.contains(&t) {
                    warnings.push(Warning::UnknownFeatureTag { tag: t });
                }
                t
            })
            .collect()
    }

    /// Every feature tag considered recognized by this font: the engine's defaults
    /// plus whatever tags `GSUB`/`GPOS` actually declare in their `FeatureList`s.
    fn known_feature_tags(&self) -> std::collections::HashSet<[u8; 4]> {
        let mut tags: std::collections::HashSet<[u8; 4]> = default_features().into_keys().collect();
        if let Ok(Some(gsub)) = self.inner.gsub() {
            tags.extend(gsub.feature_tags().unwrap_or_default());
        }
        if let Ok(Some(gpos)) = self.inner.gpos() {
            tags.extend(gpos.feature_tags().unwrap_or_default());
        }
        tags
    }

    pub(crate) fn apply_gsub(
        &self,
        glyphs: &[u16],
        feature_tags: &[[u8; 4]],
        warnings: &mut Warnings,
    ) -> Vec<u16> {
        let gsub = match self.inner.gsub() {
            Ok(gsub) => gsub,
            Err(err) => {
                log::warn!("GSUB: {err}, leaving glyph sequence unchanged");
                return glyphs.to_vec();
            }
        };
        match gsub {
            Some(gsub) => match gsub.substitute(glyphs, feature_tags, warnings) {
                Ok(out) => out,
                Err(err) => {
                    log::warn!("GSUB: {err}, leaving glyph sequence unchanged");
                    glyphs.to_vec()
                }
            },
            None => glyphs.to_vec(),
        }
    }

    pub(crate) fn apply_gpos(
        &self,
        glyphs: &[u16],
        feature_tags: &[[u8; 4]],
        warnings: &mut Warnings,
    ) -> Vec<ValueRecord> {
        let gpos = match self.inner.gpos() {
            Ok(gpos) => gpos,
            Err(err) => {
                log::warn!("GPOS: {err}, leaving glyph positions at zero");
                return vec![ValueRecord::default(); glyphs.len()];
            }
        };
        match gpos {
            Some(gpos) => match gpos.position(glyphs, feature_tags, warnings) {
                Ok(out) => out,
                Err(err) => {
                    log::warn!("GPOS: {err}, leaving glyph positions at zero");
                    vec![ValueRecord::default(); glyphs.len()]
                }
            },
            None => vec![ValueRecord::default(); glyphs.len()],
        }
    }

    /// Reads the current state of a feature tag (the dynamic mapping in §6).
    pub fn is_feature_enabled(&self, feature_tag: [u8; 4]) -> bool {
        self.features.read().unwrap().get(&feature_tag).copied().unwrap_or(false)
    }

    /// Enables or disables a feature tag for every future shaping call on this `Font`
    /// (and every clone of it, since the map is shared).
    pub fn set_feature(&self, feature_tag: [u8; 4], enabled: bool) {
        self.features.write().unwrap().insert(feature_tag, enabled);
    }

    /// Snapshot of the current feature-tag mapping.
    pub fn features(&self) -> HashMap<[u8; 4], bool> {
        self.features.read().unwrap().clone()
    }

    /// Pre-decodes outlines for `glyph_ids` so a later `text`/`glyph` call doesn't pay
    /// first-decode cost under lock contention.
    pub fn warm(&self, glyph_ids: impl IntoIterator<Item = u16>) {
        let inner = Arc::clone(&self.inner);
        self.outlines.warm(glyph_ids, move |id| inner.decode_outline(id));
    }

    /// Shapes `text` into positioned glyphs per `options` (§4.9).
    pub fn text(&self, text: &str, options: &ShapeOptions) -> TextRun {
        shaper::shape(self, text, options)
    }

    /// Convenience wrapper around [`Font::text`] using this font's `default_options`.
    pub fn text_default(&self, text: &str) -> TextRun {
        self.text(text, &self.default_options)
    }

    /// The pixel-space `(width, height)` a shaped run of `text` would occupy.
    pub fn size_of(&self, text: &str, options: &ShapeOptions) -> (f32, f32) {
        self.text(text, options).pixel_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_table_record(out: &mut Vec<u8>, tag: &[u8; 4], offset: u32, length: u32) {
        out.extend_from_slice(tag);
        out.extend_from_slice(&0u32.to_be_bytes()); // checksum, unchecked here
        out.extend_from_slice(&offset.to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
    }

    fn pad4(buf: &mut Vec<u8>) {
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
    }

    /// Builds a minimal valid SFNT: head/hhea/maxp/hmtx/cmap/name/loca/glyf for one
    /// empty glyph, enough for `Font::load` to succeed.
    fn minimal_font_bytes() -> Vec<u8> {
        let mut head = Vec::new();
        head.extend_from_slice(&1u32.to_be_bytes());
        head.extend_from_slice(&0x00010000u32.to_be_bytes());
        head.extend_from_slice(&0u32.to_be_bytes());
        head.extend_from_slice(&HeadTable::MAGIC_NUMBER.to_be_bytes());
        head.extend_from_slice(&0u16.to_be_bytes());
        head.extend_from_slice(&1000u16.to_be_bytes()); // unitsPerEm
        head.extend_from_slice(&0u64.to_be_bytes());
        head.extend_from_slice(&0u64.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes());
        head.extend_from_slice(&0u16.to_be_bytes());
        head.extend_from_slice(&9u16.to_be_bytes());
        head.extend_from_slice(&2i16.to_be_bytes());
        head.extend_from_slice(&0i16.to_be_bytes()); // short loca
        head.extend_from_slice(&0i16.to_be_bytes());

        let mut hhea = Vec::new();
        hhea.extend_from_slice(&0x00010000u32.to_be_bytes());
        hhea.extend_from_slice(&800i16.to_be_bytes());
        hhea.extend_from_slice(&(-200i16).to_be_bytes());
        hhea.extend_from_slice(&0i16.to_be_bytes());
        hhea.extend(std::iter::repeat(0u8).take(24));
        hhea.extend_from_slice(&1u16.to_be_bytes());

        let mut maxp = Vec::new();
        maxp.extend_from_slice(&0x00005000u32.to_be_bytes());
        maxp.extend_from_slice(&1u16.to_be_bytes()); // one glyph

        let mut hmtx = Vec::new();
        hmtx.extend_from_slice(&500u16.to_be_bytes());
        hmtx.extend_from_slice(&0i16.to_be_bytes());

        // cmap: format 0, maps 'A' (0x41) -> glyph 0 (everything maps to .notdef)
        let mut cmap = Vec::new();
        cmap.extend_from_slice(&0u16.to_be_bytes()); // version
        cmap.extend_from_slice(&1u16.to_be_bytes()); // numTables
        cmap.extend_from_slice(&3u16.to_be_bytes()); // platform windows
        cmap.extend_from_slice(&1u16.to_be_bytes()); // encoding unicode BMP
        cmap.extend_from_slice(&12u32.to_be_bytes()); // offset to subtable
        cmap.extend_from_slice(&0u16.to_be_bytes()); // format 0
        cmap.extend_from_slice(&262u16.to_be_bytes()); // length
        cmap.extend_from_slice(&0u16.to_be_bytes()); // language
        let glyph_id_array = [0u8; 256];
        cmap.extend_from_slice(&glyph_id_array);

        let name = vec![0u8, 0, 0, 0, 6, 0, 0]; // format 0, count 0, stringOffset 6

        let loca = {
            let mut d = Vec::new();
            d.extend_from_slice(&0u16.to_be_bytes());
            d.extend_from_slice(&0u16.to_be_bytes());
            d
        };
        let glyf: Vec<u8> = Vec::new();

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
    fn loads_minimal_font_and_reports_metrics() {
        let font = Font::load(minimal_font_bytes()).unwrap();
        assert_eq!(font.units_per_em(), 1000);
        assert_eq!(font.num_glyphs(), 1);
        assert_eq!(font.glyph_index('Z'), 0);
    }

    #[test]
    fn rejects_bad_signature() {
        let err = Font::load(vec![0, 0, 0, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FontError::BadSignature(_)));
    }

    #[test]
    fn default_features_enable_kerning_and_ligatures() {
        let font = Font::load(minimal_font_bytes()).unwrap();
        assert!(font.is_feature_enabled(*b"kern"));
        assert!(font.is_feature_enabled(*b"liga"));
        assert!(!font.is_feature_enabled(*b"smcp"));
    }

    #[test]
    fn clone_shares_feature_state() {
        let font = Font::load(minimal_font_bytes()).unwrap();
        let clone = font.clone();
        clone.set_feature(*b"kern", false);
        assert!(!font.is_feature_enabled(*b"kern"));
    }

    #[test]
    fn empty_glyph_decodes_to_an_empty_outline() {
        let font = Font::load(minimal_font_bytes()).unwrap();
        let glyph = font.glyph(0);
        assert_eq!(glyph.advance(), 500);
        assert!(glyph.outline().is_empty());
    }

    #[test]
    fn out_of_range_glyph_id_falls_back_to_notdef() {
        let font = Font::load(minimal_font_bytes()).unwrap();
        let glyph = font.glyph(7);
        assert!(glyph.outline().is_empty());
    }
}
