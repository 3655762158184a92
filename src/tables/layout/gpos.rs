use crate::error::{FontError, Result};
use crate::stream::Reader;
use crate::tables::layout::classdef::ClassDef;
use crate::tables::layout::common::LayoutHeader;
use crate::tables::layout::coverage::Coverage;
use crate::warnings::{Warning, Warnings};

/// The positioning delta produced by a `GPOS` lookup, accumulated onto a glyph
/// (§4.8). `dx`/`dy` shift the glyph's drawn position; `advance_dx`/`advance_dy`
/// adjust the pen advance that follows it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueRecord {
    pub dx: i32,
    pub dy: i32,
    pub advance_dx: i32,
    pub advance_dy: i32,
}

impl ValueRecord {
    fn accumulate(&mut self, other: ValueRecord) {
        self.dx += other.dx;
        self.dy += other.dy;
        self.advance_dx += other.advance_dx;
        self.advance_dy += other.advance_dy;
    }
}

const VALUE_X_PLACEMENT: u16 = 0x0001;
const VALUE_Y_PLACEMENT: u16 = 0x0002;
const VALUE_X_ADVANCE: u16 = 0x0004;
const VALUE_Y_ADVANCE: u16 = 0x0008;
const VALUE_X_PLA_DEVICE: u16 = 0x0010;
const VALUE_Y_PLA_DEVICE: u16 = 0x0020;
const VALUE_X_ADV_DEVICE: u16 = 0x0040;
const VALUE_Y_ADV_DEVICE: u16 = 0x0080;

/// `GPOS` — glyph positioning lookups (types 1, 2, 4, 6, 9; see §4.8).
pub struct GposTable<'a> {
    header: LayoutHeader<'a>,
}

impl<'a> GposTable<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Ok(GposTable {
            header: LayoutHeader::parse(data)?,
        })
    }

    /// Every feature tag this table's `FeatureList` declares.
    pub fn feature_tags(&self) -> Result<Vec<[u8; 4]>> {
        self.header.feature_tags()
    }

    /// One accumulated adjustment per glyph, in the same order as `glyphs`. A lookup
    /// that fails (unsupported type/format, malformed subtable) is recorded into
    /// `warnings` and skipped rather than aborting the whole call, so earlier
    /// successfully-applied lookups are preserved.
    pub fn position(
        &self,
        glyphs: &[u16],
        feature_tags: &[[u8; 4]],
        warnings: &mut Warnings,
    ) -> Result<Vec<ValueRecord>> {
        let mut adjustments = vec![ValueRecord::default(); glyphs.len()];
        for lookup_index in self.header.enabled_lookups(feature_tags)? {
            if let Err(e) = self.apply_lookup(lookup_index, glyphs, &mut adjustments, warnings) {
                Self::report_skip(lookup_index, e, warnings);
            }
        }
        Ok(adjustments)
    }

    /// Records why `lookup_index` was skipped: a typed warning for an unsupported
    /// lookup type, a log line for anything else (malformed subtable, truncated data).
    fn report_skip(lookup_index: u16, err: FontError, warnings: &mut Warnings) {
        match err {
            FontError::UnsupportedLookup(lookup_type, table) => {
                warnings.push(Warning::UnsupportedLookup { table, lookup_type });
            }
            other => log::warn!("GPOS: lookup {lookup_index} failed ({other}), skipping"),
        }
    }

    fn apply_lookup(
        &self,
        lookup_index: u16,
        glyphs: &[u16],
        adjustments: &mut [ValueRecord],
        warnings: &mut Warnings,
    ) -> Result<()> {
        let Some((lookup_type, subtables)) = self.header.lookup_subtable(lookup_index)? else {
            return Ok(());
        };
        self.apply_lookup_type(lookup_type, &subtables, glyphs, adjustments, warnings)
    }

    fn apply_lookup_type(
        &self,
        lookup_type: u16,
        subtables: &[usize],
        glyphs: &[u16],
        adjustments: &mut [ValueRecord],
        warnings: &mut Warnings,
    ) -> Result<()> {
        match lookup_type {
            1 => self.apply_single(subtables, glyphs, adjustments),
            2 => self.apply_pair(subtables, glyphs, adjustments),
            4 | 6 => self.apply_mark_attachment(subtables, glyphs, adjustments),
            9 => self.apply_extension(subtables, glyphs, adjustments, warnings),
            other => Err(FontError::UnsupportedLookup(other, "GPOS")),
        }
    }

    /// A reader over the whole table, positioned at the given absolute offset.
    fn reader_at(&self, offset: usize) -> Result<Reader<'a>> {
        let data = self.header.data();
        let mut r = Reader::new(data);
        r.set_position(offset)?;
        Ok(r)
    }

    fn read_value_record(r: &mut Reader, format: u16) -> Result<ValueRecord> {
        let mut v = ValueRecord::default();
        if format & VALUE_X_PLACEMENT != 0 {
            v.dx = r.read_i16()? as i32;
        }
        if format & VALUE_Y_PLACEMENT != 0 {
            v.dy = r.read_i16()? as i32;
        }
        if format & VALUE_X_ADVANCE != 0 {
            v.advance_dx = r.read_i16()? as i32;
        }
        if format & VALUE_Y_ADVANCE != 0 {
            v.advance_dy = r.read_i16()? as i32;
        }
        // Device table offsets carry hinting-only adjustments at specific ppem sizes;
        // this engine positions in design units and never applies them, but still has
        // to step over them to keep the reader aligned with the next record.
        for bit in [
            VALUE_X_PLA_DEVICE,
            VALUE_Y_PLA_DEVICE,
            VALUE_X_ADV_DEVICE,
            VALUE_Y_ADV_DEVICE,
        ] {
            if format & bit != 0 {
                let _ = r.read_u16()?;
            }
        }
        Ok(v)
    }

    /// Anchor tables: format 1 gives (x, y) directly; formats 2 and 3 add a contour
    /// point index / device table offsets we don't resolve, so they're read as format 1.
    fn read_anchor(r: &mut Reader) -> Result<(f32, f32)> {
        let _format = r.read_u16()?;
        let x = r.read_i16()? as f32;
        let y = r.read_i16()? as f32;
        Ok((x, y))
    }

    fn apply_single(
        &self,
        subtables: &[usize],
        glyphs: &[u16],
        adjustments: &mut [ValueRecord],
    ) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let format = r.read_u16()?;
            let coverage_offset = r.read_u16()?;
            let value_format = r.read_u16()?;
            let coverage = Coverage::parse(&mut self.reader_at(offset + coverage_offset as usize)?)?;

            match format {
                1 => {
                    let value = Self::read_value_record(&mut r, value_format)?;
                    for (i, &g) in glyphs.iter().enumerate() {
                        if coverage.contains(g) {
                            adjustments[i].accumulate(value);
                        }
                    }
                }
                _ => {
                    let count = r.read_u16()?;
                    let mut values = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        values.push(Self::read_value_record(&mut r, value_format)?);
                    }
                    for (i, &g) in glyphs.iter().enumerate() {
                        if let Some(idx) = coverage.index_of(g) {
                            if let Some(&value) = values.get(idx as usize) {
                                adjustments[i].accumulate(value);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_pair(
        &self,
        subtables: &[usize],
        glyphs: &[u16],
        adjustments: &mut [ValueRecord],
    ) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let format = r.read_u16()?;
            let coverage_offset = r.read_u16()?;
            let value_format1 = r.read_u16()?;
            let value_format2 = r.read_u16()?;
            let coverage = Coverage::parse(&mut self.reader_at(offset + coverage_offset as usize)?)?;

            match format {
                1 => {
                    let pair_set_count = r.read_u16()?;
                    let mut pair_set_offsets = Vec::with_capacity(pair_set_count as usize);
                    for _ in 0..pair_set_count {
                        pair_set_offsets.push(r.read_u16()?);
                    }

                    let mut i = 0;
                    while i + 1 < glyphs.len() {
                        let mut consumed_pair = false;
                        if let Some(idx) = coverage.index_of(glyphs[i]) {
                            if let Some(&pair_set_offset) = pair_set_offsets.get(idx as usize) {
                                let mut pr = self.reader_at(offset + pair_set_offset as usize)?;
                                let pair_count = pr.read_u16()?;
                                for _ in 0..pair_count {
                                    let second_glyph = pr.read_u16()?;
                                    let v1 = Self::read_value_record(&mut pr, value_format1)?;
                                    let v2 = Self::read_value_record(&mut pr, value_format2)?;
                                    if second_glyph == glyphs[i + 1] {
                                        adjustments[i].accumulate(v1);
                                        adjustments[i + 1].accumulate(v2);
                                        consumed_pair = true;
                                        break;
                                    }
                                }
                            }
                        }
                        i += if consumed_pair { 2 } else { 1 };
                    }
                }
                _ => {
                    let class_def1_offset = r.read_u16()?;
                    let class_def2_offset = r.read_u16()?;
                    let class1_count = r.read_u16()?;
                    let class2_count = r.read_u16()?;
                    let class_def1 =
                        ClassDef::parse(&mut self.reader_at(offset + class_def1_offset as usize)?)?;
                    let class_def2 =
                        ClassDef::parse(&mut self.reader_at(offset + class_def2_offset as usize)?)?;

                    let mut matrix = Vec::with_capacity(class1_count as usize);
                    for _ in 0..class1_count {
                        let mut row = Vec::with_capacity(class2_count as usize);
                        for _ in 0..class2_count {
                            let v1 = Self::read_value_record(&mut r, value_format1)?;
                            let v2 = Self::read_value_record(&mut r, value_format2)?;
                            row.push((v1, v2));
                        }
                        matrix.push(row);
                    }

                    let mut i = 0;
                    while i + 1 < glyphs.len() {
                        let mut consumed_pair = false;
                        if coverage.contains(glyphs[i]) {
                            let c1 = class_def1.class_of(glyphs[i]) as usize;
                            let c2 = class_def2.class_of(glyphs[i + 1]) as usize;
                            if let Some(&(v1, v2)) =
                                matrix.get(c1).and_then(|row| row.get(c2))
                            {
                                adjustments[i].accumulate(v1);
                                adjustments[i + 1].accumulate(v2);
                                consumed_pair = true;
                            }
                        }
                        i += if consumed_pair { 2 } else { 1 };
                    }
                }
            }
        }
        Ok(())
    }

    /// Shared by `MarkBasePos` (type 4) and `MarkMarkPos` (type 6): both attach a mark
    /// glyph to the anchor of the nearest preceding covered glyph sharing its mark class.
    fn apply_mark_attachment(
        &self,
        subtables: &[usize],
        glyphs: &[u16],
        adjustments: &mut [ValueRecord],
    ) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let _format = r.read_u16()?;
            let mark_coverage_offset = r.read_u16()?;
            let base_coverage_offset = r.read_u16()?;
            let mark_class_count = r.read_u16()?;
            let mark_array_offset = r.read_u16()?;
            let base_array_offset = r.read_u16()?;

            let mark_coverage =
                Coverage::parse(&mut self.reader_at(offset + mark_coverage_offset as usize)?)?;
            let base_coverage =
                Coverage::parse(&mut self.reader_at(offset + base_coverage_offset as usize)?)?;

            let mark_array_base = offset + mark_array_offset as usize;
            let base_array_base = offset + base_array_offset as usize;

            for i in 0..glyphs.len() {
                let Some(mark_index) = mark_coverage.index_of(glyphs[i]) else {
                    continue;
                };
                let Some(base_pos) = (0..i).rev().find(|&j| base_coverage.contains(glyphs[j]))
                else {
                    continue;
                };
                let base_index = base_coverage.index_of(glyphs[base_pos]).unwrap();

                let mut mr = self.reader_at(mark_array_base)?;
                let mark_count = mr.read_u16()?;
                if mark_index >= mark_count {
                    continue;
                }
                let mut record = self.reader_at(mark_array_base + 2 + mark_index as usize * 4)?;
                let mark_class = record.read_u16()?;
                let mark_anchor_offset = record.read_u16()?;
                let (mark_x, mark_y) = Self::read_anchor(
                    &mut self.reader_at(mark_array_base + mark_anchor_offset as usize)?,
                )?;

                let mut br = self.reader_at(base_array_base)?;
                let base_count = br.read_u16()?;
                if base_index >= base_count {
                    continue;
                }
                let record_offset = base_array_base
                    + 2
                    + base_index as usize * mark_class_count as usize * 2
                    + mark_class as usize * 2;
                let mut bar = self.reader_at(record_offset)?;
                let base_anchor_offset = bar.read_u16()?;
                if base_anchor_offset == 0 {
                    continue;
                }
                let (base_x, base_y) = Self::read_anchor(
                    &mut self.reader_at(base_array_base + base_anchor_offset as usize)?,
                )?;

                adjustments[i].dx += (base_x - mark_x) as i32;
                adjustments[i].dy += (base_y - mark_y) as i32;
            }
        }
        Ok(())
    }

    fn apply_extension(
        &self,
        subtables: &[usize],
        glyphs: &[u16],
        adjustments: &mut [ValueRecord],
        warnings: &mut Warnings,
    ) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let _format = r.read_u16()?;
            let extension_lookup_type = r.read_u16()?;
            let extension_offset = r.read_u32()?;
            if let Err(e) = self.apply_lookup_type(
                extension_lookup_type,
                &[offset + extension_offset as usize],
                glyphs,
                adjustments,
                warnings,
            ) {
                Self::report_skip(extension_lookup_type, e, warnings);
            }
        }
        Ok(())
    }
}
