use crate::error::{FontError, Result};
use crate::stream::Reader;
use crate::tables::layout::classdef::ClassDef;
use crate::tables::layout::common::LayoutHeader;
use crate::tables::layout::coverage::Coverage;
use crate::warnings::{Warning, Warnings};

/// `GSUB` — glyph substitution lookups (types 1, 2, 3, 4, 6, 7; see §4.7).
pub struct GsubTable<'a> {
    header: LayoutHeader<'a>,
}

impl<'a> GsubTable<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Ok(GsubTable {
            header: LayoutHeader::parse(data)?,
        })
    }

    /// Every feature tag this table's `FeatureList` declares.
    pub fn feature_tags(&self) -> Result<Vec<[u8; 4]>> {
        self.header.feature_tags()
    }

    /// Applies every lookup enabled by `feature_tags`, in `LookupList` order, to `glyphs`.
    /// A lookup that fails (unsupported type/format, malformed subtable) is recorded into
    /// `warnings` and skipped rather than aborting the whole call, so earlier
    /// successfully-applied lookups are preserved.
    pub fn substitute(&self, glyphs: &[u16], feature_tags: &[[u8; 4]], warnings: &mut Warnings) -> Result<Vec<u16>> {
        let mut sequence = glyphs.to_vec();
        for lookup_index in self.header.enabled_lookups(feature_tags)? {
            if let Err(e) = self.apply_lookup(lookup_index, &mut sequence, warnings) {
                Self::report_skip("GSUB", lookup_index, e, warnings);
            }
        }
        Ok(sequence)
    }

    /// Records why `lookup_index` was skipped: a typed warning for an unsupported
    /// lookup type, a log line for anything else (malformed subtable, truncated data).
    fn report_skip(context: &'static str, lookup_index: u16, err: FontError, warnings: &mut Warnings) {
        match err {
            FontError::UnsupportedLookup(lookup_type, table) => {
                warnings.push(Warning::UnsupportedLookup { table, lookup_type });
            }
            other => log::warn!("{context}: lookup {lookup_index} failed ({other}), skipping"),
        }
    }

    fn apply_lookup(&self, lookup_index: u16, sequence: &mut Vec<u16>, warnings: &mut Warnings) -> Result<()> {
        let Some((lookup_type, subtables)) = self.header.lookup_subtable(lookup_index)? else {
            return Ok(());
        };
        self.apply_lookup_type(lookup_type, &subtables, sequence, warnings)
    }

    fn apply_lookup_type(
        &self,
        lookup_type: u16,
        subtables: &[usize],
        sequence: &mut Vec<u16>,
        warnings: &mut Warnings,
    ) -> Result<()> {
        match lookup_type {
            1 => self.apply_single(subtables, sequence),
            2 => self.apply_multiple(subtables, sequence),
            3 => self.apply_alternate(subtables, sequence),
            4 => self.apply_ligature(subtables, sequence),
            6 => self.apply_chaining(subtables, sequence, warnings),
            7 => self.apply_extension(subtables, sequence, warnings),
            other => Err(FontError::UnsupportedLookup(other, "GSUB")),
        }
    }

    /// A reader over the whole table, positioned at the given absolute offset, so that
    /// nested `offset + relative_offset` arithmetic elsewhere stays in absolute coordinates.
    fn reader_at(&self, offset: usize) -> Result<Reader<'a>> {
        let data = self.header.data();
        let mut r = Reader::new(data);
        r.set_position(offset)?;
        Ok(r)
    }

    fn apply_single(&self, subtables: &[usize], sequence: &mut Vec<u16>) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let format = r.read_u16()?;
            let coverage_offset = r.read_u16()?;
            let coverage = Coverage::parse(&mut self.reader_at(offset + coverage_offset as usize)?)?;

            match format {
                1 => {
                    let delta = r.read_i16()?;
                    for g in sequence.iter_mut() {
                        if coverage.contains(*g) {
                            *g = (*g as i32 + delta as i32) as u16;
                        }
                    }
                }
                _ => {
                    let count = r.read_u16()?;
                    let mut substitutes = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        substitutes.push(r.read_u16()?);
                    }
                    for g in sequence.iter_mut() {
                        if let Some(idx) = coverage.index_of(*g) {
                            if let Some(&s) = substitutes.get(idx as usize) {
                                *g = s;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_multiple(&self, subtables: &[usize], sequence: &mut Vec<u16>) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let _format = r.read_u16()?;
            let coverage_offset = r.read_u16()?;
            let coverage = Coverage::parse(&mut self.reader_at(offset + coverage_offset as usize)?)?;
            let seq_count = r.read_u16()?;
            let mut seq_offsets = Vec::with_capacity(seq_count as usize);
            for _ in 0..seq_count {
                seq_offsets.push(r.read_u16()?);
            }

            let mut i = 0;
            while i < sequence.len() {
                if let Some(idx) = coverage.index_of(sequence[i]) {
                    if let Some(&seq_offset) = seq_offsets.get(idx as usize) {
                        let mut sr = self.reader_at(offset + seq_offset as usize)?;
                        let count = sr.read_u16()?;
                        let mut replacement = Vec::with_capacity(count as usize);
                        for _ in 0..count {
                            replacement.push(sr.read_u16()?);
                        }
                        let n = replacement.len();
                        sequence.splice(i..i + 1, replacement);
                        i += n;
                        continue;
                    }
                }
                i += 1;
            }
        }
        Ok(())
    }

    fn apply_alternate(&self, subtables: &[usize], sequence: &mut Vec<u16>) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let _format = r.read_u16()?;
            let coverage_offset = r.read_u16()?;
            let coverage = Coverage::parse(&mut self.reader_at(offset + coverage_offset as usize)?)?;
            let set_count = r.read_u16()?;
            let mut set_offsets = Vec::with_capacity(set_count as usize);
            for _ in 0..set_count {
                set_offsets.push(r.read_u16()?);
            }

            for g in sequence.iter_mut() {
                if let Some(idx) = coverage.index_of(*g) {
                    if let Some(&set_offset) = set_offsets.get(idx as usize) {
                        let mut sr = self.reader_at(offset + set_offset as usize)?;
                        let alt_count = sr.read_u16()?;
                        if alt_count > 0 {
                            // Default to alternate index 0; feature-driven selection of a
                            // different index is a caller-side concern this engine doesn't expose.
                            *g = sr.read_u16()?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_ligature(&self, subtables: &[usize], sequence: &mut Vec<u16>) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let _format = r.read_u16()?;
            let coverage_offset = r.read_u16()?;
            let coverage = Coverage::parse(&mut self.reader_at(offset + coverage_offset as usize)?)?;
            let set_count = r.read_u16()?;
            let mut set_offsets = Vec::with_capacity(set_count as usize);
            for _ in 0..set_count {
                set_offsets.push(r.read_u16()?);
            }

            let mut i = 0;
            'outer: while i < sequence.len() {
                if let Some(idx) = coverage.index_of(sequence[i]) {
                    if let Some(&set_offset) = set_offsets.get(idx as usize) {
                        let lig_set_reader = self.reader_at(offset + set_offset as usize)?;
                        let mut sr = lig_set_reader.clone();
                        let lig_count = sr.read_u16()?;
                        let mut lig_offsets = Vec::with_capacity(lig_count as usize);
                        for _ in 0..lig_count {
                            lig_offsets.push(sr.read_u16()?);
                        }

                        // Greedy longest-match-first among ligatures sharing this first glyph.
                        let mut candidates: Vec<(u16, Vec<u16>)> = Vec::new();
                        for lig_offset in lig_offsets {
                            let mut lr = self.reader_at(offset + set_offset as usize + lig_offset as usize)?;
                            let lig_glyph = lr.read_u16()?;
                            let component_count = lr.read_u16()?;
                            let mut tail = Vec::with_capacity(component_count.saturating_sub(1) as usize);
                            for _ in 1..component_count {
                                tail.push(lr.read_u16()?);
                            }
                            candidates.push((lig_glyph, tail));
                        }
                        candidates.sort_by_key(|(_, tail)| std::cmp::Reverse(tail.len()));

                        for (lig_glyph, tail) in candidates {
                            if i + 1 + tail.len() <= sequence.len()
                                && sequence[i + 1..i + 1 + tail.len()] == tail[..]
                            {
                                sequence.splice(i..i + 1 + tail.len(), [lig_glyph]);
                                i += 1;
                                continue 'outer;
                            }
                        }
                    }
                }
                i += 1;
            }
        }
        Ok(())
    }

    fn apply_extension(
        &self,
        subtables: &[usize],
        sequence: &mut Vec<u16>,
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
                sequence,
                warnings,
            ) {
                Self::report_skip("GSUB", extension_lookup_type, e, warnings);
            }
        }
        Ok(())
    }

    fn apply_chaining(&self, subtables: &[usize], sequence: &mut Vec<u16>, warnings: &mut Warnings) -> Result<()> {
        for &offset in subtables {
            let mut r = self.reader_at(offset)?;
            let format = r.read_u16()?;
            match format {
                3 => self.apply_chaining_format3(offset, sequence, warnings)?,
                1 | 2 => {
                    log::warn!(
                        "GSUB: chaining contextual format {format} not evaluated, subtable skipped"
                    );
                }
                other => {
                    log::warn!("GSUB: unknown chaining contextual format {other}");
                }
            }
        }
        Ok(())
    }

    fn apply_chaining_format3(
        &self,
        offset: usize,
        sequence: &mut Vec<u16>,
        warnings: &mut Warnings,
    ) -> Result<()> {
        let mut r = self.reader_at(offset)?;
        let _format = r.read_u16()?;
        let backtrack_count = r.read_u16()?;
        let mut backtrack_offsets = Vec::with_capacity(backtrack_count as usize);
        for _ in 0..backtrack_count {
            backtrack_offsets.push(r.read_u16()?);
        }
        let input_count = r.read_u16()?;
        let mut input_offsets = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            input_offsets.push(r.read_u16()?);
        }
        let lookahead_count = r.read_u16()?;
        let mut lookahead_offsets = Vec::with_capacity(lookahead_count as usize);
        for _ in 0..lookahead_count {
            lookahead_offsets.push(r.read_u16()?);
        }
        let subst_count = r.read_u16()?;
        let mut subst_records = Vec::with_capacity(subst_count as usize);
        for _ in 0..subst_count {
            subst_records.push((r.read_u16()?, r.read_u16()?));
        }

        let backtrack: Vec<Coverage> = backtrack_offsets
            .iter()
            .map(|&o| Coverage::parse(&mut self.reader_at(offset + o as usize)?))
            .collect::<Result<_>>()?;
        let input: Vec<Coverage> = input_offsets
            .iter()
            .map(|&o| Coverage::parse(&mut self.reader_at(offset + o as usize)?))
            .collect::<Result<_>>()?;
        let lookahead: Vec<Coverage> = lookahead_offsets
            .iter()
            .map(|&o| Coverage::parse(&mut self.reader_at(offset + o as usize)?))
            .collect::<Result<_>>()?;

        if input.is_empty() {
            return Ok(());
        }

        let mut pos = 0usize;
        while pos + input.len() <= sequence.len() {
            let matches_input = input.iter().enumerate().all(|(k, cov)| cov.contains(sequence[pos + k]));
            let matches_backtrack = backtrack.iter().enumerate().all(|(k, cov)| {
                pos >= k + 1 && cov.contains(sequence[pos - k - 1])
            });
            let matches_lookahead = lookahead.iter().enumerate().all(|(k, cov)| {
                let idx = pos + input.len() + k;
                idx < sequence.len() && cov.contains(sequence[idx])
            });

            if matches_input && matches_backtrack && matches_lookahead {
                for &(input_index, lookup_index) in &subst_records {
                    let target = pos + input_index as usize;
                    if target < sequence.len() {
                        let mut single = vec![sequence[target]];
                        if let Err(e) = self.apply_lookup(lookup_index, &mut single, warnings) {
                            Self::report_skip("GSUB", lookup_index, e, warnings);
                        }
                        if let Some(&g) = single.first() {
                            sequence[target] = g;
                        }
                    }
                }
            }
            pos += 1;
        }

        Ok(())
    }
}

/// Used by other lookup formats that index classes rather than explicit glyph lists
/// (kept for parity with the GPOS class-based pair adjustment engine).
#[allow(dead_code)]
fn class_of(class_def: &ClassDef, glyph_id: u16) -> u16 {
    class_def.class_of(glyph_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be16(v: u16) -> [u8; 2] {
        v.to_be_bytes()
    }

    /// One `DFLT`/`dflt` script pointing at two features, each wrapping one lookup:
    /// lookup 0 is a supported format-1 single substitution (glyph 5 -> 6), lookup 1
    /// is an unsupported lookup type (8, reverse chaining single substitution).
    fn two_feature_table() -> Vec<u8> {
        let mut d = Vec::new();
        // Header (10 bytes)
        d.extend_from_slice(&be16(1)); // majorVersion
        d.extend_from_slice(&be16(0)); // minorVersion
        d.extend_from_slice(&be16(10)); // scriptListOffset
        d.extend_from_slice(&be16(32)); // featureListOffset
        d.extend_from_slice(&be16(58)); // lookupListOffset
        assert_eq!(d.len(), 10);

        // ScriptList @10
        d.extend_from_slice(&be16(1)); // scriptCount
        d.extend_from_slice(b"DFLT");
        d.extend_from_slice(&be16(8)); // Script table offset, relative to ScriptList start
        assert_eq!(d.len(), 18);

        // Script table @18
        d.extend_from_slice(&be16(4)); // defaultLangSysOffset, relative to Script table start
        d.extend_from_slice(&be16(0)); // langSysCount
        assert_eq!(d.len(), 22);

        // LangSys table @22
        d.extend_from_slice(&be16(0)); // lookupOrderOffset
        d.extend_from_slice(&be16(0xFFFF)); // requiredFeatureIndex
        d.extend_from_slice(&be16(2)); // featureIndexCount
        d.extend_from_slice(&be16(0));
        d.extend_from_slice(&be16(1));
        assert_eq!(d.len(), 32);

        // FeatureList @32
        d.extend_from_slice(&be16(2)); // featureCount
        d.extend_from_slice(b"tst1");
        d.extend_from_slice(&be16(14)); // Feature table 0, relative to FeatureList start
        d.extend_from_slice(b"tst2");
        d.extend_from_slice(&be16(20)); // Feature table 1, relative to FeatureList start
        assert_eq!(d.len(), 46);

        // Feature table 0 @46 -> lookup 0
        d.extend_from_slice(&be16(0)); // featureParams
        d.extend_from_slice(&be16(1)); // lookupIndexCount
        d.extend_from_slice(&be16(0)); // lookupIndices[0]
        assert_eq!(d.len(), 52);

        // Feature table 1 @52 -> lookup 1
        d.extend_from_slice(&be16(0));
        d.extend_from_slice(&be16(1));
        d.extend_from_slice(&be16(1));
        assert_eq!(d.len(), 58);

        // LookupList @58
        d.extend_from_slice(&be16(2)); // lookupCount
        d.extend_from_slice(&be16(6)); // Lookup 0 offset, relative to LookupList start
        d.extend_from_slice(&be16(26)); // Lookup 1 offset, relative to LookupList start
        assert_eq!(d.len(), 64);

        // Lookup 0 @64: type 1 (single substitution), one subtable
        d.extend_from_slice(&be16(1)); // lookupType
        d.extend_from_slice(&be16(0)); // lookupFlag
        d.extend_from_slice(&be16(1)); // subTableCount
        d.extend_from_slice(&be16(8)); // subtable offset, relative to Lookup table start
        assert_eq!(d.len(), 72);

        // Single substitution format 1 subtable @72
        d.extend_from_slice(&be16(1)); // format
        d.extend_from_slice(&be16(6)); // coverage offset, relative to subtable start
        d.extend_from_slice(&1i16.to_be_bytes()); // deltaGlyphID
        assert_eq!(d.len(), 78);

        // Coverage format 1 @78: just glyph 5
        d.extend_from_slice(&be16(1));
        d.extend_from_slice(&be16(1));
        d.extend_from_slice(&be16(5));
        assert_eq!(d.len(), 84);

        // Lookup 1 @84: unsupported type 8, no subtables needed (never read)
        d.extend_from_slice(&be16(8)); // lookupType
        d.extend_from_slice(&be16(0)); // lookupFlag
        d.extend_from_slice(&be16(0)); // subTableCount
        assert_eq!(d.len(), 90);

        d
    }

    #[test]
    fn substitute_applies_supported_lookup_and_skips_unsupported_one() {
        let data = two_feature_table();
        let gsub = GsubTable::parse(&data).unwrap();
        let mut warnings = Warnings::new();
        let out = gsub
            .substitute(&[5], &[*b"tst1", *b"tst2"], &mut warnings)
            .unwrap();
        assert_eq!(out, vec![6]);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::UnsupportedLookup { lookup_type: 8, table: "GSUB" })));
    }

    #[test]
    fn substitute_leaves_uncovered_glyphs_untouched() {
        let data = two_feature_table();
        let gsub = GsubTable::parse(&data).unwrap();
        let mut warnings = Warnings::new();
        let out = gsub
            .substitute(&[9], &[*b"tst1", *b"tst2"], &mut warnings)
            .unwrap();
        assert_eq!(out, vec![9]);
    }
}
