use crate::error::Result;
use crate::stream::Reader;

/// Shared `ScriptList`/`FeatureList`/`LookupList` header common to `GSUB` and `GPOS`.
#[derive(Debug, Clone)]
pub struct LayoutHeader<'a> {
    data: &'a [u8],
    script_list_offset: u16,
    feature_list_offset: u16,
    lookup_list_offset: u16,
}

#[derive(Debug, Clone, Copy)]
struct TagRecord {
    tag: [u8; 4],
    offset: u16,
}

impl<'a> LayoutHeader<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let _major = reader.read_u16()?;
        let _minor = reader.read_u16()?;
        let script_list_offset = reader.read_u16()?;
        let feature_list_offset = reader.read_u16()?;
        let lookup_list_offset = reader.read_u16()?;
        // version 1.1 adds a FeatureVariations offset, irrelevant here (ignored).
        Ok(LayoutHeader {
            data,
            script_list_offset,
            feature_list_offset,
            lookup_list_offset,
        })
    }

    fn tag_records(&self, offset: usize) -> Result<Vec<TagRecord>> {
        let mut r = Reader::new(self.data);
        r.set_position(offset)?;
        let count = r.read_u16()?;
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            out.push(TagRecord {
                tag: r.read_tag()?,
                offset: r.read_u16()?,
            });
        }
        Ok(out)
    }

    /// Ordered, deduplicated lookup indices enabled by `feature_tags`, preferring the
    /// `DFLT`/`dflt` script and language system (per §4.7).
    pub fn enabled_lookups(&self, feature_tags: &[[u8; 4]]) -> Result<Vec<u16>> {
        let scripts = self.tag_records(self.script_list_offset as usize)?;
        let script = scripts
            .iter()
            .find(|s| &s.tag == b"DFLT")
            .or_else(|| scripts.first());
        let Some(script) = script else {
            return Ok(Vec::new());
        };

        let script_table_offset = self.script_list_offset as usize + script.offset as usize;
        let mut r = Reader::new(self.data);
        r.set_position(script_table_offset)?;
        let default_lang_sys_offset = r.read_u16()?;
        let lang_sys_count = r.read_u16()?;
        let mut lang_systems = Vec::with_capacity(lang_sys_count as usize);
        for _ in 0..lang_sys_count {
            lang_systems.push(TagRecord {
                tag: r.read_tag()?,
                offset: r.read_u16()?,
            });
        }

        let lang_sys_offset = if default_lang_sys_offset != 0 {
            script_table_offset + default_lang_sys_offset as usize
        } else if let Some(dflt) = lang_systems.iter().find(|l| &l.tag == b"dflt") {
            script_table_offset + dflt.offset as usize
        } else if let Some(first) = lang_systems.first() {
            script_table_offset + first.offset as usize
        } else {
            return Ok(Vec::new());
        };

        let mut r = Reader::new(self.data);
        r.set_position(lang_sys_offset)?;
        let _lookup_order_offset = r.read_u16()?;
        let _required_feature_index = r.read_u16()?;
        let feature_index_count = r.read_u16()?;
        let mut feature_indices = Vec::with_capacity(feature_index_count as usize);
        for _ in 0..feature_index_count {
            feature_indices.push(r.read_u16()?);
        }

        let features = self.tag_records(self.feature_list_offset as usize)?;
        let mut lookup_indices: Vec<u16> = Vec::new();
        for idx in feature_indices {
            let Some(feature) = features.get(idx as usize) else {
                continue;
            };
            if !feature_tags.iter().any(|t| t == &feature.tag) {
                continue;
            }
            let feature_table_offset = self.feature_list_offset as usize + feature.offset as usize;
            let mut fr = Reader::new(self.data);
            fr.set_position(feature_table_offset)?;
            let _feature_params = fr.read_u16()?;
            let lookup_index_count = fr.read_u16()?;
            for _ in 0..lookup_index_count {
                let lookup_index = fr.read_u16()?;
                if !lookup_indices.contains(&lookup_index) {
                    lookup_indices.push(lookup_index);
                }
            }
        }
        lookup_indices.sort_unstable();
        Ok(lookup_indices)
    }

    /// Lookup type and absolute subtable offsets for lookup `index`, or `None` if out of range.
    pub fn lookup_subtable(&self, index: u16) -> Result<Option<(u16, Vec<usize>)>> {
        let mut r = Reader::new(self.data);
        r.set_position(self.lookup_list_offset as usize)?;
        let count = r.read_u16()?;
        let mut offsets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            offsets.push(r.read_u16()?);
        }
        let Some(&lookup_offset) = offsets.get(index as usize) else {
            return Ok(None);
        };

        let lookup_table_offset = self.lookup_list_offset as usize + lookup_offset as usize;
        let mut lr = Reader::new(self.data);
        lr.set_position(lookup_table_offset)?;
        let lookup_type = lr.read_u16()?;
        let _lookup_flag = lr.read_u16()?;
        let subtable_count = lr.read_u16()?;
        let mut subtable_offsets = Vec::with_capacity(subtable_count as usize);
        for _ in 0..subtable_count {
            subtable_offsets.push(lookup_table_offset + lr.read_u16()? as usize);
        }
        Ok(Some((lookup_type, subtable_offsets)))
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Every feature tag this table's `FeatureList` declares, regardless of whether
    /// any script/langsys actually references it.
    pub fn feature_tags(&self) -> Result<Vec<[u8; 4]>> {
        Ok(self
            .tag_records(self.feature_list_offset as usize)?
            .into_iter()
            .map(|r| r.tag)
            .collect())
    }
}
