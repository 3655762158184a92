//! Lazily-populated, thread-shareable glyph outline cache. An `Arc<RwLock<HashMap<_, _>>>`
//! makes a warmed `Font` clone a cheap reference-count bump, and an unwarmed one safe
//! to shape from multiple threads at the cost of lock contention on first decode.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::outline::Outline;

#[derive(Clone, Default)]
pub struct OutlineCache {
    entries: Arc<RwLock<HashMap<u16, Outline>>>,
}

impl OutlineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached outline for `glyph_id`, decoding and memoizing it via
    /// `decode` on a miss.
    pub fn get_or_decode(&self, glyph_id: u16, decode: impl FnOnce() -> Result<Outline>) -> Result<Outline> {
        if let Some(outline) = self.entries.read().unwrap().get(&glyph_id) {
            return Ok(outline.clone());
        }
        let outline = decode()?;
        self.entries.write().unwrap().insert(glyph_id, outline.clone());
        Ok(outline)
    }

    /// Pre-decodes every glyph id in `glyph_ids` not already cached, so that a
    /// subsequent multi-threaded shaping pass never contends on first decode.
    pub fn warm(&self, glyph_ids: impl IntoIterator<Item = u16>, mut decode: impl FnMut(u16) -> Result<Outline>) {
        for glyph_id in glyph_ids {
            if self.entries.read().unwrap().contains_key(&glyph_id) {
                continue;
            }
            if let Ok(outline) = decode(glyph_id) {
                self.entries.write().unwrap().insert(glyph_id, outline);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn decodes_once_per_glyph() {
        let cache = OutlineCache::new();
        let calls = Cell::new(0);
        let decode = || {
            calls.set(calls.get() + 1);
            Ok(Outline::new())
        };
        cache.get_or_decode(3, decode).unwrap();
        cache.get_or_decode(3, decode).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn warm_skips_already_cached_glyphs() {
        let cache = OutlineCache::new();
        cache.get_or_decode(1, || Ok(Outline::new())).unwrap();
        let mut decoded = Vec::new();
        cache.warm([1, 2, 3], |id| {
            decoded.push(id);
            Ok(Outline::new())
        });
        assert_eq!(decoded, vec![2, 3]);
        assert_eq!(cache.len(), 3);
    }
}
