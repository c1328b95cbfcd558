use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::regions::Region;
use crate::audio::SampleBuffer;

/// Raw (un-effected) slices of the source, one per region, built on first
/// use. An entry is only reused while its region bounds still match, so a
/// stale slot after an edit just gets rebuilt.
#[derive(Default)]
pub struct DerivedBufferCache {
    entries: HashMap<usize, (Region, Arc<SampleBuffer>)>,
}

impl DerivedBufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_slice(
        &mut self,
        index: usize,
        region: Region,
        source: &SampleBuffer,
    ) -> Arc<SampleBuffer> {
        if let Some((cached, buf)) = self.entries.get(&index) {
            if *cached == region {
                return Arc::clone(buf);
            }
        }
        trace!(index, start = region.start, end = region.end, "slicing region");
        let buf = Arc::new(source.slice(region.start, region.end));
        self.entries.insert(index, (region, Arc::clone(&buf)));
        buf
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn invalidate(&mut self, index: usize) {
        self.entries.remove(&index);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
