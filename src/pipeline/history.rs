use std::collections::VecDeque;
use std::time::SystemTime;

use super::effects::EffectParameters;
use super::regions::Region;

/// Regions and their parameters as they were just before an edit.
#[derive(Clone, Debug, PartialEq)]
pub struct HistorySnapshot {
    pub regions: Vec<Region>,
    pub parameters: Vec<EffectParameters>,
    pub timestamp: SystemTime,
}

// Strictly linear undo log. `cursor` counts the snapshots that can still be
// walked back to; pushing a new edit throws away anything after it.
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<HistorySnapshot>,
    cursor: usize,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, snapshot: HistorySnapshot) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(snapshot);
        if self.entries.len() > self.limit {
            self.entries.pop_front(); // oldest edit can no longer be undone
        }
        self.cursor = self.entries.len();
    }

    /// Step the cursor back and return the snapshot to restore, if any.
    pub fn undo(&mut self) -> Option<HistorySnapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}
