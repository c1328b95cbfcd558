// Regions are the slices of the source the user has marked. They're kept
// sorted by start time; each one owns a parallel set of effect parameters.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::effects::{EffectParameters, ParamChange};
use super::history::{History, HistorySnapshot};
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub start: f64,
    pub end: f64,
}

impl Region {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Keyboard label for the region at `index`: 1..9 then 0.
pub fn slot_label(index: usize) -> u8 {
    ((index + 1) % 10) as u8
}

/// What a `click` ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Began,
    Completed(usize),
}

pub struct RegionModel {
    regions: Vec<Region>,
    params: Vec<EffectParameters>,
    pending: Option<f64>,
    history: History,
    max_regions: usize,
    min_duration: f64,
}

impl RegionModel {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            regions: Vec::new(),
            params: Vec::new(),
            pending: None,
            history: History::new(config.history_limit),
            max_regions: config.max_regions,
            min_duration: config.min_region_seconds,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn parameters(&self) -> &[EffectParameters] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region(&self, index: usize) -> Result<Region> {
        self.check_index(index)?;
        Ok(self.regions[index])
    }

    pub fn params(&self, index: usize) -> Result<&EffectParameters> {
        self.check_index(index)?;
        Ok(&self.params[index])
    }

    pub fn pending(&self) -> Option<f64> {
        self.pending
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_full(&self) -> bool {
        self.regions.len() >= self.max_regions
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.regions.len() {
            return Err(EditorError::IndexOutOfRange { index, len: self.regions.len() });
        }
        Ok(())
    }

    fn snapshot(&mut self) {
        self.history.push(HistorySnapshot {
            regions: self.regions.clone(),
            parameters: self.params.clone(),
            timestamp: SystemTime::now(),
        });
    }

    pub fn begin_region(&mut self, t: f64) -> Result<()> {
        if self.pending.is_some() {
            return Err(EditorError::invalid_state("a region start is already marked"));
        }
        if self.is_full() {
            return Err(EditorError::LimitExceeded { max: self.max_regions });
        }
        self.pending = Some(t);
        Ok(())
    }

    /// Close the pending region at `t`. The pending mark is consumed either
    /// way; on success the new region's index is returned.
    pub fn complete_region(&mut self, t: f64) -> Result<usize> {
        let start = self
            .pending
            .take()
            .ok_or_else(|| EditorError::invalid_state("no region start is marked"))?;

        let (start, end) = if t < start { (t, start) } else { (start, t) };
        if end - start < self.min_duration {
            return Err(EditorError::invalid_region(format!(
                "region is {:.4}s, shorter than {}s",
                end - start,
                self.min_duration
            )));
        }
        if self.is_full() {
            return Err(EditorError::LimitExceeded { max: self.max_regions });
        }

        self.snapshot();
        let index = self.regions.partition_point(|r| r.start <= start);
        self.regions.insert(index, Region { start, end });
        self.params.insert(index, EffectParameters::default());
        debug!(index, start, end, "region added");
        Ok(index)
    }

    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Begin if nothing is pending, otherwise complete.
    pub fn click(&mut self, t: f64) -> Result<ClickOutcome> {
        if self.pending.is_some() {
            self.complete_region(t).map(ClickOutcome::Completed)
        } else {
            self.begin_region(t).map(|_| ClickOutcome::Began)
        }
    }

    pub fn delete_region(&mut self, index: usize) -> Result<Region> {
        self.check_index(index)?;
        self.snapshot();
        self.params.remove(index);
        let removed = self.regions.remove(index);
        debug!(index, "region deleted");
        Ok(removed)
    }

    /// Restore the regions as they were before the most recent edit.
    /// Returns false when there's nothing left to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.regions = snapshot.regions;
        self.params = snapshot.parameters;
        self.pending = None;
        debug!(cursor = self.history.cursor(), "undo");
        true
    }

    // parameter tweaks are live edits, they don't go through history
    pub fn set_parameter(&mut self, index: usize, change: ParamChange) -> Result<()> {
        self.check_index(index)?;
        self.params[index].apply(change);
        Ok(())
    }

    /// Drop everything, as when a new source replaces the old one.
    pub fn reset(&mut self) {
        self.regions.clear();
        self.params.clear();
        self.pending = None;
        self.history.clear();
    }
}
