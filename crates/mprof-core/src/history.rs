//! Bounded in-memory window of recent sample rounds.

use std::collections::VecDeque;

use crate::model::SampleSet;

/// Rounds retained by default.
pub const DEFAULT_CAPACITY: usize = 10;

/// Fixed-capacity, insertion-ordered buffer of the last N sample sets.
///
/// Owned exclusively by the sampling thread, so it needs no locking. The
/// oldest entry is evicted when a push exceeds capacity.
#[derive(Debug)]
pub struct BoundedHistory {
    entries: VecDeque<SampleSet>,
    capacity: usize,
}

impl BoundedHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a round, evicting the oldest retained one when full.
    pub fn push(&mut self, set: SampleSet) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(set);
    }

    /// The most recently pushed round.
    pub fn last(&self) -> Option<&SampleSet> {
        self.entries.back()
    }

    /// The round immediately preceding the current last, among those still
    /// retained. Stays available after the buffer wraps; `None` while fewer
    /// than two rounds are retained.
    pub fn penultimate(&self) -> Option<&SampleSet> {
        self.entries
            .len()
            .checked_sub(2)
            .and_then(|i| self.entries.get(i))
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

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Renders the last round as a column-aligned block: labels padded to
    /// the longest label, rendered values right-justified, one sample per
    /// line. Empty string when no round has been pushed yet.
    pub fn format(&self) -> String {
        let Some(set) = self.last() else {
            return String::new();
        };

        let label_width = set.samples.iter().map(|s| s.label.len()).max().unwrap_or(0);
        let rendered: Vec<String> = set.samples.iter().map(|s| s.value.to_string()).collect();
        let value_width = rendered.iter().map(|v| v.len()).max().unwrap_or(0);

        set.samples
            .iter()
            .zip(&rendered)
            .map(|(sample, value)| {
                format!("{:>label_width$} {:>value_width$}", sample.label, value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
