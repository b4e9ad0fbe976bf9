// Per-subsystem history store: last raw sample per entity key.

use std::collections::HashMap;

/// Most recent sample for one entity and the wall-clock second it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord<S> {
    pub at: f64,
    pub sample: S,
}

/// Owned by exactly one subsystem loop; never shared, so no locking.
/// Entities that disappear are kept until [`HistoryStore::forget`] is called.
#[derive(Debug, Clone)]
pub struct HistoryStore<S> {
    records: HashMap<String, HistoryRecord<S>>,
}

impl<S> Default for HistoryStore<S> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<S> HistoryStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&HistoryRecord<S>> {
        self.records.get(key)
    }

    /// Seconds since the stored record, or 0 when there is none.
    pub fn elapsed(&self, key: &str, now: f64) -> f64 {
        self.records.get(key).map(|r| now - r.at).unwrap_or(0.0)
    }

    /// Store `sample` for `key` and return the record it replaced.
    ///
    /// The stored timestamp never decreases: a clock step backwards keeps the
    /// previous timestamp, so the next delta is computed over a non-negative span.
    pub fn replace(&mut self, key: &str, at: f64, sample: S) -> Option<HistoryRecord<S>> {
        let at = match self.records.get(key) {
            Some(prev) if prev.at > at => prev.at,
            _ => at,
        };
        self.records
            .insert(key.to_string(), HistoryRecord { at, sample })
    }

    pub fn forget(&mut self, key: &str) -> Option<HistoryRecord<S>> {
        self.records.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Wall-clock seconds since the Unix epoch with microsecond resolution.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
