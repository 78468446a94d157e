//! Bounded evaluation history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::report::EvaluationReport;

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub report: EvaluationReport,
    /// When the entry was recorded, in milliseconds
    pub timestamp: i64,
}

/// Ring buffer of evaluations; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    /// `capacity` of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append, evicting the oldest entry when full
    pub fn push(&mut self, entry: HistoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The newest `limit` entries, newest first. `None` returns everything.
    pub fn recent(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let limit = limit.unwrap_or(self.entries.len());
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Summary;

    fn entry(timestamp: i64) -> HistoryEntry {
        HistoryEntry {
            report: EvaluationReport {
                capability_id: "test".to_string(),
                generated_at: timestamp,
                summary: Summary {
                    total: 0,
                    nominal: 0,
                    watch: 0,
                    critical: 0,
                    posture: "ready".to_string(),
                    invalid: 0,
                    issues: Vec::new(),
                    max_severity: 0,
                    avg_severity: 0.0,
                    avg_signal_coverage: 1.0,
                    low_coverage_count: 0,
                },
                alerts: Vec::new(),
                recommendations: Vec::new(),
                entities: Vec::new(),
            },
            timestamp,
        }
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut history = History::new(3);
        for ts in 1..=5 {
            history.push(entry(ts));
        }

        assert_eq!(history.len(), 3);
        let stamps: Vec<_> = history.recent(None).iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![5, 4, 3]);
    }

    #[test]
    fn test_recent_respects_limit() {
        let mut history = History::new(10);
        for ts in 1..=4 {
            history.push(entry(ts));
        }

        let stamps: Vec<_> = history.recent(Some(2)).iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![4, 3]);
        assert_eq!(history.recent(Some(100)).len(), 4);
        assert!(history.recent(Some(0)).is_empty());
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut history = History::new(0);
        history.push(entry(1));
        history.push(entry(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.recent(None)[0].timestamp, 2);
    }
}
