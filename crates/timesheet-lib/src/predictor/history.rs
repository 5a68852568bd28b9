//! Per-invocation index over historical timesheet records
//!
//! History is scanned once and grouped by activity and weekday so that
//! feature extraction for many candidates does not rescan the full record set.

use crate::models::HistoricalRecord;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// Display metadata taken from the first record seen for an activity
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityMetadata {
    pub activity_name: String,
    pub activity_code: String,
    pub is_billable: bool,
}

/// All history for a single activity
#[derive(Debug, Clone)]
pub struct ActivityHistory {
    metadata: ActivityMetadata,
    samples: Vec<(NaiveDate, f64)>,
}

impl ActivityHistory {
    fn new(first: &HistoricalRecord) -> Self {
        Self {
            metadata: ActivityMetadata {
                activity_name: first.activity_name.clone(),
                activity_code: first.activity_code.clone(),
                is_billable: first.is_billable,
            },
            samples: Vec::new(),
        }
    }

    /// Representative metadata; later rows with different values are ignored
    pub fn metadata(&self) -> &ActivityMetadata {
        &self.metadata
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Records whose weekday (0 = Monday) matches
    pub fn count_on_weekday(&self, weekday: u32) -> usize {
        self.samples
            .iter()
            .filter(|(date, _)| date.weekday().num_days_from_monday() == weekday)
            .count()
    }

    /// Records dated on or after `date`
    pub fn count_since(&self, date: NaiveDate) -> usize {
        self.samples.iter().filter(|(d, _)| *d >= date).count()
    }

    /// Records dated strictly before `date`
    pub fn count_before(&self, date: NaiveDate) -> usize {
        self.samples.iter().filter(|(d, _)| *d < date).count()
    }

    pub fn mean_hours(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|(_, h)| h).sum::<f64>() / self.samples.len() as f64
    }

    /// Sample standard deviation (n - 1); `None` with fewer than two samples
    pub fn sample_std_hours(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let mean = self.mean_hours();
        let sum_sq: f64 = self.samples.iter().map(|(_, h)| (h - mean).powi(2)).sum();
        Some((sum_sq / (self.samples.len() - 1) as f64).sqrt())
    }
}

/// History grouped by activity and weekday
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    activities: HashMap<i64, ActivityHistory>,
    weekday_totals: [usize; 7],
    total_records: usize,
}

impl HistoryIndex {
    pub fn build(records: &[HistoricalRecord]) -> Self {
        let mut index = Self::default();
        for record in records {
            let weekday = record.log_date.weekday().num_days_from_monday() as usize;
            index.weekday_totals[weekday] += 1;
            index.total_records += 1;
            index
                .activities
                .entry(record.activity_id)
                .or_insert_with(|| ActivityHistory::new(record))
                .samples
                .push((record.log_date, record.total_hours));
        }
        index
    }

    pub fn activity(&self, activity_id: i64) -> Option<&ActivityHistory> {
        self.activities.get(&activity_id)
    }

    /// Records of any activity falling on the weekday (0 = Monday)
    pub fn weekday_total(&self, weekday: u32) -> usize {
        self.weekday_totals.get(weekday as usize).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.total_records
    }

    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}
