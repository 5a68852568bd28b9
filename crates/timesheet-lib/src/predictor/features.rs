//! Feature extraction for ML inference
//!
//! Turns a (user, activity, date) candidate plus the user's timesheet history
//! into the 12-wide feature vector the classifier was trained on. Features
//! include calendar context, weekday frequency, duration statistics, and a
//! recent-versus-older occurrence trend.
//!
//! Extraction never fails: absent history, unmapped users and unusable start
//! times all degrade to fixed default values.

use super::history::{ActivityHistory, HistoryIndex};
use crate::models::{FeatureVector, HistoricalRecord, PredictionCandidate, UserIdMapping};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};

/// Hour used when the candidate carries no start time
pub const DEFAULT_HOUR_OF_DAY: u32 = 9;

/// Day of month from which a date counts as month end
pub const MONTH_END_DAY: u32 = 25;

/// Length of the "recent" window for the trend feature
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Decimal places kept for ratio features
const FEATURE_DECIMALS: i32 = 4;

/// Extracts feature vectors from candidates and indexed history
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(
        &self,
        candidate: &PredictionCandidate,
        history: &HistoryIndex,
        mapping: Option<&UserIdMapping>,
    ) -> FeatureVector {
        let date = candidate.target_date;
        let weekday = date.weekday().num_days_from_monday();
        let activity = history.activity(candidate.activity_id);

        let (avg_duration, duration_consistency) = duration_stats(activity);

        FeatureVector {
            day_of_week_encoded: weekday,
            hour_of_day: candidate
                .start_time
                .map(|t| t.hour())
                .unwrap_or(DEFAULT_HOUR_OF_DAY),
            month: date.month(),
            is_month_end: u8::from(date.day() >= MONTH_END_DAY),
            activity_frequency: activity_frequency(activity, weekday, history),
            avg_duration,
            duration_consistency,
            recent_trend: recent_trend(activity, date),
            total_occurrences: activity.map(|a| a.count() as u32).unwrap_or(0),
            is_billable: activity
                .map(|a| u8::from(a.metadata().is_billable))
                .unwrap_or(0),
            activity_id: candidate.activity_id,
            user_id_encoded: mapping
                .and_then(|m| m.get(&candidate.user_id))
                .copied()
                .unwrap_or(0),
        }
    }

    /// Convenience for a single candidate against raw records
    pub fn extract_from_records(
        &self,
        candidate: &PredictionCandidate,
        records: &[HistoricalRecord],
        mapping: Option<&UserIdMapping>,
    ) -> FeatureVector {
        self.extract(candidate, &HistoryIndex::build(records), mapping)
    }

    /// One vector per candidate, in candidate order
    pub fn extract_batch(
        &self,
        candidates: &[PredictionCandidate],
        history: &HistoryIndex,
        mapping: Option<&UserIdMapping>,
    ) -> Vec<FeatureVector> {
        candidates
            .iter()
            .map(|c| self.extract(c, history, mapping))
            .collect()
    }
}

/// Share of all records on this weekday that belong to the activity
fn activity_frequency(activity: Option<&ActivityHistory>, weekday: u32, history: &HistoryIndex) -> f64 {
    let total = history.weekday_total(weekday);
    if total == 0 {
        return 0.0;
    }
    let matching = activity.map(|a| a.count_on_weekday(weekday)).unwrap_or(0);
    round_to(matching as f64 / total as f64, FEATURE_DECIMALS)
}

/// Mean hours and `1 - cv` clipped to [0, 1]
fn duration_stats(activity: Option<&ActivityHistory>) -> (f64, f64) {
    let activity = match activity {
        Some(a) if a.count() > 0 => a,
        _ => return (0.0, 0.0),
    };

    let mean = activity.mean_hours();
    let consistency = match activity.sample_std_hours() {
        Some(std) if mean > 0.0 => (1.0 - std / mean).clamp(0.0, 1.0),
        _ if activity.count() == 1 => 1.0,
        _ => 0.0,
    };

    (
        round_to(mean, FEATURE_DECIMALS),
        round_to(consistency, FEATURE_DECIMALS),
    )
}

/// (recent - older) / older around `target - 7 days`
fn recent_trend(activity: Option<&ActivityHistory>, target: NaiveDate) -> f64 {
    let activity = match activity {
        Some(a) => a,
        None => return 0.0,
    };
    let boundary = target - Duration::days(RECENT_WINDOW_DAYS);
    let recent = activity.count_since(boundary);
    let older = activity.count_before(boundary);
    if older == 0 {
        return 0.0;
    }
    round_to((recent as f64 - older as f64) / older as f64, FEATURE_DECIMALS)
}

/// Parse a start time supplied as text.
///
/// Accepts `HH:MM` / `HH:MM:SS`, or a date string in the
/// `Wed Feb 18 2026 09:15:00 GMT+0800` layout, where the hour is whatever
/// precedes the first `:` of the fifth whitespace token (the whole token if
/// it has none). Anything else, including hours outside 0..24, is `None`,
/// which extraction turns into hour 9.
pub fn parse_start_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    if let Ok(t) = NaiveTime::parse_from_str(trimmed, "%H:%M:%S") {
        return Some(t);
    }
    if let Ok(t) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
        return Some(t);
    }

    let token = trimmed.split_whitespace().nth(4)?;
    let hour: u32 = token.split(':').next()?.parse().ok()?;
    NaiveTime::from_hms_opt(hour, 0, 0)
}

/// Round half to even, matching the values the classifier was fit on
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
