use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use shared::models::{AnomalyMonthBucket, AnomalyRecord};

const MONTH_LABEL_FORMAT: &str = "%B %Y";

// Ordering is (year, month), so sorting keys is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Full month name and year, e.g. "March 2024".
    pub fn label(&self) -> String {
        self.first_day()
            .map(|d| d.format(MONTH_LABEL_FORMAT).to_string())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

pub fn group_by_month(dates: &[NaiveDate]) -> HashMap<MonthKey, usize> {
    let mut counts = HashMap::new();
    for date in dates {
        *counts.entry(MonthKey::of(*date)).or_insert(0) += 1;
    }
    counts
}

pub fn sort_chronologically(counts: HashMap<MonthKey, usize>) -> Vec<AnomalyMonthBucket> {
    let mut keys: Vec<(MonthKey, usize)> = counts.into_iter().collect();
    keys.sort_by_key(|(key, _)| *key);
    keys.into_iter()
        .map(|(key, count)| AnomalyMonthBucket {
            year: key.year,
            month: key.month,
            month_label: key.label(),
            count,
        })
        .collect()
}

/// Parses a label produced by [`MonthKey::label`] back into its key.
pub fn parse_month_label(label: &str) -> Option<MonthKey> {
    NaiveDate::parse_from_str(&format!("1 {}", label.trim()), "%d %B %Y")
        .ok()
        .map(MonthKey::of)
}

/// Counts flagged points per calendar month, oldest month first. Months without anomalies are omitted.
pub fn summarize_anomalies(records: &[AnomalyRecord]) -> Vec<AnomalyMonthBucket> {
    let flagged: Vec<NaiveDate> = records
        .iter()
        .filter(|r| r.is_anomaly)
        .map(|r| r.timestamp)
        .collect();
    sort_chronologically(group_by_month(&flagged))
}
