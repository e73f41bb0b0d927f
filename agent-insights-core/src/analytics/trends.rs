//! Activity trends. All buckets use UTC.

use crate::types::Session;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Session counts over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    /// `YYYY-MM-DD` → sessions started that day
    pub daily: BTreeMap<String, u64>,
    /// `YYYY-Www` (ISO week-year and week) → sessions
    pub weekly: BTreeMap<String, u64>,
    /// `YYYY-MM` → sessions
    pub monthly: BTreeMap<String, u64>,
    /// Sessions on each of the last seven days, oldest first, today last
    pub last7_days: Vec<u64>,
    pub last30_days_total: usize,
    pub peak_activity: PeakActivity,
}

/// Busiest hour of day and day of week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakActivity {
    /// Hour of day, 0-23
    pub hour: u32,
    /// English weekday name
    pub day: String,
}

pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn iso_week_key(ts: DateTime<Utc>) -> String {
    let week = ts.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub fn month_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m").to_string()
}

/// Index of the first maximum; 0 for an all-zero histogram.
fn first_max(counts: &[u64]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold((0, 0), |(best_idx, best), (idx, &count)| {
            if count > best {
                (idx, count)
            } else {
                (best_idx, best)
            }
        })
        .0
}

pub(crate) fn calculate(sessions: &[&Session], now: DateTime<Utc>) -> Trends {
    let mut daily = BTreeMap::new();
    let mut weekly = BTreeMap::new();
    let mut monthly = BTreeMap::new();
    let mut hours = [0u64; 24];
    let mut days = [0u64; 7];

    let starts: Vec<DateTime<Utc>> = sessions.iter().filter_map(|s| s.start_time).collect();
    for &start in &starts {
        *daily.entry(day_key(start)).or_insert(0) += 1;
        *weekly.entry(iso_week_key(start)).or_insert(0) += 1;
        *monthly.entry(month_key(start)).or_insert(0) += 1;
        hours[start.hour() as usize] += 1;
        days[start.weekday().num_days_from_sunday() as usize] += 1;
    }

    let last7_days = (0..7)
        .rev()
        .map(|i| {
            let key = day_key(now - Duration::days(i));
            daily.get(&key).copied().unwrap_or(0)
        })
        .collect();

    let cutoff = now - Duration::days(30);
    let last30_days_total = starts.iter().filter(|&&t| t >= cutoff).count();

    Trends {
        daily,
        weekly,
        monthly,
        last7_days,
        last30_days_total,
        peak_activity: PeakActivity {
            hour: first_max(&hours) as u32,
            day: DAY_NAMES[first_max(&days)].to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::*;

    #[test]
    fn test_iso_week_key_year_boundary() {
        // 2027-01-01 is a Friday, still in ISO week 53 of 2026
        assert_eq!(iso_week_key(ts(2027, 1, 1, 12)), "2026-W53");
        // 2024-12-30 is a Monday in ISO week 1 of 2025
        assert_eq!(iso_week_key(ts(2024, 12, 30, 12)), "2025-W01");
        assert_eq!(iso_week_key(ts(2026, 1, 5, 0)), "2026-W02");
    }

    #[test]
    fn test_buckets_and_peaks() {
        // 2026-01-05 is a Monday
        let a = session("a", "/p", Some(ts(2026, 1, 5, 14)), 2);
        let b = session("b", "/p", Some(ts(2026, 1, 5, 14)), 2);
        let c = session("c", "/p", Some(ts(2026, 1, 7, 9)), 2);
        let d = session("d", "/p", None, 2);

        let trends = calculate(&[&a, &b, &c, &d], ts(2026, 1, 8, 12));
        assert_eq!(trends.daily.get("2026-01-05"), Some(&2));
        assert_eq!(trends.daily.get("2026-01-07"), Some(&1));
        assert_eq!(trends.weekly.get("2026-W02"), Some(&3));
        assert_eq!(trends.monthly.get("2026-01"), Some(&3));
        assert_eq!(trends.peak_activity.hour, 14);
        assert_eq!(trends.peak_activity.day, "Monday");
        assert_eq!(trends.last7_days, vec![0, 0, 0, 2, 0, 1, 0]);
        assert_eq!(trends.last30_days_total, 3);
    }

    #[test]
    fn test_peak_ties_pick_first() {
        let a = session("a", "/p", Some(ts(2026, 1, 6, 20)), 2);
        let b = session("b", "/p", Some(ts(2026, 1, 5, 8)), 2);

        let trends = calculate(&[&a, &b], ts(2026, 1, 8, 12));
        assert_eq!(trends.peak_activity.hour, 8);
        assert_eq!(trends.peak_activity.day, "Monday");
    }

    #[test]
    fn test_last30_excludes_older() {
        let recent = session("r", "/p", Some(ts(2026, 1, 1, 0)), 2);
        let old = session("o", "/p", Some(ts(2025, 11, 1, 0)), 2);
        let trends = calculate(&[&recent, &old], ts(2026, 1, 8, 12));
        assert_eq!(trends.last30_days_total, 1);
        assert_eq!(trends.peak_activity.hour, 0);
    }
}
