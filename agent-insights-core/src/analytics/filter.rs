//! Session filtering by project and time range.

use crate::types::{ParsedSession, Session};
use chrono::{DateTime, Duration, Months, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static TIME_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)([dwm])$").expect("valid time range regex"));

/// Filters applied before any analytics are computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Case-insensitive substring of the project name
    pub project: Option<String>,
    /// Time range token: `<n>d`, `<n>w` or `<n>m`
    pub last: Option<String>,
}

/// The sessions that survived filtering.
#[derive(Debug, Default)]
pub struct Filtered<'a> {
    pub sessions: Vec<&'a Session>,
    pub parsed: Vec<&'a ParsedSession>,
}

/// Cutoff instant for a time range token, relative to `now`.
///
/// `7d` is seven days, `2w` two weeks, `3m` three calendar months (clamped to
/// the end of shorter months). Unrecognized tokens return `None`.
pub fn parse_time_range(range: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = TIME_RANGE_RE.captures(range.trim())?;
    let amount: u32 = caps.get(1)?.as_str().parse().ok()?;

    match caps.get(2)?.as_str() {
        "d" => now.checked_sub_signed(Duration::try_days(i64::from(amount))?),
        "w" => now.checked_sub_signed(Duration::try_weeks(i64::from(amount))?),
        "m" => now.checked_sub_months(Months::new(amount)),
        _ => None,
    }
}

/// Apply project and time-range filters.
///
/// When any filter takes effect, parsed sessions are narrowed to the ids of
/// the surviving sessions. Sessions without a start time are dropped by a
/// time-range filter.
pub fn apply_filters<'a>(
    sessions: &'a [Session],
    parsed: &[&'a ParsedSession],
    options: &FilterOptions,
    now: DateTime<Utc>,
) -> Filtered<'a> {
    let mut kept: Vec<&Session> = sessions.iter().collect();
    let mut narrowed = false;

    if let Some(project) = options.project.as_deref().filter(|p| !p.is_empty()) {
        let needle = project.to_lowercase();
        kept.retain(|s| s.project_name.to_lowercase().contains(&needle));
        narrowed = true;
    }

    if let Some(last) = options.last.as_deref() {
        match parse_time_range(last, now) {
            Some(cutoff) => {
                kept.retain(|s| s.start_time.is_some_and(|t| t >= cutoff));
                narrowed = true;
            }
            None => tracing::debug!(last, "Unrecognized time range, not filtering by time"),
        }
    }

    let parsed = if narrowed {
        let ids: HashSet<&str> = kept.iter().map(|s| s.id.as_str()).collect();
        parsed
            .iter()
            .copied()
            .filter(|p| ids.contains(p.id.as_str()))
            .collect()
    } else {
        parsed.to_vec()
    };

    Filtered {
        sessions: kept,
        parsed,
    }
}
