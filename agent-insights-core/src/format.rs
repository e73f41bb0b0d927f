//! Formatting helpers shared by insights and the CLI.

use chrono::{DateTime, Utc};

/// Format a millisecond duration (e.g., "1h 5m", "3m 20s", "42s").
///
/// Zero or negative durations format as "0s".
pub fn format_duration(ms: i64) -> String {
    if ms <= 0 {
        return "0s".to_string();
    }

    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a timestamp relative to `now` (e.g., "2h ago", "3w ago").
///
/// Anything four weeks or older falls back to [`format_date`].
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else if duration.num_weeks() < 4 {
        format!("{}w ago", duration.num_weeks())
    } else {
        format_date(ts)
    }
}

/// Format a date as "Jan 5, 2026".
pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y").to_string()
}

/// Format an hour of day (0-23) on a 12-hour clock, e.g. "12 AM", "3 PM".
pub fn format_hour(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{} AM", hour),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

/// Last path segment of a project name (`/home/dev/webapp` → `webapp`).
pub fn short_project_name(project_name: &str) -> &str {
    project_name
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(project_name)
}
