//! Free-text insights.

use super::profile::longest_session;
use super::Tally;
use crate::format::{format_duration, short_project_name};
use crate::types::Session;

const MS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

pub(crate) fn generate(sessions: &[&Session]) -> Vec<String> {
    if sessions.is_empty() {
        return vec![
            "No team sessions found. Start a multi-agent session to see analytics.".to_string(),
        ];
    }

    let mut insights = Vec::new();

    let mut projects = Tally::default();
    for s in sessions {
        projects.add(&s.project_name, 1);
    }
    if let Some((name, count)) = projects.ranked().into_iter().next() {
        insights.push(format!(
            "Most active project: {} ({} sessions)",
            short_project_name(&name),
            count
        ));
    }

    if let Some(longest) = longest_session(sessions) {
        insights.push(format!(
            "Longest session: {} ({})",
            format_duration(longest.duration.unwrap_or_default()),
            short_project_name(&longest.project_name)
        ));
    }

    let starts: Vec<_> = sessions.iter().filter_map(|s| s.start_time).collect();
    if let (Some(first), Some(last)) = (starts.iter().min(), starts.iter().max()) {
        if starts.len() >= 2 {
            let span_days = ((*last - *first).num_milliseconds() as f64 / MS_PER_DAY).max(1.0);
            let per_week = starts.len() as f64 / span_days * 7.0;
            insights.push(format!("Average frequency: {:.1} sessions/week", per_week));
        }
    }

    insights
}
