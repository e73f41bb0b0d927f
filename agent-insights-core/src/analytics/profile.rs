//! Profile statistics and per-project breakdown.

use super::Tally;
use crate::types::{ParsedSession, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of tools reported in [`ProfileStats::most_used_tools`].
pub const TOP_TOOLS: usize = 10;

/// Aggregate statistics over all filtered sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_sessions: usize,
    /// Sum of per-session agent file counts
    pub total_agents: usize,
    pub total_communications: usize,
    pub total_tasks: usize,
    pub total_events: usize,
    /// Top tools as `[name, count]`, most used first
    pub most_used_tools: Vec<(String, u64)>,
    /// Mean duration in ms over sessions with a positive duration
    pub average_duration: f64,
    pub average_agents_per_session: f64,
    pub longest_session: Option<LongestSession>,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongestSession {
    pub id: String,
    pub duration: i64,
    pub project: String,
}

/// Earliest and latest session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

/// Rollup for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBreakdown {
    pub name: String,
    pub sessions: usize,
    pub agents: usize,
    pub communications: usize,
    pub tasks: usize,
    /// Latest session start in this project
    pub last_activity: Option<DateTime<Utc>>,
    /// Sum of known session durations (ms)
    pub total_duration: i64,
}

/// The session with the greatest positive duration; first one wins ties.
pub(crate) fn longest_session<'a>(sessions: &[&'a Session]) -> Option<&'a Session> {
    sessions
        .iter()
        .copied()
        .filter(|s| s.duration.is_some_and(|d| d > 0))
        .fold(None, |best: Option<&Session>, s| match best {
            Some(b) if b.duration >= s.duration => Some(b),
            _ => Some(s),
        })
}

pub(crate) fn profile_stats(sessions: &[&Session], parsed: &[&ParsedSession]) -> ProfileStats {
    let total_sessions = sessions.len();
    let total_agents: usize = sessions.iter().map(|s| s.agent_count).sum();

    let mut tools = Tally::default();
    for p in parsed {
        for (tool, count) in &p.stats.tool_breakdown {
            tools.add(tool, *count);
        }
    }
    let mut most_used_tools = tools.ranked();
    most_used_tools.truncate(TOP_TOOLS);

    let durations: Vec<i64> = sessions
        .iter()
        .filter_map(|s| s.duration)
        .filter(|d| *d > 0)
        .collect();
    let average_duration = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<i64>() as f64 / durations.len() as f64
    };

    let starts = sessions.iter().filter_map(|s| s.start_time);

    ProfileStats {
        total_sessions,
        total_agents,
        total_communications: parsed.iter().map(|p| p.communications.len()).sum(),
        total_tasks: parsed.iter().map(|p| p.tasks.len()).sum(),
        total_events: parsed.iter().map(|p| p.stats.total_events).sum(),
        most_used_tools,
        average_duration,
        average_agents_per_session: if total_sessions > 0 {
            total_agents as f64 / total_sessions as f64
        } else {
            0.0
        },
        longest_session: longest_session(sessions).map(|s| LongestSession {
            id: s.id.clone(),
            duration: s.duration.unwrap_or_default(),
            project: s.project_name.clone(),
        }),
        date_range: DateRange {
            first: starts.clone().min(),
            last: starts.max(),
        },
    }
}

/// Per-project rollup, most sessions first (ties keep first-seen order).
pub(crate) fn project_breakdown(
    sessions: &[&Session],
    parsed: &[&ParsedSession],
) -> Vec<ProjectBreakdown> {
    let mut projects: Vec<ProjectBreakdown> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    let mut by_session: HashMap<&str, usize> = HashMap::new();

    for session in sessions {
        let idx = *by_name.entry(&session.project_name).or_insert_with(|| {
            projects.push(ProjectBreakdown {
                name: session.project_name.clone(),
                sessions: 0,
                agents: 0,
                communications: 0,
                tasks: 0,
                last_activity: None,
                total_duration: 0,
            });
            projects.len() - 1
        });
        by_session.insert(&session.id, idx);

        let project = &mut projects[idx];
        project.sessions += 1;
        project.agents += session.agent_count;
        project.total_duration += session.duration.unwrap_or_default();
        if session.start_time > project.last_activity {
            project.last_activity = session.start_time;
        }
    }

    for p in parsed {
        if let Some(&idx) = by_session.get(p.id.as_str()) {
            projects[idx].communications += p.communications.len();
            projects[idx].tasks += p.tasks.len();
        }
    }

    projects.sort_by(|a, b| b.sessions.cmp(&a.sessions));
    projects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::*;

    #[test]
    fn test_profile_stats() {
        let mut s1 = session("s1", "/home/dev/webapp", Some(ts(2026, 1, 5, 10)), 3);
        s1.duration = Some(60_000);
        let mut s2 = session("s2", "/home/dev/api", Some(ts(2026, 1, 7, 10)), 2);
        s2.duration = Some(0);
        let mut s3 = session("s3", "/home/dev/api", None, 1);
        s3.duration = Some(180_000);
        let sessions = [&s1, &s2, &s3];

        let p1 = parsed(
            "s1",
            vec![agent("lead", "Lead", 4, &[], 0)],
            vec![
                tool_event("lead", "Read", ts(2026, 1, 5, 10)),
                tool_event("lead", "Edit", ts(2026, 1, 5, 10)),
                tool_event("lead", "Read", ts(2026, 1, 5, 10)),
            ],
            vec![communication("lead", "a")],
            vec![task("lead"), task("lead")],
        );

        let stats = profile_stats(&sessions, &[&p1]);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_agents, 6);
        assert_eq!(stats.total_communications, 1);
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.total_events, 3);
        assert_eq!(
            stats.most_used_tools,
            vec![("Read".to_string(), 2), ("Edit".to_string(), 1)]
        );
        assert_eq!(stats.average_duration, 120_000.0);
        assert_eq!(stats.average_agents_per_session, 2.0);
        assert_eq!(stats.longest_session.as_ref().map(|l| l.id.as_str()), Some("s3"));
        assert_eq!(stats.date_range.first, Some(ts(2026, 1, 5, 10)));
        assert_eq!(stats.date_range.last, Some(ts(2026, 1, 7, 10)));
    }

    #[test]
    fn test_most_used_tools_capped() {
        let events: Vec<_> = (0..12)
            .map(|i| tool_event("lead", &format!("Tool{i:02}"), ts(2026, 1, 5, 10)))
            .collect();
        let p = parsed("s1", vec![], events, vec![], vec![]);
        let stats = profile_stats(&[], &[&p]);
        assert_eq!(stats.most_used_tools.len(), TOP_TOOLS);
        assert_eq!(stats.most_used_tools[0].0, "Tool00");
    }

    #[test]
    fn test_project_breakdown_sorted_and_joined() {
        let s1 = session("s1", "/home/dev/webapp", Some(ts(2026, 1, 5, 10)), 3);
        let s2 = session("s2", "/home/dev/api", Some(ts(2026, 1, 6, 10)), 2);
        let s3 = session("s3", "/home/dev/api", Some(ts(2026, 1, 8, 10)), 4);
        let p3 = parsed("s3", vec![], vec![], vec![communication("a", "b")], vec![task("a")]);
        let stray = parsed("zz", vec![], vec![], vec![communication("a", "b")], vec![]);

        let projects = project_breakdown(&[&s1, &s2, &s3], &[&p3, &stray]);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "/home/dev/api");
        assert_eq!(projects[0].sessions, 2);
        assert_eq!(projects[0].agents, 6);
        assert_eq!(projects[0].communications, 1);
        assert_eq!(projects[0].tasks, 1);
        assert_eq!(projects[0].total_duration, 2 * 30 * 60 * 1000);
        assert_eq!(projects[0].last_activity, Some(ts(2026, 1, 8, 10)));
        assert_eq!(projects[1].name, "/home/dev/webapp");
    }
}
