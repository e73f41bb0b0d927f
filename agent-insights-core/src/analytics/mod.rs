//! Cross-session analytics
//!
//! [`AnalyticsEngine::calculate`] turns discovered sessions and their parsed
//! counterparts into an [`AnalyticsResult`]:
//! - Profile statistics and per-project breakdown
//! - Time-series trends (UTC buckets)
//! - Free-text insights
//! - A heuristic team-optimization report
//!
//! The engine is pure: its only input besides the sessions is "now", which
//! is captured at call time unless pinned with [`AnalyticsEngine::at`].

pub mod filter;
pub mod insights;
pub mod optimization;
pub mod profile;
pub mod trends;

pub use filter::{apply_filters, parse_time_range, FilterOptions, Filtered};
pub use optimization::{
    AgentUtilization, EfficiencyPattern, OptimizationInsight, Severity, TeamOptimization,
    UtilizationStatus,
};
pub use profile::{DateRange, LongestSession, ProfileStats, ProjectBreakdown};
pub use trends::{PeakActivity, Trends};

use crate::types::{ParsedSession, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;

/// Everything the analytics engine computes for one filtered view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub profile: ProfileStats,
    pub projects: Vec<ProjectBreakdown>,
    pub trends: Trends,
    pub insights: Vec<String>,
    pub optimization: TeamOptimization,
}

/// Computes [`AnalyticsResult`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsEngine {
    now: Option<DateTime<Utc>>,
}

impl AnalyticsEngine {
    /// Engine that uses the wall clock at each call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine pinned to a fixed "now".
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Filter the inputs, then compute every section of the report.
    ///
    /// `parsed` may hold owned sessions or `Arc`s from a
    /// [`SessionStore`](crate::store::SessionStore).
    pub fn calculate<P>(
        &self,
        sessions: &[Session],
        parsed: &[P],
        filters: &FilterOptions,
    ) -> AnalyticsResult
    where
        P: Borrow<ParsedSession>,
    {
        let now = self.now();
        let parsed: Vec<&ParsedSession> = parsed.iter().map(Borrow::borrow).collect();
        let view = apply_filters(sessions, &parsed, filters, now);

        tracing::debug!(
            sessions = view.sessions.len(),
            parsed = view.parsed.len(),
            project = ?filters.project,
            last = ?filters.last,
            "Calculating analytics"
        );

        AnalyticsResult {
            profile: profile::profile_stats(&view.sessions, &view.parsed),
            projects: profile::project_breakdown(&view.sessions, &view.parsed),
            trends: trends::calculate(&view.sessions, now),
            insights: insights::generate(&view.sessions),
            optimization: optimization::calculate(&view.sessions, &view.parsed),
        }
    }
}

/// Counts keyed by name, remembering first-seen order.
///
/// [`Tally::ranked`] sorts by count descending; equal counts keep the order
/// in which keys were first added.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    pub(crate) fn add(&mut self, key: &str, n: u64) {
        match self.index.get(key) {
            Some(&idx) => self.entries[idx].1 += n,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), n));
            }
        }
    }

    pub(crate) fn ranked(mut self) -> Vec<(String, u64)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
    }
}
