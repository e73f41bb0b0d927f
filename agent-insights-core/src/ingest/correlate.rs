//! Identity correlation
//!
//! Agent log files are named by opaque ids, while human-readable teammate
//! names only appear in the lead's spawn calls. Nothing links the two except
//! time: a spawned agent's log starts shortly after the spawn that named it.
//!
//! The default [`GreedyNearestCorrelator`] walks spawns in time order and
//! gives each one the earliest-starting unmatched agent whose start lies in
//! the window `[spawn - early_tolerance, spawn + max_delay)`. This is a
//! heuristic: rapid concurrent spawns or reused names can be misattributed.

use crate::config::{Config, CorrelationConfig};
use crate::types::SessionEvent;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// Tool whose `name` input spawns a named teammate.
pub const SPAWN_TOOL: &str = "Task";

/// A lead-emitted spawn carrying a name hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnIntent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

/// First-event time of one agent log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStart {
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Strategy that maps agent ids to spawn names.
pub trait IdentityCorrelator: Send + Sync {
    /// Returns agent id → resolved name for every agent it could match.
    ///
    /// `spawns` and `starts` are sorted ascending by timestamp. Each agent
    /// is assigned at most one name.
    fn correlate(&self, spawns: &[SpawnIntent], starts: &[AgentStart]) -> BTreeMap<String, String>;
}

/// Greedy nearest-start matching within a fixed window.
#[derive(Debug, Clone)]
pub struct GreedyNearestCorrelator {
    early_tolerance_ms: i64,
    max_delay_ms: i64,
}

impl GreedyNearestCorrelator {
    pub fn new(early_tolerance_ms: i64, max_delay_ms: i64) -> Self {
        Self {
            early_tolerance_ms,
            max_delay_ms,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from(&config.correlation)
    }
}

impl From<&CorrelationConfig> for GreedyNearestCorrelator {
    fn from(config: &CorrelationConfig) -> Self {
        Self::new(config.early_tolerance_ms, config.max_delay_ms)
    }
}

impl Default for GreedyNearestCorrelator {
    fn default() -> Self {
        Self::from(&CorrelationConfig::default())
    }
}

impl IdentityCorrelator for GreedyNearestCorrelator {
    fn correlate(&self, spawns: &[SpawnIntent], starts: &[AgentStart]) -> BTreeMap<String, String> {
        let mut names = BTreeMap::new();
        let mut used: HashSet<&str> = HashSet::new();

        for spawn in spawns {
            let mut best: Option<(&str, i64)> = None;

            for agent in starts {
                if used.contains(agent.agent_id.as_str()) {
                    continue;
                }
                let offset = agent
                    .timestamp
                    .signed_duration_since(spawn.timestamp)
                    .num_milliseconds();
                if offset < -self.early_tolerance_ms || offset >= self.max_delay_ms {
                    continue;
                }
                if best.map_or(true, |(_, best_offset)| offset < best_offset) {
                    best = Some((agent.agent_id.as_str(), offset));
                }
            }

            if let Some((agent_id, offset)) = best {
                tracing::trace!(agent_id, name = %spawn.name, offset_ms = offset, "Matched spawn");
                used.insert(agent_id);
                names.insert(agent_id.to_string(), spawn.name.clone());
            }
        }

        names
    }
}

/// Spawn intents from every `Task` invocation with a name, sorted by time.
pub fn collect_spawn_intents(events: &[SessionEvent]) -> Vec<SpawnIntent> {
    let mut spawns: Vec<SpawnIntent> = events
        .iter()
        .flat_map(|event| {
            event
                .tool_use
                .iter()
                .filter(|t| t.name == SPAWN_TOOL)
                .filter_map(move |t| {
                    t.input_non_empty_str("name").map(|name| SpawnIntent {
                        name: name.to_string(),
                        timestamp: event.timestamp,
                    })
                })
        })
        .collect();
    spawns.sort_by_key(|s| s.timestamp);
    spawns
}

/// First-event time per agent, sorted by time. Agents without events are omitted.
pub fn collect_agent_starts<'a, I>(agents: I) -> Vec<AgentStart>
where
    I: IntoIterator<Item = (&'a str, &'a [SessionEvent])>,
{
    let mut starts: Vec<AgentStart> = agents
        .into_iter()
        .filter_map(|(agent_id, events)| {
            events.first().map(|first| AgentStart {
                agent_id: agent_id.to_string(),
                timestamp: first.timestamp,
            })
        })
        .collect();
    starts.sort_by_key(|s| s.timestamp);
    starts
}
