//! Core domain types for agent-insights
//!
//! These types describe a reconstructed team session: the discovery-level
//! [`Session`] descriptor, the per-line [`SessionEvent`] records, and the
//! assembled [`ParsedSession`] with its agents, communications and tasks.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Team session** | One coordinated run of a lead agent and its spawned teammates |
//! | **Lead** | The agent that starts the session and spawns teammates |
//! | **Teammate** | A spawned worker with its own log file and a lead-emitted name hint |
//! | **Communication** | An inferred message between agents |
//!
//! All types serialize with camelCase field names. That JSON shape is the
//! contract consumed by dashboards and API layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Agent id used for the lead log within a [`ParsedSession`].
pub const LEAD_AGENT_ID: &str = "lead";

/// Display name of the lead agent.
pub const LEAD_AGENT_NAME: &str = "Lead";

// ============================================
// Session (discovery level)
// ============================================

/// A team session found on disk, with cheaply-derived metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session id (the session directory name)
    pub id: String,
    /// Encoded project directory name (e.g. `-home-dev-webapp`)
    pub project_dir: String,
    /// Decoded project path (e.g. `/home/dev/webapp`)
    pub project_name: String,
    /// Session directory
    pub path: PathBuf,
    /// Lead log (`<session>.jsonl` next to the session directory)
    pub lead_file: PathBuf,
    /// Directory holding the per-agent logs
    pub subagents_dir: PathBuf,
    /// Per-agent log files, sorted by file name
    pub agent_files: Vec<PathBuf>,
    /// Number of per-agent log files
    pub agent_count: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub git_branch: Option<String>,
    /// Agent id from the first agent log's first line
    pub lead_agent_id: Option<String>,
    /// Agent id → name hint found in agent log headers
    pub teammate_names: BTreeMap<String, String>,
    /// Milliseconds between start and end, when both are known
    pub duration: Option<i64>,
}

impl Session {
    /// List-view projection of this session.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            project_name: self.project_name.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.duration,
            agent_count: self.agent_count,
            git_branch: self.git_branch.clone(),
        }
    }
}

/// Summary fields returned when listing sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub project_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub agent_count: usize,
    pub git_branch: Option<String>,
}

/// Milliseconds between two optional timestamps, if both are present.
pub fn duration_between(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some(end.signed_duration_since(start).num_milliseconds()),
        _ => None,
    }
}

// ============================================
// Events
// ============================================

/// A single tool invocation from a `tool_use` content block.
///
/// The input is schema-free: each tool has its own input shape, so it is kept
/// as a JSON object map and narrowed by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub name: String,
    pub id: String,
    pub input: serde_json::Map<String, serde_json::Value>,
}

impl ToolUse {
    /// A string field of the input, if present and a string.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(|v| v.as_str())
    }

    /// A non-empty string field of the input.
    pub fn input_non_empty_str(&self, key: &str) -> Option<&str> {
        self.input_str(key).filter(|s| !s.is_empty())
    }

    /// A field rendered as an identifier: strings as-is, numbers in decimal.
    pub fn input_ident(&self, key: &str) -> Option<String> {
        match self.input.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// One normalized record per raw log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    /// Agent that owns the log line
    pub agent_id: String,
    /// Record type (`user`, `assistant`, `system`, ...)
    #[serde(rename = "type")]
    pub event_type: String,
    pub role: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Text content, truncated to a bounded length
    pub text_content: String,
    /// Whether the record carried any text before truncation
    pub has_text: bool,
    pub tool_use: Vec<ToolUse>,
    pub model: Option<String>,
}

impl SessionEvent {
    pub fn is_user(&self) -> bool {
        self.event_type == "user"
    }

    pub fn is_assistant(&self) -> bool {
        self.event_type == "assistant"
    }
}

// ============================================
// Assembled session
// ============================================

/// Per-agent rollup within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub id: String,
    /// Resolved display name, or a short id prefix when unresolved
    pub name: String,
    pub event_count: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Tool name → invocation count
    pub tools_used: BTreeMap<String, u64>,
    /// Assistant events that carried text
    pub message_count: usize,
    pub is_lead: bool,
}

impl AgentInfo {
    /// Total tool invocations across all tools.
    pub fn total_tool_uses(&self) -> u64 {
        self.tools_used.values().sum()
    }
}

/// Which side emitted the evidence for a [`Communication`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Seen as an embedded message tag in the receiver's log
    Incoming,
    /// Seen as a send action in the sender's log
    Outgoing,
}

/// A single inferred message between agents.
///
/// `from` and `to` may hold either an agent id or a human-readable name;
/// resolving them to a canonical id is up to the consumer. The same logical
/// message can appear twice, once from each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
    pub content: String,
    pub direction: Direction,
}

/// A task created by an agent during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// Stable id assigned at creation; updates reference it
    pub id: String,
    pub subject: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

/// Aggregate counters for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_events: usize,
    pub user_events: usize,
    pub assistant_events: usize,
    pub tool_usages: usize,
    pub agent_count: usize,
    pub tool_breakdown: BTreeMap<String, u64>,
}

/// A fully reconstructed team session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSession {
    pub id: String,
    pub project_name: String,
    pub git_branch: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    /// Agent id → rollup
    pub agents: BTreeMap<String, AgentInfo>,
    /// All events, ordered by timestamp
    pub events: Vec<SessionEvent>,
    /// All communications, ordered by timestamp
    pub communications: Vec<Communication>,
    pub tasks: Vec<TaskInfo>,
    pub stats: SessionStats,
}

impl ParsedSession {
    /// Agents that are not the lead.
    pub fn teammates(&self) -> impl Iterator<Item = &AgentInfo> {
        self.agents.values().filter(|a| !a.is_lead)
    }

    /// All agents in log order: the lead first, then teammates by id
    /// (the order of their log files).
    pub fn agents_in_log_order(&self) -> impl Iterator<Item = &AgentInfo> {
        self.agents
            .values()
            .filter(|a| a.is_lead)
            .chain(self.teammates())
    }
}
