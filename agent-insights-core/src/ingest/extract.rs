//! Communication and task extraction
//!
//! Derives [`Communication`] and [`TaskInfo`] records from a time-ordered,
//! merged event list.
//!
//! Communications come from two independent evidence sources and both are
//! kept, so one logical message may appear twice:
//!
//! | Source | Evidence | Direction |
//! |--------|----------|-----------|
//! | Receiver's log | `<teammate-message teammate_id="…">` tag in a user turn | `incoming` |
//! | Sender's log | `SendMessage` tool invocation | `outgoing` |

use crate::types::{Communication, Direction, SessionEvent, TaskInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Tool that sends a message to a teammate.
pub const SEND_MESSAGE_TOOL: &str = "SendMessage";
/// Tool that creates a task.
pub const TASK_CREATE_TOOL: &str = "TaskCreate";
/// Tool that updates a task's status.
pub const TASK_UPDATE_TOOL: &str = "TaskUpdate";

const TEAMMATE_TAG_OPEN: &str = "<teammate-message";

static TEAMMATE_MESSAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<teammate-message\s+teammate_id="([^"]+)"(?:\s+color="([^"]*)")?>\n?(.*?)\n?</teammate-message>"#,
    )
    .expect("valid teammate message regex")
});

static TEAMMATE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"teammate_id="([^"]+)""#).expect("valid teammate id regex"));

/// Name hint carried by a `teammate_id="…"` attribute anywhere in `text`.
pub(crate) fn teammate_id_hint(text: &str) -> Option<&str> {
    TEAMMATE_ID_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// ============================================
// Message tags
// ============================================

/// An inbound message recovered from an embedded tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub sender: String,
    pub color: Option<String>,
    pub body: String,
}

/// Recovers inbound messages from free text.
///
/// Implementations must return `None` for malformed input (no closing tag,
/// no sender attribute) rather than guessing.
pub trait MessageTagParser: Send + Sync {
    fn parse_incoming(&self, text: &str) -> Option<IncomingMessage>;
}

/// Default parser for `<teammate-message>` tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeammateTagParser;

impl MessageTagParser for TeammateTagParser {
    fn parse_incoming(&self, text: &str) -> Option<IncomingMessage> {
        let caps = TEAMMATE_MESSAGE_RE.captures(text)?;
        Some(IncomingMessage {
            sender: caps.get(1)?.as_str().to_string(),
            color: caps.get(2).map(|m| m.as_str().to_string()),
            body: caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
    }
}

// ============================================
// Extraction
// ============================================

/// Extract all communications, stable-sorted by timestamp.
pub fn extract_communications(
    events: &[SessionEvent],
    parser: &dyn MessageTagParser,
) -> Vec<Communication> {
    let mut communications = Vec::new();

    for event in events {
        if event.is_user() && event.text_content.trim_start().starts_with(TEAMMATE_TAG_OPEN) {
            match parser.parse_incoming(&event.text_content) {
                Some(msg) => communications.push(Communication {
                    timestamp: event.timestamp,
                    from: msg.sender,
                    to: event.agent_id.clone(),
                    content: msg.body,
                    direction: Direction::Incoming,
                }),
                None => tracing::trace!(
                    agent_id = %event.agent_id,
                    "Unparseable teammate message tag"
                ),
            }
        }

        for tool in event.tool_use.iter().filter(|t| t.name == SEND_MESSAGE_TOOL) {
            let content = tool
                .input_non_empty_str("message")
                .or_else(|| tool.input_non_empty_str("content"))
                .map(str::to_string)
                .unwrap_or_else(|| serde_json::Value::Object(tool.input.clone()).to_string());

            communications.push(Communication {
                timestamp: event.timestamp,
                from: event.agent_id.clone(),
                to: tool
                    .input_non_empty_str("recipient")
                    .unwrap_or("unknown")
                    .to_string(),
                content,
                direction: Direction::Outgoing,
            });
        }
    }

    communications.sort_by_key(|c| c.timestamp);
    communications
}

/// Extract tasks in creation order, applying status updates as they occur.
///
/// Each created task gets a stable id: the input's `taskId` or `id` when
/// present, else its 1-based creation sequence number, advanced past any id
/// already in use. Updates address tasks by that id; updates for unknown ids
/// are dropped.
pub fn extract_tasks(events: &[SessionEvent]) -> Vec<TaskInfo> {
    let mut tasks: Vec<TaskInfo> = Vec::new();
    let mut used_ids: HashSet<String> = HashSet::new();

    for event in events {
        for tool in &event.tool_use {
            if tool.name == TASK_CREATE_TOOL {
                let id = tool
                    .input_ident("taskId")
                    .or_else(|| tool.input_ident("id"))
                    .unwrap_or_else(|| next_free_id(tasks.len() + 1, &used_ids));
                used_ids.insert(id.clone());
                tasks.push(TaskInfo {
                    id,
                    subject: tool.input_str("subject").unwrap_or_default().to_string(),
                    created_by: event.agent_id.clone(),
                    created_at: event.timestamp,
                    status: "pending".to_string(),
                });
            } else if tool.name == TASK_UPDATE_TOOL {
                let Some(status) = tool.input_non_empty_str("status") else {
                    continue;
                };
                let Some(task_id) = tool.input_ident("taskId") else {
                    continue;
                };

                match tasks.iter_mut().find(|t| t.id == task_id) {
                    Some(task) => task.status = status.to_string(),
                    None => tracing::trace!(task_id, "Update for unknown task dropped"),
                }
            }
        }
    }

    tasks
}

fn next_free_id(mut sequence: usize, used: &HashSet<String>) -> String {
    while used.contains(&sequence.to_string()) {
        sequence += 1;
    }
    sequence.to_string()
}
