//! JSON-lines event ingestion
//!
//! Parses one Claude Code log file (`<session>.jsonl` or
//! `subagents/agent-*.jsonl`) into an ordered list of [`SessionEvent`]s.
//!
//! # Error Handling
//!
//! - **Malformed JSON lines**: logged at trace level and skipped; parsing continues.
//! - **Irrelevant record types** (`file-history-snapshot`): skipped.
//! - **Missing timestamp**: the record inherits the previous record's timestamp.
//!   A record with no timestamp and no predecessor is skipped.
//! - **Unreadable file**: yields an empty list; the caller is never failed.

use crate::types::{SessionEvent, ToolUse};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

/// Maximum number of characters of text kept per event.
pub const MAX_TEXT_CHARS: usize = 2000;

/// Record types that carry no conversational content.
const SKIPPED_RECORD_TYPES: &[&str] = &["file-history-snapshot"];

// ============================================
// Raw JSONL record types (serde deserialization)
// ============================================

/// A single line from a Claude Code JSONL log.
///
/// Uses `#[serde(default)]` liberally to handle missing fields gracefully.
/// A field of the wrong JSON type is treated as missing instead of failing
/// the whole line.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawRecord {
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub record_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub agent_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub git_branch: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub message: Option<RawMessage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawMessage {
    #[serde(deserialize_with = "lenient")]
    pub role: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub model: Option<String>,
    pub content: Option<RawContent>,
}

/// Deserialize any JSON value, keeping it only if it has the expected shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug)]
pub(crate) enum RawContent {
    Text(String),
    /// Blocks that deserialized; malformed ones are dropped individually
    Blocks(Vec<ContentBlock>),
    Other,
}

impl<'de> Deserialize<'de> for RawContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(text) => RawContent::Text(text),
            serde_json::Value::Array(items) => RawContent::Blocks(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            _ => RawContent::Other,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl RawRecord {
    /// Parse one line; `None` for blank or malformed lines.
    pub(crate) fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        serde_json::from_str(line).ok()
    }

    pub(crate) fn record_type(&self) -> &str {
        self.record_type.as_deref().unwrap_or("unknown")
    }

    pub(crate) fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Full (untruncated) text of the message content.
    ///
    /// A plain string is used as-is; for a block list only `text` blocks
    /// contribute, joined by newlines.
    pub(crate) fn text(&self) -> String {
        match self.message.as_ref().and_then(|m| m.content.as_ref()) {
            Some(RawContent::Text(text)) => text.clone(),
            Some(RawContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    fn tool_uses(&self) -> Vec<ToolUse> {
        let Some(RawContent::Blocks(blocks)) = self.message.as_ref().and_then(|m| m.content.as_ref())
        else {
            return Vec::new();
        };

        blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolUse {
                    name: name.clone(),
                    id: id.clone(),
                    input: input.as_object().cloned().unwrap_or_default(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Truncate to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ============================================
// Parsing
// ============================================

/// Parse a JSON-lines log file into events owned by `agent_id`.
///
/// A record's own `agentId` field takes precedence over `agent_id`.
/// An unreadable file yields an empty list.
pub fn parse_jsonl_file(path: &Path, agent_id: &str) -> Vec<SessionEvent> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Cannot open log file, treating as empty"
            );
            return Vec::new();
        }
    };

    let events = parse_jsonl_reader(BufReader::new(file), agent_id);
    tracing::debug!(
        path = %path.display(),
        agent_id,
        events = events.len(),
        "Parsed log file"
    );
    events
}

/// Parse JSON-lines content from any buffered reader.
pub fn parse_jsonl_reader<R: BufRead>(reader: R, agent_id: &str) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let mut last_timestamp: Option<DateTime<Utc>> = None;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = match line_result {
            Ok(l) => l,
            // Invalid UTF-8 only spoils this line
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::trace!(line_number, error = %e, "Skipping undecodable line");
                continue;
            }
            Err(e) => {
                tracing::warn!(line_number, error = %e, "Read error, stopping early");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let Some(record) = RawRecord::from_line(&line) else {
            tracing::trace!(line_number, "Skipping malformed JSON line");
            continue;
        };

        if SKIPPED_RECORD_TYPES.contains(&record.record_type()) {
            continue;
        }

        let Some(timestamp) = record.parsed_timestamp().or(last_timestamp) else {
            tracing::trace!(line_number, "Skipping record without timestamp");
            continue;
        };
        last_timestamp = Some(timestamp);

        events.push(to_event(&record, agent_id, timestamp));
    }

    events
}

fn to_event(record: &RawRecord, agent_id: &str, timestamp: DateTime<Utc>) -> SessionEvent {
    let text = record.text();
    let message = record.message.as_ref();

    SessionEvent {
        agent_id: record
            .agent_id
            .clone()
            .unwrap_or_else(|| agent_id.to_string()),
        event_type: record.record_type().to_string(),
        role: message.and_then(|m| m.role.clone()),
        timestamp,
        has_text: !text.is_empty(),
        text_content: truncate_chars(&text, MAX_TEXT_CHARS),
        tool_use: record.tool_uses(),
        model: message.and_then(|m| m.model.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(content: &str) -> Vec<SessionEvent> {
        parse_jsonl_reader(Cursor::new(content.as_bytes()), "a1b2c3d4e5")
    }

    #[test]
    fn test_string_content() {
        let events = parse(
            r#"{"type":"user","timestamp":"2026-01-05T10:00:00.000Z","message":{"role":"user","content":"Hello team"}}"#,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "user");
        assert_eq!(events[0].role.as_deref(), Some("user"));
        assert_eq!(events[0].text_content, "Hello team");
        assert!(events[0].has_text);
        assert_eq!(events[0].agent_id, "a1b2c3d4e5");
    }

    #[test]
    fn test_blocks_join_text_and_collect_tools() {
        let line = r#"{"type":"assistant","timestamp":"2026-01-05T10:00:01Z","agentId":"ffee","message":{"role":"assistant","model":"claude-opus","content":[{"type":"text","text":"first"},{"type":"thinking","thinking":"hmm"},{"type":"tool_use","id":"toolu_1","name":"Read","input":{"file_path":"/a.rs"}},{"type":"text","text":"second"}]}}"#;
        let events = parse(line);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.agent_id, "ffee");
        assert_eq!(event.text_content, "first\nsecond");
        assert_eq!(event.model.as_deref(), Some("claude-opus"));
        assert_eq!(event.tool_use.len(), 1);
        assert_eq!(event.tool_use[0].name, "Read");
        assert_eq!(event.tool_use[0].id, "toolu_1");
        assert_eq!(event.tool_use[0].input_str("file_path"), Some("/a.rs"));
    }

    #[test]
    fn test_malformed_and_snapshot_lines_skipped() {
        let content = concat!(
            "{\"type\":\"user\",\"timestamp\":\"2026-01-05T10:00:00Z\",\"message\":{\"content\":\"one\"}}\n",
            "{not json at all\n",
            "\n",
            "{\"type\":\"file-history-snapshot\",\"timestamp\":\"2026-01-05T10:00:01Z\"}\n",
            "{\"type\":\"assistant\",\"timestamp\":\"2026-01-05T10:00:02Z\",\"message\":{\"content\":[]}}\n",
        );
        let events = parse(content);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, "assistant");
        assert!(!events[1].has_text);
    }

    #[test]
    fn test_text_truncated_but_has_text_kept() {
        let long = "é".repeat(MAX_TEXT_CHARS + 50);
        let line = serde_json::json!({
            "type": "user",
            "timestamp": "2026-01-05T10:00:00Z",
            "message": {"content": long},
        })
        .to_string();
        let events = parse(&line);
        assert_eq!(events[0].text_content.chars().count(), MAX_TEXT_CHARS);
        assert!(events[0].has_text);
    }

    #[test]
    fn test_missing_timestamp_inherits_previous() {
        let content = concat!(
            "{\"type\":\"system\",\"message\":{\"content\":\"orphan\"}}\n",
            "{\"type\":\"user\",\"timestamp\":\"2026-01-05T10:00:00Z\"}\n",
            "{\"type\":\"assistant\",\"timestamp\":\"garbage\"}\n",
        );
        let events = parse(content);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, events[1].timestamp);
    }

    #[test]
    fn test_non_object_tool_input_becomes_empty_map() {
        let line = r#"{"type":"assistant","timestamp":"2026-01-05T10:00:00Z","message":{"content":[{"type":"tool_use","id":"t","name":"Bash","input":"ls"}]}}"#;
        let events = parse(line);
        assert_eq!(events[0].tool_use.len(), 1);
        assert!(events[0].tool_use[0].input.is_empty());
    }

    #[test]
    fn test_bad_block_does_not_drop_its_neighbours() {
        let line = r#"{"type":"assistant","timestamp":"2026-01-05T10:00:00Z","message":{"content":[{"text":"untyped"},{"type":"text","text":"kept"},{"type":"text","text":null},{"type":"tool_use","id":"t1","name":"Read","input":{"file_path":"/a.rs"}}]}}"#;
        let events = parse(line);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text_content, "kept");
        assert_eq!(events[0].tool_use.len(), 1);
        assert_eq!(events[0].tool_use[0].name, "Read");
    }

    #[test]
    fn test_mistyped_fields_keep_the_record() {
        let content = concat!(
            "{\"type\":\"user\",\"timestamp\":\"2026-01-05T10:00:00Z\",\"message\":{\"content\":\"one\"}}\n",
            "{\"type\":\"assistant\",\"timestamp\":1767607200,\"message\":\"not an object\"}\n",
            "{\"type\":\"assistant\",\"timestamp\":\"2026-01-05T10:00:05Z\",\"message\":{\"role\":7,\"content\":{\"odd\":true}}}\n",
        );
        let events = parse(content);

        assert_eq!(events.len(), 3);
        // Non-string timestamp inherits the previous one
        assert_eq!(events[1].timestamp, events[0].timestamp);
        assert!(!events[1].has_text);
        assert_eq!(events[2].role, None);
        assert!(events[2].tool_use.is_empty());
    }

    #[test]
    fn test_unreadable_file_is_empty() {
        let events = parse_jsonl_file(Path::new("/nonexistent/agent-x.jsonl"), "x");
        assert!(events.is_empty());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
    }
}
