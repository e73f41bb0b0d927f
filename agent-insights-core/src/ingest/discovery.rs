//! Team session discovery
//!
//! Walks a Claude Code projects root and finds team sessions:
//!
//! ```text
//! <root>/
//!   -home-dev-webapp/                 encoded project directory
//!     <session-id>.jsonl              lead log
//!     <session-id>/subagents/
//!       agent-<id>.jsonl              one log per spawned agent
//! ```
//!
//! A session qualifies when its lead log exists, it has at least one agent
//! log (compaction artifacts excluded) and the lead log mentions a team
//! coordination tool. Metadata comes from a bounded read of each file: a few
//! head lines and a tail read for the last line.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::events::RawRecord;
use crate::ingest::extract::teammate_id_hint;
use crate::types::{duration_between, Session};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Markers whose presence in a lead log identifies a team session.
const TEAM_MARKERS: &[&[u8]] = &[b"\"TeamCreate\"", b"\"SendMessage\""];

/// File-name fragment of context-compaction logs.
const COMPACTION_MARKER: &str = "acompact-";

const AGENT_FILE_PREFIX: &str = "agent-";

/// Discovers team sessions beneath a projects root.
#[derive(Debug, Clone)]
pub struct SessionDiscovery {
    root: PathBuf,
    head_lines: usize,
    tail_bytes: u64,
}

impl SessionDiscovery {
    /// Discovery over `root` with default read bounds.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = Config::default().discovery;
        Self {
            root: root.into(),
            head_lines: defaults.head_lines,
            tail_bytes: defaults.tail_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.projects_root(),
            head_lines: config.discovery.head_lines,
            tail_bytes: config.discovery.tail_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find all team sessions, newest first.
    ///
    /// Sessions without a start time sort last. A missing root yields an
    /// empty list; only a root that exists but cannot be listed is an error.
    pub fn discover(&self) -> Result<Vec<Session>> {
        if !self.root.exists() {
            tracing::debug!(root = %self.root.display(), "Projects root does not exist");
            return Ok(Vec::new());
        }

        let mut project_dirs: Vec<PathBuf> = fs::read_dir(&self.root)
            .map_err(|source| Error::Discovery {
                path: self.root.clone(),
                source,
            })?
            .filter_map(|entry| match entry {
                Ok(e) => Some(e.path()),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable root entry");
                    None
                }
            })
            .filter(|p| p.is_dir())
            .collect();
        project_dirs.sort();

        let mut sessions = Vec::new();
        for project_path in &project_dirs {
            self.discover_project(project_path, &mut sessions);
        }

        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        tracing::info!(
            root = %self.root.display(),
            projects = project_dirs.len(),
            sessions = sessions.len(),
            "Discovered team sessions"
        );
        Ok(sessions)
    }

    fn discover_project(&self, project_path: &Path, sessions: &mut Vec<Session>) {
        let Some(project_dir) = file_name(project_path) else {
            return;
        };

        let entries = match fs::read_dir(project_path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(path = %project_path.display(), error = %e, "Skipping unreadable project");
                return;
            }
        };

        let mut session_dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        session_dirs.sort();

        for session_path in session_dirs {
            if let Some(session) = self.inspect_session_dir(&project_dir, &session_path) {
                sessions.push(session);
            }
        }
    }

    fn inspect_session_dir(&self, project_dir: &str, session_path: &Path) -> Option<Session> {
        let id = file_name(session_path)?;
        let lead_file = session_path.with_file_name(format!("{id}.jsonl"));
        if !lead_file.is_file() {
            return None;
        }

        let subagents_dir = session_path.join("subagents");
        let agent_files = list_agent_files(&subagents_dir);
        if agent_files.is_empty() {
            return None;
        }

        if !detect_team_protocol(&lead_file) {
            tracing::debug!(session_id = %id, "No team markers in lead log, skipping");
            return None;
        }

        let mut session = Session {
            id,
            project_dir: project_dir.to_string(),
            project_name: decode_project_dir(project_dir),
            path: session_path.to_path_buf(),
            lead_file,
            subagents_dir,
            agent_count: agent_files.len(),
            agent_files,
            start_time: None,
            end_time: None,
            git_branch: None,
            lead_agent_id: None,
            teammate_names: BTreeMap::new(),
            duration: None,
        };
        self.read_metadata(&mut session);
        Some(session)
    }

    fn read_metadata(&self, session: &mut Session) {
        let mut start: Option<DateTime<Utc>> = None;

        let head = read_first_lines(&session.lead_file, self.head_lines);
        if let Some(record) = head
            .iter()
            .filter_map(|line| RawRecord::from_line(line))
            .find(|r| {
                matches!(r.record_type(), "user" | "assistant") && r.parsed_timestamp().is_some()
            })
        {
            start = record.parsed_timestamp();
            session.git_branch = record.git_branch.clone();
        }
        let mut end = self.last_timestamp(&session.lead_file);

        for path in &session.agent_files {
            if let Some(record) = read_first_lines(path, 1)
                .first()
                .and_then(|line| RawRecord::from_line(line))
            {
                let agent_id = record
                    .agent_id
                    .clone()
                    .or_else(|| agent_id_from_path(path))
                    .unwrap_or_default();

                if session.lead_agent_id.is_none() {
                    session.lead_agent_id = Some(agent_id.clone());
                }
                if let Some(name) = teammate_id_hint(&record.text()) {
                    session.teammate_names.insert(agent_id, name.to_string());
                }
                start = earlier(start, record.parsed_timestamp());
            }
            end = later(end, self.last_timestamp(path));
        }

        session.start_time = start;
        session.end_time = end;
        session.duration = duration_between(start, end);
    }

    fn last_timestamp(&self, path: &Path) -> Option<DateTime<Utc>> {
        read_last_line(path, self.tail_bytes)
            .and_then(|line| RawRecord::from_line(&line))
            .and_then(|r| r.parsed_timestamp())
    }
}

fn earlier(current: Option<DateTime<Utc>>, candidate: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn later(current: Option<DateTime<Utc>>, candidate: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

// ============================================
// File helpers
// ============================================

/// Decode an encoded project directory name into a path.
///
/// Every `-` (including a leading one) becomes `/`, so
/// `-home-dev-webapp` decodes to `/home/dev/webapp`. Hyphens that were part
/// of the original path cannot be recovered.
pub fn decode_project_dir(encoded: &str) -> String {
    encoded.replace('-', "/")
}

/// Agent id derived from an `agent-<id>.jsonl` file name.
pub fn agent_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stem.strip_prefix(AGENT_FILE_PREFIX).unwrap_or(stem).to_string())
}

/// List `agent-*.jsonl` files in `dir`, excluding compaction logs, sorted by name.
pub fn list_agent_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let pattern = format!(
        "{}/{AGENT_FILE_PREFIX}*.jsonl",
        glob::Pattern::escape(&dir.to_string_lossy())
    );

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Invalid agent file pattern");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| !n.contains(COMPACTION_MARKER))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Whether the lead log mentions a team coordination tool.
///
/// Streams the file line by line and stops at the first match.
pub fn detect_team_protocol(lead_file: &Path) -> bool {
    let Ok(file) = File::open(lead_file) else {
        return false;
    };

    BufReader::new(file)
        .split(b'\n')
        .map_while(|line| line.ok())
        .any(|line| {
            TEAM_MARKERS
                .iter()
                .any(|marker| line.windows(marker.len()).any(|w| w == *marker))
        })
}

/// Read up to `n` trimmed lines from the start of a file.
pub fn read_first_lines(path: &Path, n: usize) -> Vec<String> {
    let Ok(file) = File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .take(n)
        .map_while(|line| line.ok())
        .map(|line| line.trim().to_string())
        .collect()
}

/// Read the last non-empty line within the final `tail_bytes` of a file.
pub fn read_last_line(path: &Path, tail_bytes: u64) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let size = file.metadata().ok()?.len();
    let window = size.min(tail_bytes);
    if window == 0 {
        return None;
    }

    file.seek(SeekFrom::Start(size - window)).ok()?;
    let mut buf = Vec::with_capacity(window as usize);
    file.take(window).read_to_end(&mut buf).ok()?;

    String::from_utf8_lossy(&buf)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(str::to_string)
}
