//! Session assembly
//!
//! Orchestrates ingestion, correlation and extraction into one
//! [`ParsedSession`]:
//!
//! 1. Parse the lead log under the `lead` agent id.
//! 2. Parse every agent log in parallel (one scoped thread per file).
//! 3. Resolve agent names with the configured [`IdentityCorrelator`].
//! 4. Merge and time-order all events, then derive communications, tasks
//!    and statistics from the merged list.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::correlate::{
    collect_agent_starts, collect_spawn_intents, GreedyNearestCorrelator, IdentityCorrelator,
};
use crate::ingest::discovery::agent_id_from_path;
use crate::ingest::events::parse_jsonl_file;
use crate::ingest::extract::{
    extract_communications, extract_tasks, MessageTagParser, TeammateTagParser,
};
use crate::types::{
    AgentInfo, ParsedSession, Session, SessionEvent, SessionStats, LEAD_AGENT_ID, LEAD_AGENT_NAME,
};
use std::collections::BTreeMap;
use std::thread;

/// Characters of the agent id used as a fallback display name.
const FALLBACK_NAME_LEN: usize = 7;

/// Builds [`ParsedSession`]s from discovered [`Session`]s.
pub struct SessionAssembler {
    correlator: Box<dyn IdentityCorrelator>,
    tag_parser: Box<dyn MessageTagParser>,
}

impl Default for SessionAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAssembler {
    /// Assembler with the default correlation window and tag parser.
    pub fn new() -> Self {
        Self::with_strategies(
            Box::new(GreedyNearestCorrelator::default()),
            Box::new(TeammateTagParser),
        )
    }

    pub fn with_strategies(
        correlator: Box<dyn IdentityCorrelator>,
        tag_parser: Box<dyn MessageTagParser>,
    ) -> Self {
        Self {
            correlator,
            tag_parser,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_strategies(
            Box::new(GreedyNearestCorrelator::from_config(config)),
            Box::new(TeammateTagParser),
        )
    }

    /// Assemble one session from its log files.
    ///
    /// Unreadable files contribute no events. Fails only if a reader thread
    /// panics.
    pub fn assemble(&self, session: &Session) -> Result<ParsedSession> {
        let _span = tracing::debug_span!("assemble", session_id = %session.id).entered();

        let lead_events = if session.lead_file.is_file() {
            Some(parse_jsonl_file(&session.lead_file, LEAD_AGENT_ID))
        } else {
            None
        };

        let agent_logs = self.read_agent_logs(session)?;

        let mut events: Vec<SessionEvent> = lead_events.iter().flatten().cloned().collect();
        for (_, agent_events) in &agent_logs {
            events.extend(agent_events.iter().cloned());
        }
        events.sort_by_key(|e| e.timestamp);

        let spawns = collect_spawn_intents(&events);
        let starts = collect_agent_starts(
            agent_logs
                .iter()
                .map(|(id, evs)| (id.as_str(), evs.as_slice())),
        );
        let names = self.correlator.correlate(&spawns, &starts);

        let mut agents = BTreeMap::new();
        if let Some(lead_events) = &lead_events {
            agents.insert(
                LEAD_AGENT_ID.to_string(),
                rollup(LEAD_AGENT_ID, LEAD_AGENT_NAME.to_string(), lead_events, true),
            );
        }
        for (agent_id, agent_events) in &agent_logs {
            let name = names
                .get(agent_id)
                .cloned()
                .unwrap_or_else(|| agent_id.chars().take(FALLBACK_NAME_LEN).collect());
            agents.insert(agent_id.clone(), rollup(agent_id, name, agent_events, false));
        }

        let communications = extract_communications(&events, self.tag_parser.as_ref());
        let tasks = extract_tasks(&events);
        let stats = session_stats(&events, agents.len());

        tracing::debug!(
            agents = agents.len(),
            events = events.len(),
            communications = communications.len(),
            tasks = tasks.len(),
            resolved_names = names.len(),
            "Assembled session"
        );

        Ok(ParsedSession {
            id: session.id.clone(),
            project_name: session.project_name.clone(),
            git_branch: session.git_branch.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            duration: session.duration,
            agents,
            events,
            communications,
            tasks,
            stats,
        })
    }

    /// Parse every agent file on its own scoped thread, in file order.
    fn read_agent_logs(&self, session: &Session) -> Result<Vec<(String, Vec<SessionEvent>)>> {
        let joined = thread::scope(|scope| {
            let handles: Vec<_> = session
                .agent_files
                .iter()
                .map(|path| {
                    scope.spawn(move || {
                        let agent_id = agent_id_from_path(path).unwrap_or_default();
                        let events = parse_jsonl_file(path, &agent_id);
                        (agent_id, events)
                    })
                })
                .collect();

            // Join every handle so no panicked thread is left unobserved
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        joined
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| Error::Assembly {
                session_id: session.id.clone(),
                message: "agent log reader panicked".to_string(),
            })
    }
}

fn rollup(id: &str, name: String, events: &[SessionEvent], is_lead: bool) -> AgentInfo {
    let mut tools_used = BTreeMap::new();
    for tool in events.iter().flat_map(|e| &e.tool_use) {
        *tools_used.entry(tool.name.clone()).or_insert(0) += 1;
    }

    AgentInfo {
        id: id.to_string(),
        name,
        event_count: events.len(),
        start_time: events.first().map(|e| e.timestamp),
        end_time: events.last().map(|e| e.timestamp),
        tools_used,
        message_count: events
            .iter()
            .filter(|e| e.is_assistant() && e.has_text)
            .count(),
        is_lead,
    }
}

fn session_stats(events: &[SessionEvent], agent_count: usize) -> SessionStats {
    let mut stats = SessionStats {
        total_events: events.len(),
        agent_count,
        ..Default::default()
    };

    for event in events {
        if event.is_user() {
            stats.user_events += 1;
        } else if event.is_assistant() {
            stats.assistant_events += 1;
        }
        for tool in &event.tool_use {
            stats.tool_usages += 1;
            *stats.tool_breakdown.entry(tool.name.clone()).or_insert(0) += 1;
        }
    }

    stats
}
