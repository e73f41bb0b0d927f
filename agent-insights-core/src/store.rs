//! Session store
//!
//! [`SessionStore`] owns discovery and assembly plus two caches: the list of
//! discovered sessions and the parsed sessions keyed by id. Parsed sessions
//! are handed out as `Arc`s and stay cached until [`SessionStore::invalidate`]
//! or [`SessionStore::refresh`].
//!
//! The store is `Sync`; share it behind an `Arc` to serve concurrent readers.
//! When two threads assemble the same session at once, the first inserted
//! value wins and both callers receive it.
//!
//! Every invalidation bumps a generation counter under both write locks. A
//! discovery or assembly that started in an earlier generation still returns
//! its result to its caller but never enters the cache.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::{SessionAssembler, SessionDiscovery};
use crate::types::{ParsedSession, Session, SessionSummary};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cached access to discovered and parsed team sessions.
pub struct SessionStore {
    discovery: SessionDiscovery,
    assembler: SessionAssembler,
    sessions: RwLock<Option<Arc<Vec<Session>>>>,
    parsed: RwLock<HashMap<String, Arc<ParsedSession>>>,
    generation: AtomicU64,
}

// Cached data is always in a consistent state, so a poisoned lock is still usable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl SessionStore {
    pub fn new(discovery: SessionDiscovery, assembler: SessionAssembler) -> Self {
        Self {
            discovery,
            assembler,
            sessions: RwLock::new(None),
            parsed: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SessionDiscovery::from_config(config),
            SessionAssembler::from_config(config),
        )
    }

    /// Store over `root` with default settings.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::new(SessionDiscovery::new(root), SessionAssembler::new())
    }

    pub fn discovery(&self) -> &SessionDiscovery {
        &self.discovery
    }

    /// Discovered sessions, newest first. Discovery runs once until invalidated.
    pub fn sessions(&self) -> Result<Arc<Vec<Session>>> {
        if let Some(sessions) = read(&self.sessions).as_ref() {
            return Ok(Arc::clone(sessions));
        }

        let generation = self.generation();
        let discovered = Arc::new(self.discovery.discover()?);
        let mut cache = write(&self.sessions);
        if let Some(sessions) = cache.as_ref() {
            return Ok(Arc::clone(sessions));
        }
        if self.generation() == generation {
            *cache = Some(Arc::clone(&discovered));
        } else {
            tracing::debug!("Discovery overtaken by invalidation, not cached");
        }
        Ok(discovered)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// List-view summaries of all discovered sessions.
    pub fn list_summaries(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.sessions()?.iter().map(Session::summary).collect())
    }

    /// Parsed session for `id`, or `None` if no such session was discovered.
    pub fn get(&self, id: &str) -> Result<Option<Arc<ParsedSession>>> {
        if let Some(parsed) = read(&self.parsed).get(id) {
            return Ok(Some(Arc::clone(parsed)));
        }

        let generation = self.generation();
        let sessions = self.sessions()?;
        match sessions.iter().find(|s| s.id == id) {
            Some(session) => self.parse_in_generation(session, generation).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`Self::get`], but an unknown id is an error.
    pub fn require(&self, id: &str) -> Result<Arc<ParsedSession>> {
        self.get(id)?
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Assemble `session`, or return the cached result.
    pub fn parse_session(&self, session: &Session) -> Result<Arc<ParsedSession>> {
        self.parse_in_generation(session, self.generation())
    }

    /// Assemble `session`, caching the result only if no invalidation has
    /// happened since `generation` was read.
    fn parse_in_generation(&self, session: &Session, generation: u64) -> Result<Arc<ParsedSession>> {
        if let Some(parsed) = read(&self.parsed).get(&session.id) {
            return Ok(Arc::clone(parsed));
        }

        let parsed = Arc::new(self.assembler.assemble(session)?);
        let mut cache = write(&self.parsed);
        if self.generation() != generation {
            tracing::debug!(session_id = %session.id, "Assembly overtaken by invalidation, not cached");
            return Ok(parsed);
        }
        Ok(Arc::clone(
            cache.entry(session.id.clone()).or_insert(parsed),
        ))
    }

    /// Assemble every discovered session. Sessions that fail are logged and skipped.
    pub fn parse_all(&self) -> Result<Vec<Arc<ParsedSession>>> {
        self.parse_all_with_progress(|_, _, _| {})
    }

    /// Assemble every discovered session, reporting progress.
    ///
    /// The callback receives `(current, total, session)` before each session
    /// is assembled, with `current` starting at 1.
    pub fn parse_all_with_progress<F>(&self, mut on_progress: F) -> Result<Vec<Arc<ParsedSession>>>
    where
        F: FnMut(usize, usize, &Session),
    {
        let generation = self.generation();
        let sessions = self.sessions()?;
        let total = sessions.len();
        let mut parsed = Vec::with_capacity(total);

        for (idx, session) in sessions.iter().enumerate() {
            on_progress(idx + 1, total, session);
            match self.parse_in_generation(session, generation) {
                Ok(p) => parsed.push(p),
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Failed to parse session, skipping");
                }
            }
        }

        tracing::info!(parsed = parsed.len(), total, "Parsed sessions");
        Ok(parsed)
    }

    /// Drop both caches and start a new generation.
    pub fn invalidate(&self) {
        let mut sessions = write(&self.sessions);
        let mut parsed = write(&self.parsed);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *sessions = None;
        parsed.clear();
        tracing::debug!("Session caches invalidated");
    }

    /// Invalidate, rediscover, and return the number of sessions found.
    pub fn refresh(&self) -> Result<usize> {
        self.invalidate();
        let count = self.sessions()?.len();
        tracing::info!(count, "Session store refreshed");
        Ok(count)
    }
}
