//! Ingestion layer: from raw team-session logs to [`ParsedSession`]s
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ ~/.claude/       │ ──► │ SessionDiscovery │ ──► │ Session          │
//! │   projects/...   │     └──────────────────┘     └────────┬─────────┘
//! └──────────────────┘                                       │
//!                                                            ▼
//!                      ┌─────────────────────────────────────────────────┐
//!                      │ SessionAssembler                                │
//!                      │  ├─ events      (JSON lines → SessionEvent)     │
//!                      │  ├─ correlate   (spawn name ↔ agent log)        │
//!                      │  └─ extract     (communications, tasks)         │
//!                      └─────────────────────────────────────────────────┘
//!                                                            │
//!                                                            ▼
//!                                                    ParsedSession
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use agent_insights_core::ingest::{SessionAssembler, SessionDiscovery};
//!
//! let discovery = SessionDiscovery::new("/home/dev/.claude/projects");
//! let assembler = SessionAssembler::new();
//! for session in discovery.discover()? {
//!     let parsed = assembler.assemble(&session)?;
//!     println!("{}: {} agents", parsed.id, parsed.agents.len());
//! }
//! # Ok::<(), agent_insights_core::Error>(())
//! ```
//!
//! [`ParsedSession`]: crate::types::ParsedSession

pub mod assemble;
pub mod correlate;
pub mod discovery;
pub mod events;
pub mod extract;

pub use assemble::SessionAssembler;
pub use correlate::{AgentStart, GreedyNearestCorrelator, IdentityCorrelator, SpawnIntent};
pub use discovery::SessionDiscovery;
pub use events::{parse_jsonl_file, parse_jsonl_reader, MAX_TEXT_CHARS};
pub use extract::{
    extract_communications, extract_tasks, IncomingMessage, MessageTagParser, TeammateTagParser,
};
