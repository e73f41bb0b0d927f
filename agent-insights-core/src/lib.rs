//! # agent-insights-core
//!
//! Core library for agent-insights - team session analytics for Claude Code
//! agent teams.
//!
//! This library provides:
//! - Domain types for team sessions, agents, communications and tasks
//! - Ingestion: discovery, JSON-lines parsing, identity correlation, extraction
//! - A cached [`SessionStore`]
//! - Cross-session analytics and team optimization heuristics
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Raw:** per-agent JSON-lines logs on disk (never modified)
//! - **Parsed:** one [`ParsedSession`] per team session, cached in memory
//! - **Derived:** an [`AnalyticsResult`](analytics::AnalyticsResult) over many sessions
//!
//! ## Example
//!
//! ```rust,no_run
//! use agent_insights_core::analytics::{AnalyticsEngine, FilterOptions};
//! use agent_insights_core::{Config, SessionStore};
//!
//! let config = Config::load().expect("failed to load config");
//! let store = SessionStore::from_config(&config);
//!
//! let sessions = store.sessions().expect("failed to discover sessions");
//! let parsed = store.parse_all().expect("failed to parse sessions");
//! let result = AnalyticsEngine::new().calculate(&sessions, &parsed, &FilterOptions::default());
//! println!("{} sessions", result.profile.total_sessions);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use store::SessionStore;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod store;
pub mod types;
