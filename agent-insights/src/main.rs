//! agent-insights - analytics over multi-agent team sessions
//!
//! Discovers team sessions under the log root, reconstructs each one and
//! prints a cross-session report.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/agent-insights/agent-insights.log (~/.local/state/agent-insights/)
//! - Config: $XDG_CONFIG_HOME/agent-insights/config.toml (~/.config/agent-insights/config.toml)

use agent_insights_core::analytics::{AnalyticsEngine, AnalyticsResult, FilterOptions};
use agent_insights_core::format::{
    format_date, format_duration, format_hour, format_relative_time, short_project_name,
};
use agent_insights_core::{Config, SessionStore};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agent-insights")]
#[command(about = "Analytics for multi-agent team sessions")]
#[command(version)]
struct Args {
    /// Log root to scan (defaults to ~/.claude/projects)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Only include projects whose name contains this text
    #[arg(short, long)]
    project: Option<String>,

    /// Only include sessions from the last N days/weeks/months (e.g. 7d, 2w, 3m)
    #[arg(short, long)]
    last: Option<String>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Write the full report as pretty JSON to this file
    #[arg(short, long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(root) = &args.root {
        config.discovery.root = Some(root.clone());
    }

    let _log_guard = agent_insights_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!(root = %config.projects_root().display(), "agent-insights starting");

    let store = SessionStore::from_config(&config);
    let sessions = store.sessions().with_context(|| {
        format!(
            "failed to discover sessions under {}",
            config.projects_root().display()
        )
    })?;

    if sessions.is_empty() {
        println!(
            "No team sessions found under {}",
            config.projects_root().display()
        );
        return Ok(());
    }

    let pb = ProgressBar::new(sessions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let parsed = store
        .parse_all_with_progress(|current, _total, session| {
            pb.set_position(current as u64);
            pb.set_message(session.id.clone());
        })
        .context("failed to parse sessions")?;

    pb.finish_and_clear();

    let filters = FilterOptions {
        project: args.project.clone(),
        last: args.last.clone(),
    };
    let result = AnalyticsEngine::new().calculate(&sessions, &parsed, &filters);

    if let Some(path) = &args.export {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Exported analytics to {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.export.is_none() {
        print_report(&result);
    }

    tracing::info!(
        sessions = result.profile.total_sessions,
        parsed = parsed.len(),
        "agent-insights complete"
    );

    Ok(())
}

fn print_report(result: &AnalyticsResult) {
    let profile = &result.profile;
    let now = Utc::now();

    println!("Team Sessions");
    println!("  Sessions:        {}", profile.total_sessions);
    println!("  Teammates:       {}", profile.total_agents);
    println!("  Communications:  {}", profile.total_communications);
    println!("  Tasks:           {}", profile.total_tasks);
    println!("  Events:          {}", profile.total_events);
    println!(
        "  Avg duration:    {}",
        format_duration(profile.average_duration as i64)
    );
    println!(
        "  Avg team size:   {:.1}",
        profile.average_agents_per_session
    );
    if let (Some(first), Some(last)) = (profile.date_range.first, profile.date_range.last) {
        println!("  Date range:      {} - {}", format_date(first), format_date(last));
    }

    if !profile.most_used_tools.is_empty() {
        println!("\nTop Tools");
        for (tool, count) in &profile.most_used_tools {
            println!("  {:<20} {}", tool, count);
        }
    }

    if !result.projects.is_empty() {
        println!("\nProjects");
        for project in &result.projects {
            let last = project
                .last_activity
                .map(|t| format_relative_time(t, now))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<20} {} sessions, {} agents, {} ({})",
                short_project_name(&project.name),
                project.sessions,
                project.agents,
                format_duration(project.total_duration),
                last
            );
        }
    }

    let trends = &result.trends;
    println!("\nActivity");
    println!(
        "  Last 7 days:     {}",
        trends
            .last7_days
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!("  Last 30 days:    {}", trends.last30_days_total);
    println!(
        "  Peak:            {} on {}",
        format_hour(trends.peak_activity.hour),
        trends.peak_activity.day
    );

    println!("\nInsights");
    for insight in &result.insights {
        println!("  - {}", insight);
    }

    let optimization = &result.optimization;
    if !optimization.recommendations.is_empty() {
        println!("\nTeam Optimization");
        println!("  Optimal team size: {}", optimization.optimal_team_size);
        println!("  Performance score: {}/100", optimization.performance_score);
        for rec in &optimization.recommendations {
            println!("  [{}] {}", rec.icon, rec.message);
        }
    }
}
