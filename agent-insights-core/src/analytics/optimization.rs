//! Team optimization heuristics
//!
//! Scores how well agent teams were used and suggests adjustments. All of
//! these are heuristics over log-derived counts:
//!
//! | Output | Basis |
//! |--------|-------|
//! | Optimal team size | Team size with the highest tasks per agent |
//! | Performance score | 40% utilization, 30% communication, 30% throughput |
//! | Agent utilization | Tool uses per session, relative to the busiest agent name |
//! | Efficiency patterns | Most frequent consecutive tool pairs |

use super::Tally;
use crate::types::{ParsedSession, Session, LEAD_AGENT_NAME};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Team size reported when there is no evidence for another.
pub const DEFAULT_TEAM_SIZE: usize = 3;

/// Number of patterns reported in [`TeamOptimization::efficiency_patterns`].
pub const TOP_PATTERNS: usize = 5;

const PATTERN_DESCRIPTIONS: &[(&str, &str)] = &[
    ("Read -> Edit", "Read-then-edit workflow (review before change)"),
    ("Grep -> Read", "Search-then-read workflow (find then inspect)"),
    ("Read -> Write", "Read-then-write workflow (understand before create)"),
    ("Bash -> Read", "Execute-then-verify workflow"),
    ("Edit -> Bash", "Edit-then-run workflow (change then test)"),
    ("Glob -> Read", "Find-then-read workflow (locate then inspect)"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOptimization {
    pub optimal_team_size: usize,
    pub current_avg_team_size: f64,
    /// 0-100
    pub performance_score: u32,
    pub agent_utilization: Vec<AgentUtilization>,
    pub efficiency_patterns: Vec<EfficiencyPattern>,
    pub recommendations: Vec<OptimizationInsight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilizationStatus {
    High,
    Normal,
    Low,
}

impl UtilizationStatus {
    pub fn from_score(score: u32) -> Self {
        if score >= 60 {
            Self::High
        } else if score >= 30 {
            Self::Normal
        } else {
            Self::Low
        }
    }
}

/// Utilization of one agent name across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUtilization {
    pub agent_name: String,
    pub task_count: u64,
    pub tool_use_count: u64,
    pub message_count: u64,
    /// 0-100, relative to the highest tool rate
    pub utilization_score: u32,
    pub status: UtilizationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyPattern {
    /// `"A -> B"`
    pub pattern: String,
    pub frequency: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
}

/// One recommendation line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationInsight {
    pub icon: String,
    pub severity: Severity,
    pub message: String,
}

impl OptimizationInsight {
    fn new(icon: &str, severity: Severity, message: String) -> Self {
        Self {
            icon: icon.to_string(),
            severity,
            message,
        }
    }
}

pub(crate) fn calculate(sessions: &[&Session], parsed: &[&ParsedSession]) -> TeamOptimization {
    let optimal_team_size = optimal_team_size(parsed);
    let performance_score = performance_score(parsed);
    let agent_utilization = agent_utilization(parsed);
    let efficiency_patterns = efficiency_patterns(parsed);

    let recommendations = recommendations(
        sessions,
        parsed,
        optimal_team_size,
        performance_score,
        &agent_utilization,
        &efficiency_patterns,
    );

    TeamOptimization {
        optimal_team_size,
        current_avg_team_size: average_team_size(sessions),
        performance_score,
        agent_utilization,
        efficiency_patterns,
        recommendations,
    }
}

fn average_team_size(sessions: &[&Session]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    sessions.iter().map(|s| s.agent_count).sum::<usize>() as f64 / sessions.len() as f64
}

// ============================================
// Team size
// ============================================

/// Pick the size with the highest ratio from `(size, ratio)` pairs sorted by
/// ascending size. A later size must be strictly better to win; with no
/// ratio above zero the default size is returned.
pub fn pick_optimal_size(buckets: &[(usize, f64)]) -> usize {
    let mut best_size = DEFAULT_TEAM_SIZE;
    let mut best_ratio = 0.0;
    for &(size, ratio) in buckets {
        if ratio > best_ratio {
            best_ratio = ratio;
            best_size = size;
        }
    }
    best_size
}

/// Team size with the highest tasks per agent, bucketing parsed sessions by
/// agent count.
pub fn optimal_team_size(parsed: &[&ParsedSession]) -> usize {
    // size → (tasks, sessions)
    let mut buckets: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
    for p in parsed.iter().filter(|p| p.stats.agent_count > 0) {
        let bucket = buckets.entry(p.stats.agent_count).or_default();
        bucket.0 += p.tasks.len();
        bucket.1 += 1;
    }

    let ratios: Vec<(usize, f64)> = buckets
        .into_iter()
        .map(|(size, (tasks, count))| (size, tasks as f64 / (size * count) as f64))
        .collect();
    pick_optimal_size(&ratios)
}

// ============================================
// Performance score
// ============================================

/// Weighted 0-100 score from utilization, communication and throughput.
pub fn combine_scores(utilization: f64, communication: f64, throughput: f64) -> u32 {
    (utilization * 0.4 + communication * 0.3 + throughput * 0.3)
        .round()
        .clamp(0.0, 100.0) as u32
}

/// Communication score for a messages-per-agent rate.
fn communication_score(per_agent: f64) -> f64 {
    if (3.0..=10.0).contains(&per_agent) {
        100.0
    } else if per_agent > 0.0 {
        50.0
    } else {
        0.0
    }
}

/// Average component scores over all parsed sessions.
///
/// Sessions without agents contribute zero to every component but still
/// count toward the average.
pub fn performance_score(parsed: &[&ParsedSession]) -> u32 {
    if parsed.is_empty() {
        return 0;
    }

    let (mut utilization, mut communication, mut throughput) = (0.0, 0.0, 0.0);
    for p in parsed {
        let agents = p.stats.agent_count;
        if agents == 0 {
            continue;
        }
        let agents = agents as f64;

        let active = p.agents.values().filter(|a| a.event_count > 2).count();
        utilization += active as f64 / agents * 100.0;
        communication += communication_score(p.communications.len() as f64 / agents);
        throughput += (p.stats.tool_usages as f64 / agents * 5.0).min(100.0);
    }

    let n = parsed.len() as f64;
    combine_scores(utilization / n, communication / n, throughput / n)
}

// ============================================
// Agent utilization
// ============================================

#[derive(Default)]
struct AgentTotals {
    tasks: u64,
    tools: u64,
    messages: u64,
    sessions: u64,
}

impl AgentTotals {
    fn tool_rate(&self) -> f64 {
        self.tools as f64 / self.sessions.max(1) as f64
    }
}

/// Utilization per agent name, highest score first.
pub fn agent_utilization(parsed: &[&ParsedSession]) -> Vec<AgentUtilization> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, AgentTotals> = HashMap::new();

    for p in parsed {
        for agent in p.agents_in_log_order() {
            let entry = totals.entry(agent.name.clone()).or_insert_with(|| {
                order.push(agent.name.clone());
                AgentTotals::default()
            });
            entry.tools += agent.total_tool_uses();
            entry.messages += agent.message_count as u64;
            entry.sessions += 1;
        }
    }

    for p in parsed {
        for task in &p.tasks {
            if let Some(creator) = p.agents.get(&task.created_by) {
                if let Some(entry) = totals.get_mut(&creator.name) {
                    entry.tasks += 1;
                }
            }
        }
    }

    let max_rate = totals
        .values()
        .map(AgentTotals::tool_rate)
        .fold(1.0, f64::max);

    let mut utilization: Vec<AgentUtilization> = order
        .into_iter()
        .filter_map(|name| {
            let t = totals.get(&name)?;
            let score = (t.tool_rate() / max_rate * 100.0).round() as u32;
            Some(AgentUtilization {
                task_count: t.tasks,
                tool_use_count: t.tools,
                message_count: t.messages,
                utilization_score: score,
                status: UtilizationStatus::from_score(score),
                agent_name: name,
            })
        })
        .collect();

    utilization.sort_by(|a, b| b.utilization_score.cmp(&a.utilization_score));
    utilization
}

// ============================================
// Efficiency patterns
// ============================================

fn describe_pattern(pattern: &str) -> String {
    PATTERN_DESCRIPTIONS
        .iter()
        .find(|(p, _)| *p == pattern)
        .map(|(_, d)| d.to_string())
        .unwrap_or_else(|| format!("{pattern} pattern"))
}

/// Most frequent consecutive tool pairs within sessions.
pub fn efficiency_patterns(parsed: &[&ParsedSession]) -> Vec<EfficiencyPattern> {
    let mut pairs = Tally::default();

    for p in parsed {
        let sequence: Vec<&str> = p
            .events
            .iter()
            .flat_map(|e| e.tool_use.iter().map(|t| t.name.as_str()))
            .collect();
        for window in sequence.windows(2) {
            pairs.add(&format!("{} -> {}", window[0], window[1]), 1);
        }
    }

    pairs
        .ranked()
        .into_iter()
        .take(TOP_PATTERNS)
        .map(|(pattern, frequency)| EfficiencyPattern {
            description: describe_pattern(&pattern),
            pattern,
            frequency,
        })
        .collect()
}

// ============================================
// Recommendations
// ============================================

fn recommendations(
    sessions: &[&Session],
    parsed: &[&ParsedSession],
    optimal: usize,
    score: u32,
    utilization: &[AgentUtilization],
    patterns: &[EfficiencyPattern],
) -> Vec<OptimizationInsight> {
    let mut recs = Vec::new();
    if sessions.is_empty() {
        return recs;
    }

    let avg = average_team_size(sessions);
    let optimal_f = optimal as f64;
    if (avg - optimal_f).abs() > 0.5 {
        if avg > optimal_f {
            recs.push(OptimizationInsight::new(
                ">",
                Severity::Warning,
                format!(
                    "Consider reducing team size from ~{avg:.1} to {optimal} agents for better throughput"
                ),
            ));
        } else {
            recs.push(OptimizationInsight::new(
                ">",
                Severity::Info,
                format!("Scaling up to {optimal} agents may improve throughput (currently ~{avg:.1})"),
            ));
        }
    } else {
        recs.push(OptimizationInsight::new(
            "*",
            Severity::Success,
            format!("Team size (~{avg:.1} agents) is near optimal ({optimal})"),
        ));
    }

    let underused: Vec<&str> = utilization
        .iter()
        .filter(|a| a.status == UtilizationStatus::Low && a.agent_name != LEAD_AGENT_NAME)
        .take(3)
        .map(|a| a.agent_name.as_str())
        .collect();
    if !underused.is_empty() {
        recs.push(OptimizationInsight::new(
            "!",
            Severity::Warning,
            format!(
                "Underutilized agents detected: {} (consider consolidating)",
                underused.join(", ")
            ),
        ));
    }

    let total_comms: usize = parsed.iter().map(|p| p.communications.len()).sum();
    let total_agents: usize = parsed.iter().map(|p| p.stats.agent_count).sum();
    let per_agent = if total_agents > 0 {
        total_comms as f64 / total_agents as f64
    } else {
        0.0
    };
    recs.push(if per_agent < 1.0 {
        OptimizationInsight::new(
            "!",
            Severity::Warning,
            format!(
                "Low inter-agent communication ({per_agent:.1}/agent). Agents may be working in isolation"
            ),
        )
    } else if per_agent > 15.0 {
        OptimizationInsight::new(
            "!",
            Severity::Warning,
            format!(
                "High communication overhead ({per_agent:.1}/agent). Consider clearer task boundaries"
            ),
        )
    } else {
        OptimizationInsight::new(
            "*",
            Severity::Success,
            format!("Communication balance is healthy ({per_agent:.1} messages/agent)"),
        )
    });

    if sessions.len() >= 10 {
        let recent = average_team_size(&sessions[..5]);
        let older = average_team_size(&sessions[5..10]);
        let change = (recent - older) / older.max(1.0) * 100.0;
        if change.abs() > 10.0 {
            let sign = if change > 0.0 { "+" } else { "" };
            recs.push(OptimizationInsight::new(
                ">",
                Severity::Info,
                format!("Team size trend: {sign}{change:.0}% over recent sessions"),
            ));
        }
    }

    if let Some(top) = patterns.first() {
        recs.push(OptimizationInsight::new(
            "*",
            Severity::Success,
            format!(
                "Top workflow: {} ({}x) - {}",
                top.pattern, top.frequency, top.description
            ),
        ));
    }

    let (icon, severity) = if score >= 60 {
        ("*", Severity::Success)
    } else if score >= 40 {
        ("!", Severity::Info)
    } else {
        ("!", Severity::Warning)
    };
    recs.push(OptimizationInsight::new(
        icon,
        severity,
        format!("Overall performance score: {score}/100"),
    ));

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::*;
    use crate::types::AgentInfo;

    fn agents(n: usize, events: usize) -> Vec<AgentInfo> {
        (0..n)
            .map(|i| agent(&format!("a{i}"), &format!("agent{i}"), events, &[], 0))
            .collect()
    }

    fn with_tasks(id: &str, size: usize, tasks: usize) -> ParsedSession {
        parsed(
            id,
            agents(size, 3),
            vec![],
            vec![],
            (0..tasks).map(|_| task("a0")).collect(),
        )
    }

    #[test]
    fn test_pick_optimal_size() {
        assert_eq!(pick_optimal_size(&[]), DEFAULT_TEAM_SIZE);
        assert_eq!(pick_optimal_size(&[(2, 0.0), (5, 0.0)]), DEFAULT_TEAM_SIZE);
        assert_eq!(pick_optimal_size(&[(2, 1.5), (4, 2.0), (6, 0.5)]), 4);
        // Equal ratio: the smaller size keeps the win
        assert_eq!(pick_optimal_size(&[(2, 1.0), (4, 1.0)]), 2);
    }

    #[test]
    fn test_optimal_team_size_buckets() {
        // Size 2: 4 tasks / (2 * 1) = 2.0; size 4: 4 tasks / (4 * 2) = 0.5
        let s1 = with_tasks("s1", 2, 4);
        let s2 = with_tasks("s2", 4, 2);
        let s3 = with_tasks("s3", 4, 2);
        assert_eq!(optimal_team_size(&[&s1, &s2, &s3]), 2);
        assert_eq!(optimal_team_size(&[]), DEFAULT_TEAM_SIZE);

        let empty = parsed("e", vec![], vec![], vec![], vec![task("x")]);
        assert_eq!(optimal_team_size(&[&empty]), DEFAULT_TEAM_SIZE);
    }

    #[test]
    fn test_combine_scores_monotonic() {
        let base = combine_scores(50.0, 50.0, 50.0);
        assert_eq!(base, 50);
        assert!(combine_scores(60.0, 50.0, 50.0) >= base);
        assert!(combine_scores(50.0, 60.0, 50.0) >= base);
        assert!(combine_scores(50.0, 50.0, 60.0) >= base);
        assert_eq!(combine_scores(100.0, 100.0, 100.0), 100);
        assert_eq!(combine_scores(0.0, 0.0, 0.0), 0);
    }

    #[test]
    fn test_performance_score() {
        // 2 agents, both active; 6 comms → 3/agent → 100; 10 tools → 5/agent → 25
        let events: Vec<_> = (0..10)
            .map(|_| tool_event("a0", "Read", ts(2026, 1, 5, 10)))
            .collect();
        let comms: Vec<_> = (0..6).map(|_| communication("a0", "a1")).collect();
        let p = parsed("s1", agents(2, 5), events, comms, vec![]);
        // 0.4 * 100 + 0.3 * 100 + 0.3 * 25 = 77.5
        assert_eq!(performance_score(&[&p]), 78);

        // An agentless session halves every average
        let empty = parsed("s2", vec![], vec![], vec![], vec![]);
        assert_eq!(performance_score(&[&p, &empty]), 39);
        assert_eq!(performance_score(&[]), 0);
    }

    #[test]
    fn test_agent_utilization_by_name() {
        let s1 = parsed(
            "s1",
            vec![
                agent("lead", "Lead", 10, &[("Task", 2)], 3),
                agent("x1", "coder", 10, &[("Edit", 6), ("Read", 4)], 1),
                agent("x2", "reviewer", 3, &[("Read", 1)], 0),
            ],
            vec![],
            vec![],
            vec![task("lead"), task("x1"), task("ghost")],
        );
        let s2 = parsed(
            "s2",
            vec![agent("y1", "coder", 10, &[("Edit", 10)], 2)],
            vec![],
            vec![],
            vec![],
        );

        let util = agent_utilization(&[&s1, &s2]);
        let names: Vec<&str> = util.iter().map(|u| u.agent_name.as_str()).collect();
        assert_eq!(names, vec!["coder", "Lead", "reviewer"]);

        let coder = &util[0];
        assert_eq!(coder.tool_use_count, 20);
        assert_eq!(coder.message_count, 3);
        assert_eq!(coder.task_count, 1);
        assert_eq!(coder.utilization_score, 100);
        assert_eq!(coder.status, UtilizationStatus::High);

        // rate 2 / max 10
        assert_eq!(util[1].utilization_score, 20);
        assert_eq!(util[1].status, UtilizationStatus::Low);
        assert_eq!(util[1].task_count, 1);
        assert_eq!(util[2].utilization_score, 10);
    }

    #[test]
    fn test_utilization_ties_keep_lead_first() {
        // "0a1b" sorts before "lead" by id, but the lead log comes first
        let p = parsed(
            "s1",
            vec![
                agent("0a1b", "tester", 5, &[("Bash", 4)], 0),
                agent("lead", "Lead", 5, &[("Task", 4)], 0),
                agent("9f8e", "designer", 5, &[("Edit", 4)], 0),
            ],
            vec![],
            vec![],
            vec![],
        );

        let util = agent_utilization(&[&p]);
        let names: Vec<&str> = util.iter().map(|u| u.agent_name.as_str()).collect();
        assert_eq!(names, vec!["Lead", "tester", "designer"]);
        assert!(util.iter().all(|u| u.utilization_score == 100));
    }

    #[test]
    fn test_utilization_floor_on_max_rate() {
        let p = parsed("s1", vec![agent("a", "idle", 1, &[], 0)], vec![], vec![], vec![]);
        let util = agent_utilization(&[&p]);
        assert_eq!(util[0].utilization_score, 0);
        assert_eq!(util[0].status, UtilizationStatus::Low);
    }

    #[test]
    fn test_efficiency_patterns() {
        let t = ts(2026, 1, 5, 10);
        let events = vec![
            tool_event("a", "Grep", t),
            tool_event("a", "Read", t),
            tool_event("a", "Edit", t),
            tool_event("a", "Read", t),
            tool_event("a", "Edit", t),
            tool_event("a", "Custom", t),
        ];
        let p = parsed("s1", vec![], events, vec![], vec![]);
        // Pairs never span sessions
        let q = parsed("s2", vec![], vec![tool_event("a", "Bash", t)], vec![], vec![]);

        let patterns = efficiency_patterns(&[&p, &q]);
        assert_eq!(patterns[0].pattern, "Read -> Edit");
        assert_eq!(patterns[0].frequency, 2);
        assert_eq!(
            patterns[0].description,
            "Read-then-edit workflow (review before change)"
        );
        assert_eq!(patterns[1].pattern, "Grep -> Read");
        assert_eq!(patterns[2].pattern, "Edit -> Read");
        assert_eq!(patterns[3].description, "Edit -> Custom pattern");
        assert_eq!(patterns.len(), 4);
    }

    #[test]
    fn test_recommendations_order() {
        let t = ts(2026, 1, 5, 10);
        let sessions: Vec<Session> = (0..10)
            .map(|i| session(&format!("s{i}"), "/p", Some(t), if i < 5 { 6 } else { 3 }))
            .collect();
        let session_refs: Vec<&Session> = sessions.iter().collect();

        let p = parsed(
            "s0",
            vec![
                agent("lead", "Lead", 10, &[("Read", 20)], 1),
                agent("a1", "helper", 1, &[], 0),
            ],
            vec![tool_event("lead", "Read", t), tool_event("lead", "Edit", t)],
            vec![],
            vec![task("lead")],
        );

        let opt = calculate(&session_refs, &[&p]);
        let messages: Vec<&str> = opt.recommendations.iter().map(|r| r.message.as_str()).collect();

        assert_eq!(opt.optimal_team_size, 2);
        assert_eq!(opt.current_avg_team_size, 4.5);
        assert!(messages[0].starts_with("Consider reducing team size from ~4.5 to 2"));
        assert_eq!(opt.recommendations[0].severity, Severity::Warning);
        assert_eq!(
            messages[1],
            "Underutilized agents detected: helper (consider consolidating)"
        );
        assert!(messages[2].starts_with("Low inter-agent communication (0.0/agent)"));
        assert_eq!(messages[3], "Team size trend: +100% over recent sessions");
        assert!(messages[4].starts_with("Top workflow: Read -> Edit (1x)"));
        assert!(messages[5].starts_with("Overall performance score: "));
        assert_eq!(messages.len(), 6);
    }

    #[test]
    fn test_score_recommendation_severity() {
        let sessions = [session("s", "/p", None, 3)];
        let refs: Vec<&Session> = sessions.iter().collect();
        let recs = recommendations(&refs, &[], 3, 45, &[], &[]);
        let last = recs.last().unwrap();
        assert_eq!(last.icon, "!");
        assert_eq!(last.severity, Severity::Info);
        assert_eq!(recs[0].severity, Severity::Success);
    }
}
