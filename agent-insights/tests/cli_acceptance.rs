use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    /// Environment whose default log root holds the checked-in fixture.
    fn new() -> Self {
        let env = Self::empty();
        seed_fixture(&env.projects_root());
        env
    }

    /// Environment with no log root at all.
    fn empty() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn projects_root(&self) -> PathBuf {
        self.home.join(".claude/projects")
    }
}

fn copy_dir(source: &Path, target: &Path) {
    fs::create_dir_all(target).expect("failed to create fixture directory");
    for entry in fs::read_dir(source).expect("failed to read fixture directory") {
        let entry = entry.expect("failed to read fixture entry");
        let dest = target.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &dest);
        } else {
            fs::copy(entry.path(), dest).expect("failed to copy fixture file");
        }
    }
}

fn seed_fixture(projects_root: &Path) {
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../agent-insights-core/tests/fixtures/projects");
    copy_dir(&source, projects_root);
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "agent-insights" => PathBuf::from(assert_cmd::cargo::cargo_bin!("agent-insights")),
        "agent-insights-sessions" => {
            PathBuf::from(assert_cmd::cargo::cargo_bin!("agent-insights-sessions"))
        }
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "{bin_name} {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}):\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

// ============================================
// agent-insights
// ============================================

#[test]
fn report_summarizes_fixture_sessions() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, "agent-insights", &[]);
    assert_success("agent-insights", &[], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Team Sessions"), "got:\n{stdout}");
    assert!(stdout.contains("Sessions:        1"), "got:\n{stdout}");
    assert!(stdout.contains("Most active project: webapp (1 sessions)"));
    assert!(stdout.contains("Team Optimization"));

    assert!(
        env.xdg_state.join("agent-insights").is_dir(),
        "log directory should be created under XDG_STATE_HOME"
    );
}

#[test]
fn report_json_honors_filters() {
    let env = CliTestEnv::new();

    let args = ["--json"];
    let output = run_bin(&env, "agent-insights", &args);
    assert_success("agent-insights", &args, &output);
    let json = stdout_json(&output);
    assert_eq!(json["profile"]["totalSessions"], 1);
    assert_eq!(json["profile"]["totalCommunications"], 5);
    assert_eq!(json["trends"]["daily"]["2026-01-05"], 1);

    let args = ["--json", "--project", "api"];
    let output = run_bin(&env, "agent-insights", &args);
    assert_success("agent-insights", &args, &output);
    let json = stdout_json(&output);
    assert_eq!(json["profile"]["totalSessions"], 0);
    assert_eq!(
        json["optimization"]["recommendations"]
            .as_array()
            .map(Vec::len),
        Some(0)
    );
}

#[test]
fn report_exports_to_file() {
    let env = CliTestEnv::new();
    let export = env.home.join("report.json");
    let export_arg = export.to_string_lossy().into_owned();

    let args = ["--export", export_arg.as_str()];
    let output = run_bin(&env, "agent-insights", &args);
    assert_success("agent-insights", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Exported analytics to"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export).expect("export file should exist"))
            .expect("export should be JSON");
    assert_eq!(written["profile"]["totalTasks"], 2);
}

#[test]
fn report_with_no_sessions_exits_cleanly() {
    let env = CliTestEnv::empty();

    let output = run_bin(&env, "agent-insights", &[]);
    assert_success("agent-insights", &[], &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("No team sessions found"));
}

#[test]
fn report_fails_when_root_cannot_be_listed() {
    let env = CliTestEnv::empty();
    let not_a_dir = env.home.join("projects.txt");
    fs::write(&not_a_dir, "not a directory").expect("failed to write file");
    let root_arg = not_a_dir.to_string_lossy().into_owned();

    let output = run_bin(&env, "agent-insights", &["--root", root_arg.as_str()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to discover sessions"));
}

// ============================================
// agent-insights-sessions
// ============================================

#[test]
fn sessions_list_show_and_refresh() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, "agent-insights-sessions", &["list"]);
    assert_success("agent-insights-sessions", &["list"], &output);
    let list = stdout_json(&output);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["id"], "team-session-001");
    assert_eq!(list[0]["agentCount"], 2);

    let args = ["show", "team-session-001"];
    let output = run_bin(&env, "agent-insights-sessions", &args);
    assert_success("agent-insights-sessions", &args, &output);
    let session = stdout_json(&output);
    assert_eq!(session["agents"]["lead"]["name"], "Lead");
    assert_eq!(session["agents"]["a1b2c3d4e5f6a7b8"]["name"], "designer");
    assert_eq!(session["tasks"][0]["status"], "completed");

    let output = run_bin(&env, "agent-insights-sessions", &["refresh"]);
    assert_success("agent-insights-sessions", &["refresh"], &output);
    assert_eq!(stdout_json(&output)["count"], 1);
}

#[test]
fn sessions_show_unknown_id_fails() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, "agent-insights-sessions", &["show", "no-such-session"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no-such-session"));
}

#[test]
fn sessions_root_flag_overrides_default() {
    let env = CliTestEnv::empty();
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../agent-insights-core/tests/fixtures/projects");
    let root_arg = fixture.to_string_lossy().into_owned();

    let args = ["--root", root_arg.as_str(), "list"];
    let output = run_bin(&env, "agent-insights-sessions", &args);
    assert_success("agent-insights-sessions", &args, &output);
    assert_eq!(stdout_json(&output)[0]["projectName"], "/home/dev/webapp");
}
