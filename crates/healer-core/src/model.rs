use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("unknown")
    }
}

/// Authentication state for the lifetime of the process.
///
/// `token` and `user` are always written together; a session with a token
/// always carries a (possibly empty) profile.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub loading: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Snapshot of the launch form taken when a launch is accepted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub repo_url: String,
    pub team_name: String,
    pub leader_name: String,
}

impl RunConfig {
    pub fn new(
        repo_url: impl Into<String>,
        team_name: impl Into<String>,
        leader_name: impl Into<String>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            team_name: team_name.into(),
            leader_name: leader_name.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    Running,
    Done,
    Displayed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Done => "done",
            RunPhase::Displayed => "displayed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogColor {
    Success,
    Failure,
    Command,
    Progress,
    Muted,
    Plain,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub text: String,
    pub color: LogColor,
    pub sequence_index: usize,
}

/// One fix reported by the backend for a run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub bug_type: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub status: String,
}

impl FixRecord {
    pub fn is_fixed(&self) -> bool {
        self.status.eq_ignore_ascii_case("fixed") || self.status.eq_ignore_ascii_case("patched")
    }
}

/// Payload of a successful `run-agent` call.
///
/// Every field is optional on the wire; absent telemetry degrades to zero
/// rather than failing the launch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub iterations: u32,
    #[serde(default)]
    pub time_taken: f64,
    #[serde(default)]
    pub total_fixes: u32,
    #[serde(default)]
    pub fixes: Vec<FixRecord>,
    #[serde(default)]
    pub logs: Option<Vec<serde_json::Value>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunTelemetry {
    pub time_taken_secs: f64,
    pub iterations: u32,
    pub total_fixes: u32,
}

impl From<&RunReport> for RunTelemetry {
    fn from(report: &RunReport) -> Self {
        Self {
            time_taken_secs: report.time_taken,
            iterations: report.iterations,
            total_fixes: report.total_fixes.max(report.fixes.len() as u32),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: i64,
    pub speed_bonus: i64,
    pub penalty: i64,
    pub total: i64,
}

impl ScoreBreakdown {
    /// `penalty` is signed and added as-is, so deductions are negative.
    pub fn new(base: i64, speed_bonus: i64, penalty: i64) -> Self {
        Self {
            base,
            speed_bonus,
            penalty,
            total: base + speed_bonus + penalty,
        }
    }
}
