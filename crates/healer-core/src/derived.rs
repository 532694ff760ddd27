//! Pure derivations exposed once a run is displayed.

use crate::model::{RunTelemetry, ScoreBreakdown};
use serde::{Deserialize, Serialize};

pub const BRANCH_SUFFIX: &str = "_AI_FIX";

/// Branch label for a team/leader pair.
///
/// Joins with `_`, uppercases, collapses whitespace runs to one `_`, strips
/// anything outside `[A-Z0-9_]`, then appends [`BRANCH_SUFFIX`].
pub fn branch_name(team_name: &str, leader_name: &str) -> String {
    let joined = format!("{team_name}_{leader_name}").to_uppercase();
    let mut collapsed = String::with_capacity(joined.len());
    let mut in_whitespace = false;
    for ch in joined.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                collapsed.push('_');
            }
            in_whitespace = true;
        } else {
            collapsed.push(ch);
            in_whitespace = false;
        }
    }
    let mut branch: String = collapsed
        .chars()
        .filter(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || *ch == '_')
        .collect();
    branch.push_str(BRANCH_SUFFIX);
    branch
}

/// Integrator-defined scoring.
///
/// The default reproduces the constants the dashboard has always shown
/// (base 100, speed bonus 10, no penalty). Set `speed_threshold_secs` or
/// `penalty_per_iteration` to make the score depend on telemetry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub base: i64,
    pub speed_bonus: i64,
    pub speed_threshold_secs: Option<f64>,
    pub penalty_per_iteration: i64,
    pub free_iterations: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base: 100,
            speed_bonus: 10,
            speed_threshold_secs: None,
            penalty_per_iteration: 0,
            free_iterations: 0,
        }
    }
}

impl ScoringPolicy {
    pub fn score(&self, telemetry: &RunTelemetry) -> ScoreBreakdown {
        let speed_bonus = match self.speed_threshold_secs {
            Some(threshold) if telemetry.time_taken_secs > threshold => 0,
            _ => self.speed_bonus,
        };
        let extra = telemetry.iterations.saturating_sub(self.free_iterations) as i64;
        let penalty = -(extra * self.penalty_per_iteration.abs());
        ScoreBreakdown::new(self.base, speed_bonus, penalty)
    }
}
