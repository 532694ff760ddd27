use crate::model::{LogColor, LogEntry, RunReport};
use serde_json::Value;

const CI_ITERATION_LIMIT: u32 = 5;

/// Builds the playback script for a run.
///
/// A `logs` array in the report is used verbatim, with malformed items left
/// as `None` so playback skips them. Otherwise the script is derived from the
/// reported fixes and CI telemetry.
pub fn log_script(report: &RunReport, branch: &str) -> Vec<Option<LogEntry>> {
    if let Some(logs) = &report.logs {
        return logs
            .iter()
            .enumerate()
            .map(|(index, value)| entry_from_value(index, value))
            .collect();
    }
    synthesize(report, branch)
        .into_iter()
        .enumerate()
        .map(|(index, (text, color))| {
            Some(LogEntry {
                text,
                color,
                sequence_index: index,
            })
        })
        .collect()
}

pub fn entry_from_value(index: usize, value: &Value) -> Option<LogEntry> {
    let text = value.get("text")?.as_str()?;
    if text.is_empty() {
        return None;
    }
    let color = value
        .get("color")
        .and_then(Value::as_str)
        .map(parse_color)
        .unwrap_or(LogColor::Plain);
    Some(LogEntry {
        text: text.to_string(),
        color,
        sequence_index: index,
    })
}

fn parse_color(tag: &str) -> LogColor {
    match tag.trim().to_ascii_lowercase().as_str() {
        "success" | "ok" | "green" => LogColor::Success,
        "failure" | "error" | "red" => LogColor::Failure,
        "command" | "info" | "blue" => LogColor::Command,
        "progress" | "warning" | "yellow" => LogColor::Progress,
        "muted" | "dim" | "gray" | "grey" => LogColor::Muted,
        _ => LogColor::Plain,
    }
}

fn synthesize(report: &RunReport, branch: &str) -> Vec<(String, LogColor)> {
    let mut lines = Vec::with_capacity(report.fixes.len() + 4);
    for fix in &report.fixes {
        let location = match fix.line {
            Some(line) => format!("{}:{line}", fix.file),
            None => fix.file.clone(),
        };
        let bug_type = fix.bug_type.to_uppercase();
        if fix.is_fixed() {
            lines.push((
                format!("✓ [AI-AGENT] {bug_type} {location} patched"),
                LogColor::Success,
            ));
        } else {
            lines.push((
                format!("X [AI-AGENT] {bug_type} {location} failed"),
                LogColor::Failure,
            ));
        }
    }
    let branch = report.branch.as_deref().unwrap_or(branch);
    lines.push((format!("$ git push origin {branch}"), LogColor::Command));
    lines.push((
        format!(
            "→ Monitoring Actions pipeline... iteration {}/{CI_ITERATION_LIMIT}",
            report.iterations.max(1)
        ),
        LogColor::Progress,
    ));
    let fixed = report.fixes.iter().filter(|fix| fix.is_fixed()).count();
    let status = report.status.as_deref().unwrap_or("UNKNOWN").to_uppercase();
    let summary = if status == "PASSED" {
        format!(
            "— ✓ ALL TESTS PASSED — {fixed} fixes in {} —",
            format_duration(report.time_taken)
        )
    } else {
        format!(
            "— CI {status} — {fixed} fixes in {} —",
            format_duration(report.time_taken)
        )
    };
    let summary_color = if status == "PASSED" {
        LogColor::Success
    } else {
        LogColor::Failure
    };
    lines.push((summary, summary_color));
    lines.push((
        "$ Writing results.json... complete.".to_string(),
        LogColor::Muted,
    ));
    lines
}

pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    format!("{}m {}s", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FixRecord;
    use serde_json::json;

    #[test]
    fn explicit_logs_keep_malformed_slots() {
        let report = RunReport {
            logs: Some(vec![
                json!({"text": "clone", "color": "muted"}),
                json!({"color": "red"}),
                json!("not an object"),
                json!({"text": "done", "color": "success"}),
            ]),
            ..RunReport::default()
        };
        let script = log_script(&report, "B_AI_FIX");
        assert_eq!(script.len(), 4);
        assert!(script[1].is_none());
        assert!(script[2].is_none());
        let last = script[3].as_ref().unwrap();
        assert_eq!(last.color, LogColor::Success);
        assert_eq!(last.sequence_index, 3);
    }

    #[test]
    fn synthesized_script_covers_fixes_and_ci() {
        let report = RunReport {
            status: Some("PASSED".to_string()),
            iterations: 3,
            time_taken: 237.0,
            fixes: vec![
                FixRecord {
                    file: "src/validator.py".to_string(),
                    bug_type: "syntax".to_string(),
                    line: Some(8),
                    status: "Fixed".to_string(),
                },
                FixRecord {
                    file: "src/helpers.py".to_string(),
                    bug_type: "LOGIC".to_string(),
                    line: Some(77),
                    status: "Failed".to_string(),
                },
            ],
            ..RunReport::default()
        };
        let script: Vec<LogEntry> = log_script(&report, "RIFT_ADA_AI_FIX")
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(script.len(), 6);
        assert_eq!(script[0].text, "✓ [AI-AGENT] SYNTAX src/validator.py:8 patched");
        assert_eq!(script[1].color, LogColor::Failure);
        assert_eq!(script[2].text, "$ git push origin RIFT_ADA_AI_FIX");
        assert!(script[3].text.contains("iteration 3/5"));
        assert!(script[4].text.contains("1 fixes in 3m 57s"));
        assert_eq!(script[5].color, LogColor::Muted);
    }
}
