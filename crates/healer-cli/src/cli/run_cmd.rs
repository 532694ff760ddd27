use super::*;
use healer_core::launch::{Dashboard, LaunchForm};
use healer_core::model::{LogColor, LogEntry, RunPhase};
use healer_core::report::format_duration;
use healer_core::run_controller::{LaunchDecision, RunController, RunEvent, RunResults};
use std::io::IsTerminal;
use tokio::sync::broadcast::error::RecvError;

pub(super) async fn handle_run(shell: &Shell, args: RunArgs) -> anyhow::Result<()> {
    let controller = RunController::new(shell.config.timing(), shell.config.scoring.clone());
    let dashboard = Dashboard::new(
        shell.backend.clone(),
        shell.session.clone(),
        controller,
        shell.config.error_clear_after(),
    );
    let form = LaunchForm {
        repo_url: args.repo_url,
        team_name: args.team,
        leader_name: args.leader,
    };
    let branch = form.branch_preview();
    println!("Branch: {branch}");

    let mut events = dashboard.controller().events();
    let decision = dashboard
        .launch(&form)
        .await
        .inspect_err(|err| shell.record_failure(AuditEvent::RunLaunch, err))?;
    if decision == LaunchDecision::RejectedRunning {
        shell.record_ok(AuditEvent::RunRejected, json!({ "branch": branch }));
        anyhow::bail!("a run is already in progress");
    }
    shell.record_ok(
        AuditEvent::RunLaunch,
        json!({ "repo_url": form.repo_url.trim(), "branch": branch }),
    );

    let ansi = std::io::stdout().is_terminal();
    loop {
        match events.recv().await {
            Ok(RunEvent::Log(entry)) => println!("{}", render_log_line(&entry, ansi)),
            Ok(RunEvent::Phase(RunPhase::Displayed)) => break,
            Ok(RunEvent::Phase(phase)) => info!(phase = %phase, "run phase"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "log lines dropped"),
            Err(RecvError::Closed) => break,
        }
    }

    let results = dashboard
        .controller()
        .results()
        .context("run ended before results were displayed")?;
    for line in results_lines(&results) {
        println!("{line}");
    }
    shell.record_ok(
        AuditEvent::RunDisplayed,
        json!({
            "branch": results.branch_name,
            "score": results.score.total,
            "total_fixes": results.report.total_fixes,
        }),
    );
    dashboard.close();
    Ok(())
}

pub(super) fn render_log_line(entry: &LogEntry, ansi: bool) -> String {
    if !ansi {
        return entry.text.clone();
    }
    let code = match entry.color {
        LogColor::Success => "32",
        LogColor::Failure => "31",
        LogColor::Command => "36",
        LogColor::Progress => "33",
        LogColor::Muted => "90",
        LogColor::Plain => return entry.text.clone(),
    };
    format!("\x1b[{code}m{}\x1b[0m", entry.text)
}

pub(super) fn results_lines(results: &RunResults) -> Vec<String> {
    let report = &results.report;
    let mut lines = vec![
        String::new(),
        format!("Repository: {}", results.config.repo_url),
        format!(
            "Team: {}  Leader: {}",
            results.config.team_name, results.config.leader_name
        ),
        format!("Branch: {}", results.branch_name),
        format!(
            "Status: {}  Iterations: {}  Time: {}",
            report.status.as_deref().unwrap_or("UNKNOWN"),
            report.iterations,
            format_duration(report.time_taken)
        ),
        format!("Fixes: {}", report.total_fixes),
    ];
    for fix in &report.fixes {
        let line = fix
            .line
            .map(|line| line.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "  {:<32} {:<12} {:>5}  {}",
            fix.file, fix.bug_type, line, fix.status
        ));
    }
    let score = &results.score;
    lines.push(format!(
        "Score: {} (base {} + speed {} + penalty {})",
        score.total, score.base, score.speed_bonus, score.penalty
    ));
    lines
}
