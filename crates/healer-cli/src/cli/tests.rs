use super::app::load_config;
use super::oauth_cmd::{parse_handshake_line, spawn_line_reader};
use super::run_cmd::{render_log_line, results_lines};
use super::*;
use healer_core::derived::ScoringPolicy;
use healer_core::handshake::{HandshakeChannel, HandshakeListener, HandshakePolicy};
use healer_core::model::{
    FixRecord, LogColor, LogEntry, RunConfig, RunReport, RunTelemetry,
};
use healer_core::navigation::HistoryNavigator;
use healer_core::run_controller::RunResults;
use healer_core::session::MemoryVault;
use std::io::{BufReader, Cursor, Read};
use tempfile::TempDir;

/// Input that blocks like an idle terminal until its sender is dropped.
struct HeldOpen(std::sync::mpsc::Receiver<()>);

impl Read for HeldOpen {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        let _ = self.0.recv();
        Ok(0)
    }
}

#[test]
fn run_command_parses() {
    let cli = Cli::try_parse_from([
        "healer",
        "run",
        "--repo-url",
        "https://github.com/a/b",
        "--team",
        "RIFT",
        "--leader",
        "Ada",
    ])
    .unwrap();
    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.repo_url, "https://github.com/a/b");
            assert_eq!(args.team, "RIFT");
            assert_eq!(args.leader, "Ada");
        }
        _ => panic!("expected run command"),
    }
}

#[test]
fn global_overrides_parse_after_subcommand() {
    let cli = Cli::try_parse_from([
        "healer",
        "whoami",
        "--api-base-url",
        "https://healer.example",
        "--config",
        "/tmp/healer.json",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Whoami));
    assert_eq!(cli.api_base_url.as_deref(), Some("https://healer.example"));
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/healer.json")));
    assert_eq!(command_label(&cli.command), "whoami");
}

#[test]
fn recovery_commands_use_kebab_case() {
    let cli = Cli::try_parse_from([
        "healer",
        "reset-password",
        "--email",
        "a@b.co",
        "--otp",
        "123456",
        "--password",
        "longenough",
        "--confirm",
        "longenough",
    ])
    .unwrap();
    assert_eq!(command_label(&cli.command), "reset-password");
    assert!(Cli::try_parse_from(["healer", "verify-otp", "--email", "a@b.co"]).is_err());
}

#[test]
fn load_config_applies_base_url_override() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.json");
    std::fs::write(&path, r#"{"playback_interval_ms": 100}"#).unwrap();

    let config = load_config(Some(&path), Some("https://healer.example")).unwrap();
    assert_eq!(config.api_base_url(), "https://healer.example");
    assert_eq!(config.playback_interval_ms, 100);

    let config = load_config(Some(&tmp.path().join("missing.json")), None).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn handshake_lines_skip_noise() {
    assert!(parse_handshake_line("   ").is_none());
    assert!(parse_handshake_line("token=abc").is_none());
    let payload = parse_handshake_line(r#" {"token": "abc"} "#).unwrap();
    assert_eq!(payload["token"], "abc");
}

#[test]
fn open_stdin_does_not_keep_runtime_alive_after_login() {
    let (release, held) = std::sync::mpsc::channel::<()>();
    let input = BufReader::new(
        Cursor::new("\nnoise\n{\"token\":\"abc\"}\n").chain(HeldOpen(held)),
    );
    let session = SessionStore::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let (sender, inbox) = HandshakeChannel::open();
        let policy = HandshakePolicy {
            allowed_origin: Some("http://localhost:8000".to_string()),
            timeout: None,
        };
        let _listener = HandshakeListener::register(
            inbox,
            session.clone(),
            Arc::new(HistoryNavigator::default()),
            policy,
        );
        let mut changes = session.subscribe();
        let origin = Some("http://localhost:8000".to_string());
        let _reader = spawn_line_reader(input, sender, origin);
        changes
            .wait_for(|session| session.token.is_some())
            .await
            .unwrap();
    });
    // The reader thread is still blocked on input here.
    drop(runtime);

    assert_eq!(session.token().as_deref(), Some("abc"));
    drop(release);
}

#[test]
fn line_reader_stops_at_eof() {
    let (sender, _inbox) = HandshakeChannel::open();
    let input = Cursor::new("{\"token\":\"abc\"}\nnot json\n");
    let reader = spawn_line_reader(input, sender, None);
    reader.join().unwrap();
}

#[test]
fn log_lines_render_plain_without_terminal() {
    let entry = LogEntry {
        text: "$ git push origin RIFT_ADA_AI_FIX".to_string(),
        color: LogColor::Command,
        sequence_index: 3,
    };
    assert_eq!(
        render_log_line(&entry, false),
        "$ git push origin RIFT_ADA_AI_FIX"
    );
    assert!(render_log_line(&entry, true).starts_with("\x1b[36m"));
}

#[test]
fn results_lines_include_branch_and_score() {
    let report = RunReport {
        status: Some("PASSED".to_string()),
        iterations: 2,
        time_taken: 75.0,
        total_fixes: 1,
        fixes: vec![FixRecord {
            file: "src/app.py".to_string(),
            bug_type: "LINTING".to_string(),
            line: Some(12),
            status: "Fixed".to_string(),
        }],
        ..RunReport::default()
    };
    let results = RunResults {
        config: RunConfig::new("https://github.com/a/b", "RIFT", "Ada"),
        branch_name: "RIFT_ADA_AI_FIX".to_string(),
        score: ScoringPolicy::default().score(&RunTelemetry::from(&report)),
        report,
    };
    let lines = results_lines(&results);
    assert!(lines.iter().any(|line| line == "Branch: RIFT_ADA_AI_FIX"));
    assert!(lines.iter().any(|line| line.contains("src/app.py")));
    assert!(lines.iter().any(|line| line.starts_with("Score: 110")));
}

#[test]
fn route_hints_carry_recovery_state() {
    let hint = route_hint(&Route::ResetPassword {
        email: "a@b.co".to_string(),
        otp: "123456".to_string(),
    });
    assert!(hint.contains("--email a@b.co"));
    assert!(hint.contains("--otp 123456"));
}

#[test]
fn shell_shares_session_with_auth_service() {
    let tmp = TempDir::new().unwrap();
    let audit = AuditLogger::open_in(tmp.path().to_path_buf(), 1024).unwrap();
    let backend: Arc<dyn HealerBackend> =
        Arc::new(HttpBackend::new("http://localhost:8000").unwrap());
    let session = SessionStore::with_vault(Arc::new(MemoryVault::with_token("stored")));
    let shell = Shell::with_parts(AppConfig::default(), audit, backend, session);

    assert_eq!(shell.auth.session().token().as_deref(), Some("stored"));
    shell.auth.logout();
    assert!(shell.session.token().is_none());

    shell.record_ok(AuditEvent::SessionLogout, json!({}));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
}
