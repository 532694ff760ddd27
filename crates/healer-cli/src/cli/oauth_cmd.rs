use super::*;
use healer_core::handshake::{HandshakeChannel, HandshakeOutcome, HandshakeSender, origin_of};
use serde_json::Value;
use std::io::BufRead;
use std::thread::JoinHandle;
use std::time::Duration;

/// Provider login. The callback page's message is pasted on stdin, one JSON
/// object per line, and fed to the handshake listener.
pub(super) async fn handle_oauth(shell: &Shell, args: OauthArgs) -> anyhow::Result<()> {
    println!("Open this URL to sign in:");
    println!("  {}", shell.auth.provider_login_url());
    println!("Then paste the callback message here.");

    let mut policy = shell.config.handshake_policy();
    if let Some(secs) = args.timeout_secs {
        policy.timeout = Some(Duration::from_secs(secs));
    }
    let origin = args
        .origin
        .or_else(|| origin_of(shell.config.api_base_url()));

    let before = shell.session.token();
    let mut changes = shell.session.subscribe();
    let (sender, inbox) = HandshakeChannel::open();
    let listener = shell.auth.listen_for_handshake(inbox, policy);

    // Never joined; the read blocks until EOF.
    let stdin = std::io::BufReader::new(std::io::stdin());
    let _reader = spawn_line_reader(stdin, sender, origin);

    let delivered = tokio::select! {
        changed = changes.wait_for(|session| session.token.is_some() && session.token != before) => {
            changed.map(|_| ()).map_err(|_| HandshakeOutcome::Closed)
        }
        outcome = listener.finished() => Err(outcome),
    };

    let current = shell.session.token();
    if let Err(outcome) = delivered
        && (current.is_none() || current == before)
    {
        warn!(outcome = ?outcome, "handshake ended without a new token");
        let err = match outcome {
            HandshakeOutcome::TimedOut => {
                ClientError::validation("timed out waiting for the provider login")
            }
            HandshakeOutcome::Closed | HandshakeOutcome::Deregistered => {
                ClientError::validation("no token was delivered")
            }
        };
        shell.record_failure(AuditEvent::HandshakeToken, &err);
        return Err(err.into());
    }
    let user = shell.session.user().unwrap_or_default();
    println!("Logged in as {}", user.display_name());
    shell.record_ok(AuditEvent::HandshakeToken, json!({ "method": "oauth" }));
    Ok(())
}

/// Blank and non-JSON lines are skipped; shape checks happen in the listener.
pub(super) fn parse_handshake_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Forwards each JSON line from `input` to the listener on a plain thread.
/// Stops at EOF, on a read error, or once the listener is gone.
pub(super) fn spawn_line_reader<R>(
    input: R,
    sender: HandshakeSender,
    origin: Option<String>,
) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else {
                break;
            };
            let Some(payload) = parse_handshake_line(&line) else {
                continue;
            };
            if !sender.post(origin.as_deref(), payload) {
                break;
            }
        }
    })
}
