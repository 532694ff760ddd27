//! Append-only JSONL journal of session and run events.
//!
//! Token values never reach the journal; callers pass identifiers and
//! outcomes only. One file per UTC day, split into numbered segments once a
//! segment reaches the size cap.

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

const SEGMENT_CAP_BYTES: u64 = 5 * 1024 * 1024;

/// Journaled events. The wire name is what lands in the `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    SessionLogin,
    SessionSignup,
    SessionLogout,
    SessionProfile,
    HandshakeToken,
    RecoveryRequest,
    RecoveryVerify,
    RecoveryReset,
    RunLaunch,
    RunRejected,
    RunDisplayed,
    CommandFailed,
}

impl AuditEvent {
    pub fn name(self) -> &'static str {
        match self {
            AuditEvent::SessionLogin => "session.login",
            AuditEvent::SessionSignup => "session.signup",
            AuditEvent::SessionLogout => "session.logout",
            AuditEvent::SessionProfile => "session.profile",
            AuditEvent::HandshakeToken => "handshake.token",
            AuditEvent::RecoveryRequest => "recovery.request",
            AuditEvent::RecoveryVerify => "recovery.verify",
            AuditEvent::RecoveryReset => "recovery.reset",
            AuditEvent::RunLaunch => "run.launch",
            AuditEvent::RunRejected => "run.rejected",
            AuditEvent::RunDisplayed => "run.displayed",
            AuditEvent::CommandFailed => "app.error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Ok,
    Failed,
}

#[derive(Serialize)]
struct JournalLine<'a> {
    at: String,
    session_id: &'a str,
    entry_id: String,
    event: &'static str,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Clone)]
pub struct AuditLogger {
    dir: PathBuf,
    session_id: String,
    segment_cap: u64,
}

impl AuditLogger {
    /// Journal under the platform data directory.
    pub fn open() -> anyhow::Result<Self> {
        Self::open_in(crate::config::default_audit_dir()?, SEGMENT_CAP_BYTES)
    }

    pub fn open_in(dir: PathBuf, segment_cap: u64) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("create audit dir {}", dir.display()))?;
        Ok(Self {
            dir,
            session_id: Uuid::new_v4().to_string(),
            segment_cap,
        })
    }

    /// Returns the entry id.
    pub fn succeeded(&self, event: AuditEvent, detail: Value) -> anyhow::Result<String> {
        self.append(event, Outcome::Ok, Some(detail), None)
    }

    pub fn failed(
        &self,
        event: AuditEvent,
        detail: Option<Value>,
        error: &str,
    ) -> anyhow::Result<String> {
        self.append(event, Outcome::Failed, detail, Some(error))
    }

    fn append(
        &self,
        event: AuditEvent,
        outcome: Outcome,
        detail: Option<Value>,
        error: Option<&str>,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let entry_id = Uuid::new_v4().to_string();
        let line = JournalLine {
            at: now.format(&Rfc3339).context("format timestamp")?,
            session_id: &self.session_id,
            entry_id: entry_id.clone(),
            event: event.name(),
            outcome,
            detail,
            error,
        };
        let mut encoded = serde_json::to_vec(&line).context("encode audit line")?;
        encoded.push(b'\n');

        let day = format!(
            "{:04}{:02}{:02}",
            now.year(),
            u8::from(now.month()),
            now.day()
        );
        let path = open_segment(&self.dir, &day, self.segment_cap);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(&encoded))
            .with_context(|| format!("append to {}", path.display()))?;
        Ok(entry_id)
    }
}

/// First segment for `day` that is still under the cap: `audit-DAY.jsonl`,
/// then `audit-DAY.1.jsonl`, `audit-DAY.2.jsonl`, ...
fn open_segment(dir: &Path, day: &str, cap: u64) -> PathBuf {
    (0u32..)
        .map(|index| match index {
            0 => dir.join(format!("audit-{day}.jsonl")),
            n => dir.join(format!("audit-{day}.{n}.jsonl")),
        })
        .find(|path| fs::metadata(path).map_or(true, |meta| meta.len() < cap))
        .unwrap_or_else(|| dir.join(format!("audit-{day}.jsonl")))
}
