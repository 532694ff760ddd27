use crate::derived::ScoringPolicy;
use crate::handshake::{HandshakePolicy, origin_of};
use crate::run_controller::RunTiming;
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub playback_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub error_clear_ms: u64,
    pub handshake_timeout_secs: Option<u64>,
    /// Origin accepted for handshake messages. Falls back to the origin of
    /// `api_base_url` when unset.
    pub allowed_origin: Option<String>,
    pub scoring: ScoringPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            playback_interval_ms: 800,
            settle_delay_ms: 800,
            error_clear_ms: 3000,
            handshake_timeout_secs: None,
            allowed_origin: None,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).context("read config")?;
        let config = serde_json::from_str(&data).context("parse config")?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create config directory")?;
        }
        let data = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, data).context("write config")?;
        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn timing(&self) -> RunTiming {
        RunTiming {
            playback_interval: Duration::from_millis(self.playback_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn error_clear_after(&self) -> Duration {
        Duration::from_millis(self.error_clear_ms)
    }

    pub fn handshake_policy(&self) -> HandshakePolicy {
        let allowed_origin = self
            .allowed_origin
            .clone()
            .or_else(|| origin_of(&self.api_base_url));
        HandshakePolicy {
            allowed_origin,
            timeout: self.handshake_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from("com", "repo-healer", "repo-healer").context("resolve project dirs")
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

pub fn default_audit_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().join("audit"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.timing().playback_interval, Duration::from_millis(800));
        assert_eq!(config.error_clear_after(), Duration::from_secs(3));
    }

    #[test]
    fn save_and_reload_partial_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"api_base_url":"https://healer.example/","handshake_timeout_secs":120}"#,
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.api_base_url(), "https://healer.example");
        assert_eq!(config.settle_delay_ms, 800);

        let policy = config.handshake_policy();
        assert_eq!(
            policy.allowed_origin.as_deref(),
            Some("https://healer.example")
        );
        assert_eq!(policy.timeout, Some(Duration::from_secs(120)));

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }
}
