use anyhow::Context;
use clap::Parser;
use healer_client::{HttpBackend, KeyringVault};
use healer_core::audit::{AuditEvent, AuditLogger};
use healer_core::auth_flow::AuthService;
use healer_core::backend::HealerBackend;
use healer_core::config::{AppConfig, default_config_path};
use healer_core::derived::branch_name;
use healer_core::error::ClientError;
use healer_core::navigation::{Navigator, Route};
use healer_core::session::SessionStore;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod app;
mod args;
mod auth_cmd;
mod oauth_cmd;
mod run_cmd;
mod shell;
#[cfg(test)]
mod tests;

use args::*;

use auth_cmd::{
    handle_forgot_password, handle_login, handle_logout, handle_reset_password, handle_signup,
    handle_verify_otp, handle_whoami,
};
use oauth_cmd::handle_oauth;
use run_cmd::handle_run;
use shell::{Shell, route_hint};

pub async fn run() -> anyhow::Result<()> {
    app::run().await
}
