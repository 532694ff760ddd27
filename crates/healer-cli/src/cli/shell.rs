use super::*;

/// Prints view transitions; the terminal has no view stack to replace.
pub(super) struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        println!("{}", route_hint(&route));
    }
}

pub(super) fn route_hint(route: &Route) -> String {
    match route {
        Route::Login => "Next: healer login --email <email> --password <password>".to_string(),
        Route::Dashboard => "Next: healer run --repo-url <url> --team <team> --leader <leader>"
            .to_string(),
        Route::VerifyOtp { email } => {
            format!("Next: healer verify-otp --email {email} --otp <code>")
        }
        Route::ResetPassword { email, otp } => format!(
            "Next: healer reset-password --email {email} --otp {otp} --password <new> --confirm <new>"
        ),
    }
}

/// Everything a command needs: config, audit journal, and the session shared
/// by the auth and launch flows.
pub(super) struct Shell {
    pub(super) config: AppConfig,
    pub(super) audit: AuditLogger,
    pub(super) session: SessionStore,
    pub(super) backend: Arc<dyn HealerBackend>,
    pub(super) auth: AuthService,
}

impl Shell {
    pub(super) fn open(config: AppConfig, audit: AuditLogger) -> anyhow::Result<Self> {
        let backend: Arc<dyn HealerBackend> = Arc::new(HttpBackend::new(config.api_base_url())?);
        let vault = Arc::new(KeyringVault::for_backend(config.api_base_url()));
        let session = SessionStore::with_vault(vault);
        Ok(Self::with_parts(config, audit, backend, session))
    }

    pub(super) fn with_parts(
        config: AppConfig,
        audit: AuditLogger,
        backend: Arc<dyn HealerBackend>,
        session: SessionStore,
    ) -> Self {
        let navigator: Arc<dyn Navigator> = Arc::new(ConsoleNavigator);
        let auth = AuthService::new(backend.clone(), session.clone(), navigator);
        Self {
            config,
            audit,
            session,
            backend,
            auth,
        }
    }

    pub(super) fn record_ok(&self, event: AuditEvent, details: serde_json::Value) {
        if let Err(err) = self.audit.succeeded(event, details) {
            warn!(event = event.name(), error = %err, "failed to write audit entry");
        }
    }

    pub(super) fn record_failure(&self, event: AuditEvent, err: &ClientError) {
        let detail = json!({ "kind": err.kind() });
        if let Err(audit_err) = self.audit.failed(event, Some(detail), &err.to_string()) {
            warn!(event = event.name(), error = %audit_err, "failed to write audit entry");
        }
        if err.requires_login() {
            eprintln!("{}", route_hint(&Route::Login));
        }
    }
}
