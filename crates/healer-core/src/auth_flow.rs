use crate::backend::{HealerBackend, SignupRequest};
use crate::error::ClientError;
use crate::handshake::{HandshakeInbox, HandshakeListener, HandshakePolicy};
use crate::model::UserProfile;
use crate::navigation::{Navigator, Route};
use crate::session::{LoginChange, SessionStore};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

pub const OTP_LENGTH: usize = 6;
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").ok());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .map(|pattern| pattern.is_match(email))
        .unwrap_or(false)
}

/// Raises the session's `loading` flag for its own lifetime.
struct LoadingGuard<'a> {
    session: &'a SessionStore,
}

impl<'a> LoadingGuard<'a> {
    fn raise(session: &'a SessionStore) -> Self {
        session.set_loading(true);
        Self { session }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.session.set_loading(false);
    }
}

/// Login, signup, recovery and logout, wired to the shared session.
pub struct AuthService {
    backend: Arc<dyn HealerBackend>,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl AuthService {
    pub fn new(
        backend: Arc<dyn HealerBackend>,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            backend,
            session,
            navigator,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginChange, ClientError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::validation("email and password are required"));
        }
        let grant = {
            let _loading = LoadingGuard::raise(&self.session);
            self.backend.login(email.trim(), password).await?
        };
        let change = self
            .session
            .login_with_profile(Some(&grant.access_token), grant.user)?;
        info!(change = ?change, "password login complete");
        self.navigator.navigate(Route::Dashboard);
        Ok(change)
    }

    /// Registers an account; the user logs in separately afterwards.
    pub async fn signup(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        if full_name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::validation("all fields are required"));
        }
        if !is_valid_email(email) {
            return Err(ClientError::validation("invalid email address"));
        }
        let request = SignupRequest {
            full_name: full_name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let created = {
            let _loading = LoadingGuard::raise(&self.session);
            self.backend.create_user(&request).await?
        };
        info!(email = %request.email, "account created");
        self.navigator.navigate(Route::Login);
        Ok(created)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String, ClientError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(ClientError::validation("invalid email address"));
        }
        let message = {
            let _loading = LoadingGuard::raise(&self.session);
            self.backend.forgot_password(email).await?
        };
        self.navigator.navigate(Route::VerifyOtp {
            email: email.to_string(),
        });
        Ok(message)
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String, ClientError> {
        let otp = otp.trim();
        if otp.len() != OTP_LENGTH || !otp.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(ClientError::validation(format!(
                "enter the complete {OTP_LENGTH}-digit code"
            )));
        }
        let message = {
            let _loading = LoadingGuard::raise(&self.session);
            self.backend.verify_otp(email.trim(), otp).await?
        };
        self.navigator.navigate(Route::ResetPassword {
            email: email.trim().to_string(),
            otp: otp.to_string(),
        });
        Ok(message)
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<String, ClientError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ClientError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if new_password != confirm {
            return Err(ClientError::validation("passwords do not match"));
        }
        let message = {
            let _loading = LoadingGuard::raise(&self.session);
            self.backend
                .reset_password(email.trim(), otp.trim(), new_password)
                .await?
        };
        self.navigator.navigate(Route::Login);
        Ok(message)
    }

    /// Follow-up profile fetch. A logout or re-login while the request is in
    /// flight wins over the late response.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        let token = self.session.bearer()?;
        let profile = self.backend.fetch_profile(&token).await?;
        if !self.session.refresh_profile(&token, profile.clone()) {
            warn!("profile response discarded; session changed while fetching");
        }
        Ok(profile)
    }

    pub fn logout(&self) {
        self.session.logout();
        self.navigator.navigate(Route::Login);
    }

    /// Listens for provider-window deliveries while a login view is active.
    pub fn listen_for_handshake(
        &self,
        inbox: HandshakeInbox,
        policy: HandshakePolicy,
    ) -> HandshakeListener {
        HandshakeListener::register(
            inbox,
            self.session.clone(),
            self.navigator.clone(),
            policy,
        )
    }

    pub fn provider_login_url(&self) -> String {
        crate::handshake::provider_login_url(self.backend.base_url())
    }
}
