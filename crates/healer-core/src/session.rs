use crate::error::{ClientError, SessionError};
use crate::model::{Session, UserProfile};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Durable home for the session token between process runs.
pub trait TokenVault: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<String>>;
    fn store(&self, token: &str) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryVault {
    token: Mutex<Option<String>>,
}

impl MemoryVault {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenVault for MemoryVault {
    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.token.lock().map(|t| t.clone()).unwrap_or_default())
    }

    fn store(&self, token: &str) -> anyhow::Result<()> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginChange {
    Updated,
    Unchanged,
}

/// Single source of truth for who is logged in.
///
/// Cloning shares the same state. Every writer goes through
/// [`SessionStore::login_with_token`] / [`SessionStore::login_with_profile`]
/// or [`SessionStore::logout`]; subscribers see one notification per
/// effective change.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Session>>,
    vault: Option<Arc<dyn TokenVault>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self {
            state: Arc::new(tx),
            vault: None,
        }
    }

    /// Restores a previously stored token, if any. A vault read failure
    /// starts logged out.
    pub fn with_vault(vault: Arc<dyn TokenVault>) -> Self {
        let restored = match vault.load() {
            Ok(Some(token)) if !token.trim().is_empty() => Some(token),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "failed to read stored session token");
                None
            }
        };
        let session = match restored {
            Some(token) => Session {
                user: Some(profile_from_claims(&token)),
                token: Some(token),
                loading: false,
            },
            None => Session::default(),
        };
        let (tx, _rx) = watch::channel(session);
        Self {
            state: Arc::new(tx),
            vault: Some(vault),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Token for an authenticated call. Absence surfaces the same way a
    /// backend 401 does.
    pub fn bearer(&self) -> Result<String, ClientError> {
        self.token().ok_or(ClientError::SessionExpired)
    }

    pub fn login_with_token(&self, token: Option<&str>) -> Result<LoginChange, SessionError> {
        self.login_with_profile(token, None)
    }

    /// Stores `token` together with `profile` (or the profile decoded from
    /// the token's claims). Re-delivering the stored token is a no-op.
    pub fn login_with_profile(
        &self,
        token: Option<&str>,
        profile: Option<UserProfile>,
    ) -> Result<LoginChange, SessionError> {
        let token = match token {
            Some(value) if !value.trim().is_empty() => value,
            _ => return Err(SessionError::InvalidToken),
        };
        let user = profile.unwrap_or_else(|| profile_from_claims(token));
        let modified = self.state.send_if_modified(|session| {
            if session.token.as_deref() == Some(token) {
                return false;
            }
            session.token = Some(token.to_string());
            session.user = Some(user);
            session.loading = false;
            true
        });
        if !modified {
            debug!("duplicate token delivery ignored");
            return Ok(LoginChange::Unchanged);
        }
        info!(token_len = token.len(), "session established");
        if let Some(vault) = &self.vault
            && let Err(err) = vault.store(token)
        {
            warn!(error = %err, "failed to persist session token");
        }
        Ok(LoginChange::Updated)
    }

    /// Replaces the profile only while `token` is still the active one.
    pub fn refresh_profile(&self, token: &str, profile: UserProfile) -> bool {
        self.state.send_if_modified(|session| {
            if session.token.as_deref() != Some(token) {
                return false;
            }
            if session.user.as_ref() == Some(&profile) {
                return false;
            }
            session.user = Some(profile);
            true
        })
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|session| {
            if session.loading == loading {
                return false;
            }
            session.loading = loading;
            true
        });
    }

    /// Clears token and user. Requests already in flight keep the token they
    /// captured and fail at the backend.
    pub fn logout(&self) {
        let modified = self.state.send_if_modified(|session| {
            if session.token.is_none() && session.user.is_none() {
                return false;
            }
            session.token = None;
            session.user = None;
            true
        });
        if modified {
            info!("session cleared");
        }
        if let Some(vault) = &self.vault
            && let Err(err) = vault.clear()
        {
            warn!(error = %err, "failed to clear stored session token");
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
}

/// Reads the unverified JWT payload. Opaque tokens yield an empty profile.
pub fn profile_from_claims(token: &str) -> UserProfile {
    let claims = token
        .split('.')
        .nth(1)
        .and_then(|payload| URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok())
        .and_then(|bytes| serde_json::from_slice::<TokenClaims>(&bytes).ok())
        .unwrap_or_default();
    UserProfile {
        id: claims.id,
        email: claims.sub,
        full_name: claims.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn rejects_missing_or_empty_token() {
        let store = SessionStore::new();
        let before = store.snapshot();
        assert_eq!(store.login_with_token(None), Err(SessionError::InvalidToken));
        assert_eq!(
            store.login_with_token(Some("")),
            Err(SessionError::InvalidToken)
        );
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn duplicate_delivery_changes_state_once() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        assert_eq!(
            store.login_with_token(Some("tok-1")).unwrap(),
            LoginChange::Updated
        );
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert_eq!(
            store.login_with_token(Some("tok-1")).unwrap(),
            LoginChange::Unchanged
        );
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn different_token_overwrites() {
        let store = SessionStore::new();
        store.login_with_token(Some("first")).unwrap();
        store.set_loading(true);
        store.login_with_token(Some("second")).unwrap();
        let session = store.snapshot();
        assert_eq!(session.token.as_deref(), Some("second"));
        assert!(session.user.is_some());
        assert!(!session.loading);
    }

    #[test]
    fn logout_clears_token_and_user() {
        let store = SessionStore::new();
        store.login_with_token(Some("tok")).unwrap();
        store.logout();
        let session = store.snapshot();
        assert!(session.token.is_none());
        assert!(session.user.is_none());
        assert_eq!(store.bearer(), Err(ClientError::SessionExpired));
    }

    #[test]
    fn claims_populate_profile() {
        let token = jwt_with(r#"{"sub":"ada@example.com","id":7,"exp":1}"#);
        let store = SessionStore::new();
        store.login_with_token(Some(&token)).unwrap();
        let user = store.user().unwrap();
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.id, Some(7));
        assert_eq!(profile_from_claims("opaque"), UserProfile::default());
    }

    #[test]
    fn refresh_profile_requires_matching_token() {
        let store = SessionStore::new();
        store.login_with_token(Some("tok")).unwrap();
        let profile = UserProfile {
            id: Some(1),
            email: Some("a@b.co".to_string()),
            full_name: Some("Ada".to_string()),
        };
        assert!(!store.refresh_profile("stale", profile.clone()));
        assert!(store.refresh_profile("tok", profile.clone()));
        assert_eq!(store.user(), Some(profile));
    }

    #[test]
    fn vault_round_trip() {
        let vault = Arc::new(MemoryVault::with_token("stored"));
        let store = SessionStore::with_vault(vault.clone());
        assert_eq!(store.token().as_deref(), Some("stored"));
        store.login_with_token(Some("fresh")).unwrap();
        assert_eq!(vault.load().unwrap().as_deref(), Some("fresh"));
        store.logout();
        assert_eq!(vault.load().unwrap(), None);
    }
}
