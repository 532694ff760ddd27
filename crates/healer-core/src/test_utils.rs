use crate::backend::{BackendFuture, HealerBackend, LoginGrant, SignupRequest};
use crate::error::ClientError;
use crate::model::{RunConfig, RunReport, UserProfile};
use std::sync::Mutex;

/// Scripted backend that records every call it receives.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<String>>,
    pub valid_token: Mutex<Option<String>>,
    pub fail_with: Mutex<Option<ClientError>>,
    pub report: Mutex<RunReport>,
}

impl FakeBackend {
    pub fn accepting(token: &str) -> Self {
        let backend = Self::default();
        *backend.valid_token.lock().unwrap() = Some(token.to_string());
        backend
    }

    pub fn failing(err: ClientError) -> Self {
        let backend = Self::default();
        *backend.fail_with.lock().unwrap() = Some(err);
        backend
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_token(&self, token: &str) -> Result<(), ClientError> {
        match self.valid_token.lock().unwrap().as_deref() {
            Some(valid) if valid == token => Ok(()),
            _ => Err(ClientError::SessionExpired),
        }
    }
}

impl HealerBackend for FakeBackend {
    fn base_url(&self) -> &str {
        "http://backend.test"
    }

    fn login<'a>(
        &'a self,
        username: &'a str,
        _password: &'a str,
    ) -> BackendFuture<'a, LoginGrant> {
        Box::pin(async move {
            self.record("login")?;
            Ok(LoginGrant {
                access_token: self
                    .valid_token
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| "token".to_string()),
                user: Some(UserProfile {
                    id: Some(1),
                    email: Some(username.to_string()),
                    full_name: None,
                }),
            })
        })
    }

    fn fetch_profile<'a>(&'a self, token: &'a str) -> BackendFuture<'a, UserProfile> {
        Box::pin(async move {
            self.record("fetch_profile")?;
            self.check_token(token)?;
            Ok(UserProfile {
                id: Some(1),
                email: Some("ada@example.com".to_string()),
                full_name: Some("Ada Lovelace".to_string()),
            })
        })
    }

    fn run_agent<'a>(
        &'a self,
        token: &'a str,
        _config: &'a RunConfig,
    ) -> BackendFuture<'a, RunReport> {
        Box::pin(async move {
            self.record("run_agent")?;
            self.check_token(token)?;
            Ok(self.report.lock().unwrap().clone())
        })
    }

    fn create_user<'a>(&'a self, request: &'a SignupRequest) -> BackendFuture<'a, UserProfile> {
        Box::pin(async move {
            self.record("create_user")?;
            Ok(UserProfile {
                id: Some(2),
                email: Some(request.email.clone()),
                full_name: Some(request.full_name.clone()),
            })
        })
    }

    fn forgot_password<'a>(&'a self, _email: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.record("forgot_password")?;
            Ok("OTP sent successfully".to_string())
        })
    }

    fn verify_otp<'a>(&'a self, _email: &'a str, _otp: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.record("verify_otp")?;
            Ok("OTP verified".to_string())
        })
    }

    fn reset_password<'a>(
        &'a self,
        _email: &'a str,
        _otp: &'a str,
        _new_password: &'a str,
    ) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.record("reset_password")?;
            Ok("Password reset successful".to_string())
        })
    }
}
