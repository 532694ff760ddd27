use crate::error::ClientError;
use crate::model::{RunConfig, RunReport, UserProfile};
use std::future::Future;
use std::pin::Pin;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub access_token: String,
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// The backend HTTP surface consumed by the auth and launch flows.
///
/// Each call is attempted once; failures are already classified into
/// [`ClientError`].
pub trait HealerBackend: Send + Sync {
    fn base_url(&self) -> &str;

    fn login<'a>(&'a self, username: &'a str, password: &'a str)
    -> BackendFuture<'a, LoginGrant>;

    fn fetch_profile<'a>(&'a self, token: &'a str) -> BackendFuture<'a, UserProfile>;

    fn run_agent<'a>(&'a self, token: &'a str, config: &'a RunConfig)
    -> BackendFuture<'a, RunReport>;

    fn create_user<'a>(&'a self, request: &'a SignupRequest) -> BackendFuture<'a, UserProfile>;

    fn forgot_password<'a>(&'a self, email: &'a str) -> BackendFuture<'a, String>;

    fn verify_otp<'a>(&'a self, email: &'a str, otp: &'a str) -> BackendFuture<'a, String>;

    fn reset_password<'a>(
        &'a self,
        email: &'a str,
        otp: &'a str,
        new_password: &'a str,
    ) -> BackendFuture<'a, String>;
}
