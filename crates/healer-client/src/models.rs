use healer_core::model::{RunReport, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunAgentResponse {
    pub(crate) data: RunReport,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub(crate) message: Option<String>,
}

/// Error body shape used by the backend. `detail` is a string for handled
/// errors and a list for request validation failures.
#[derive(Debug, Deserialize)]
pub(crate) struct DetailBody {
    #[serde(default)]
    detail: Option<Value>,
}

impl DetailBody {
    pub(crate) fn text(&self) -> Option<String> {
        match &self.detail {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateUserRequest<'a> {
    pub(crate) full_name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmailRequest<'a> {
    pub(crate) email: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyOtpRequest<'a> {
    pub(crate) email: &'a str,
    pub(crate) otp: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResetPasswordRequest<'a> {
    pub(crate) email: &'a str,
    pub(crate) otp: &'a str,
    pub(crate) new_password: &'a str,
}
