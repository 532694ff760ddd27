use crate::http::{Auth, decode, send_once};
use crate::models::{
    CreateUserRequest, EmailRequest, LoginResponse, MessageResponse, ResetPasswordRequest,
    RunAgentResponse, VerifyOtpRequest,
};
use anyhow::Context;
use healer_core::backend::{BackendFuture, HealerBackend, LoginGrant, SignupRequest};
use healer_core::error::ClientError;
use healer_core::model::{RunConfig, RunReport, UserProfile};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::{debug, info};

/// `reqwest` client for the healer backend API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("repo-healer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_message<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<String, ClientError> {
        let request = self
            .client
            .post(self.url(path))
            .header(ACCEPT, "application/json")
            .json(body);
        let response = send_once(request, &self.base_url, Auth::Anonymous).await?;
        let message: MessageResponse = decode(response).await?;
        Ok(message.message.unwrap_or_else(|| fallback.to_string()))
    }
}

impl HealerBackend for HttpBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn login<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, LoginGrant> {
        Box::pin(async move {
            let request = self
                .client
                .post(self.url("/api/auth/login"))
                .form(&[("username", username), ("password", password)]);
            let response = send_once(request, &self.base_url, Auth::Anonymous).await?;
            let body: LoginResponse = decode(response).await?;
            if body.access_token.trim().is_empty() {
                return Err(ClientError::Decode("empty access token".to_string()));
            }
            debug!(token_len = body.access_token.len(), "login accepted");
            Ok(LoginGrant {
                access_token: body.access_token,
                user: body.user,
            })
        })
    }

    fn fetch_profile<'a>(&'a self, token: &'a str) -> BackendFuture<'a, UserProfile> {
        Box::pin(async move {
            let request = self.client.get(self.url("/api/users/me")).bearer_auth(token);
            let response = send_once(request, &self.base_url, Auth::Bearer).await?;
            decode(response).await
        })
    }

    fn run_agent<'a>(
        &'a self,
        token: &'a str,
        config: &'a RunConfig,
    ) -> BackendFuture<'a, RunReport> {
        Box::pin(async move {
            let request = self
                .client
                .post(self.url("/api/agent/run-agent"))
                .header(ACCEPT, "application/json")
                .bearer_auth(token)
                .json(config);
            let response = send_once(request, &self.base_url, Auth::Bearer).await?;
            let body: RunAgentResponse = decode(response).await?;
            info!(
                iterations = body.data.iterations,
                total_fixes = body.data.total_fixes,
                "run-agent completed"
            );
            Ok(body.data)
        })
    }

    fn create_user<'a>(&'a self, request: &'a SignupRequest) -> BackendFuture<'a, UserProfile> {
        Box::pin(async move {
            let body = CreateUserRequest {
                full_name: &request.full_name,
                email: &request.email,
                password: &request.password,
            };
            let request = self.client.post(self.url("/api/users/")).json(&body);
            let response = send_once(request, &self.base_url, Auth::Anonymous).await?;
            decode(response).await
        })
    }

    fn forgot_password<'a>(&'a self, email: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.post_message(
                "/api/auth/forgot-password",
                &EmailRequest { email },
                "OTP sent",
            )
            .await
        })
    }

    fn verify_otp<'a>(&'a self, email: &'a str, otp: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.post_message(
                "/api/auth/verify-otp",
                &VerifyOtpRequest { email, otp },
                "OTP verified",
            )
            .await
        })
    }

    fn reset_password<'a>(
        &'a self,
        email: &'a str,
        otp: &'a str,
        new_password: &'a str,
    ) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.post_message(
                "/api/auth/reset-password",
                &ResetPasswordRequest {
                    email,
                    otp,
                    new_password,
                },
                "Password reset successful",
            )
            .await
        })
    }
}
