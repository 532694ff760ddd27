use crate::models::DetailBody;
use healer_core::error::ClientError;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// How a request authenticates. A 401 only means an expired session when a
/// bearer token was sent; the login endpoint uses 401 for bad credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    Anonymous,
    Bearer,
}

/// Sends the request exactly once and classifies any failure.
pub(crate) async fn send_once(
    request: RequestBuilder,
    base_url: &str,
    auth: Auth,
) -> Result<Response, ClientError> {
    let response = request
        .send()
        .await
        .map_err(|err| transport_error(&err, base_url))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    debug!(status = status.as_u16(), "backend rejected request");
    if status == StatusCode::UNAUTHORIZED && auth == Auth::Bearer {
        return Err(ClientError::SessionExpired);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(rejected(status, &body))
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = response
        .bytes()
        .await
        .map_err(|err| ClientError::Decode(err.to_string()))?;
    serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))
}

pub(crate) fn rejected(status: StatusCode, body: &[u8]) -> ClientError {
    let detail = serde_json::from_slice::<DetailBody>(body)
        .ok()
        .and_then(|body| body.text())
        .unwrap_or_else(|| format!("Error: {}", status.as_u16()));
    ClientError::ServerRejected {
        status: status.as_u16(),
        detail,
    }
}

fn transport_error(err: &reqwest::Error, base_url: &str) -> ClientError {
    if is_network_error(err) {
        ClientError::NetworkUnreachable {
            base_url: base_url.to_string(),
        }
    } else {
        ClientError::Decode(err.to_string())
    }
}

pub(crate) fn is_network_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}
