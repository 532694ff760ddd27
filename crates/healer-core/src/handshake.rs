//! Cross-context token delivery after an external identity-provider login.
//!
//! The provider window posts `{ "token": "..." }` (optionally with a `user`
//! object) back to the opener. Here the opener side is a listener task fed
//! through an async inbox; everything that is not a well-formed token message
//! from the allowed origin is dropped without surfacing an error.

use crate::model::UserProfile;
use crate::navigation::{Navigator, Route};
use crate::session::{LoginChange, SessionStore};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

pub fn provider_login_url(api_base_url: &str) -> String {
    format!(
        "{}/api/auth/login/google",
        api_base_url.trim_end_matches('/')
    )
}

/// Serialized tuple origin of a URL (`scheme://host[:port]`, default port
/// elided). Opaque origins and unparseable input yield `None`.
pub fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url.trim()).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

#[derive(Debug, Clone)]
pub struct HandshakeMessage {
    pub origin: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenDelivery {
    pub token: String,
    pub user: Option<UserProfile>,
}

/// Validates one inbound message. `allowed_origin`, when set, must match the
/// sender's origin exactly (after normalization).
pub fn accept_message(
    message: &HandshakeMessage,
    allowed_origin: Option<&str>,
) -> Option<TokenDelivery> {
    if let Some(allowed) = allowed_origin {
        let sender = message.origin.as_deref().and_then(origin_of);
        if sender.as_deref() != origin_of(allowed).as_deref() {
            return None;
        }
    }
    let token = message.payload.get("token")?.as_str()?;
    if token.trim().is_empty() {
        return None;
    }
    let user = message
        .payload
        .get("user")
        .and_then(|user| serde_json::from_value::<UserProfile>(user.clone()).ok());
    Some(TokenDelivery {
        token: token.to_string(),
        user,
    })
}

pub struct HandshakeChannel;

impl HandshakeChannel {
    pub fn open() -> (HandshakeSender, HandshakeInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (HandshakeSender { tx }, HandshakeInbox { rx })
    }
}

/// The provider window's side of the channel.
#[derive(Clone)]
pub struct HandshakeSender {
    tx: mpsc::UnboundedSender<HandshakeMessage>,
}

impl HandshakeSender {
    /// Returns `false` once the listener is gone.
    pub fn post(&self, origin: Option<&str>, payload: Value) -> bool {
        self.tx
            .send(HandshakeMessage {
                origin: origin.map(str::to_string),
                payload,
            })
            .is_ok()
    }
}

pub struct HandshakeInbox {
    rx: mpsc::UnboundedReceiver<HandshakeMessage>,
}

#[derive(Debug, Clone, Default)]
pub struct HandshakePolicy {
    pub allowed_origin: Option<String>,
    /// Give up if no valid token arrives in time. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Every sender went away.
    Closed,
    TimedOut,
    Deregistered,
}

/// Registered listener. Dropping it deregisters.
pub struct HandshakeListener {
    task: Option<JoinHandle<HandshakeOutcome>>,
    stop: Option<oneshot::Sender<()>>,
}

impl HandshakeListener {
    pub fn register(
        inbox: HandshakeInbox,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
        policy: HandshakePolicy,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(listen(inbox, session, navigator, policy, stop_rx));
        debug!("handshake listener registered");
        Self {
            task: Some(task),
            stop: Some(stop_tx),
        }
    }

    pub fn deregister(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("handshake listener deregistered");
        }
    }

    /// Waits for the listener to end on its own (senders closed or timeout).
    pub async fn finished(mut self) -> HandshakeOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(HandshakeOutcome::Deregistered),
            None => HandshakeOutcome::Deregistered,
        }
    }
}

impl Drop for HandshakeListener {
    fn drop(&mut self) {
        self.deregister();
    }
}

async fn listen(
    mut inbox: HandshakeInbox,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    policy: HandshakePolicy,
    mut stop: oneshot::Receiver<()>,
) -> HandshakeOutcome {
    let deadline = policy.timeout.map(|timeout| Instant::now() + timeout);
    let mut authenticated = false;
    loop {
        let pending_deadline = if authenticated { None } else { deadline };
        let expiry = async move {
            match pending_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = &mut stop => return HandshakeOutcome::Deregistered,
            _ = expiry => {
                warn!("no token delivered before handshake timeout");
                return HandshakeOutcome::TimedOut;
            }
            message = inbox.rx.recv() => {
                let Some(message) = message else {
                    debug!("handshake senders closed");
                    return HandshakeOutcome::Closed;
                };
                let Some(delivery) = accept_message(&message, policy.allowed_origin.as_deref()) else {
                    debug!(origin = ?message.origin, "dropping malformed handshake message");
                    continue;
                };
                match session.login_with_profile(Some(&delivery.token), delivery.user) {
                    Ok(LoginChange::Updated) => {
                        authenticated = true;
                        info!("handshake delivered a token");
                        navigator.navigate(Route::Dashboard);
                    }
                    Ok(LoginChange::Unchanged) => {
                        authenticated = true;
                        debug!("duplicate handshake delivery");
                    }
                    Err(err) => debug!(error = %err, "handshake token rejected"),
                }
            }
        }
    }
}
