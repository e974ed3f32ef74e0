#![expect(
    clippy::module_name_repetitions,
    reason = "Client types expose their domain in the name for clarity"
)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use super::hooks::{EmbedEvent, Hooks, LaunchParams};
use super::types::{ChatRecord, DISCONNECT_NOTICE};
use crate::error::Error;
use crate::ws::config::Config;
use crate::ws::frame::Frame;
use crate::ws::heartbeat::Heartbeat;
use crate::ws::reconnect::ReconnectGuard;
use crate::ws::session::{ReadyState, Session, SessionEvent};
use crate::{Result, TOKEN_PARAM};

/// Consumer of decoded payload frames, invoked once per frame in arrival
/// order.
pub type Consumer = Arc<dyn Fn(Value) + Send + Sync>;

const ERROR_DIALOG_TITLE: &str = "Error";
const NOTICE_DIALOG_TITLE: &str = "Notice";
const MISSING_TOKEN_MESSAGE: &str = "a token query parameter is required";

/// Client-side manager for one persistent chat channel.
///
/// Owns the single live session, the heartbeat that polices it, and the
/// guard that serializes reconnect attempts. All connection state lives on
/// the instance; independent managers never share anything.
///
/// Cloning is cheap and clones address the same channel.
///
/// # Example
///
/// ```rust, no_run
/// use chat_client_sdk::chat::ChatClient;
/// use chat_client_sdk::chat::hooks::{Hooks, QueryParams};
/// use chat_client_sdk::ws::config::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let params = QueryParams::from_query("token=abc123");
///     let client = ChatClient::new(Config::default(), params, Hooks::default());
///
///     client
///         .connect("wss://chat.example.com/channel", |payload| {
///             println!("message: {payload}");
///         })
///         .await?;
///
///     client.send(&serde_json::json!({ "content": "hello" }))?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    params: Arc<dyn LaunchParams>,
    hooks: Hooks,
    heartbeat: Arc<Heartbeat>,
    guard: ReconnectGuard,
    link: Mutex<Link>,
}

/// Mutable connection state, owned exclusively by the manager.
#[derive(Default)]
struct Link {
    /// The one live session; `None` means no active connection
    session: Option<Session>,
    /// Base endpoint of the last connect call, reused by reconnects
    target: Option<Url>,
    /// Active consumer callback, replaced on every connect call
    consumer: Option<Consumer>,
    /// Identifies the current session; trailing events from a replaced
    /// session carry a stale epoch and are dropped
    epoch: u64,
}

impl ChatClient {
    /// Create a manager with no active connection.
    pub fn new<P: LaunchParams + 'static>(config: Config, params: P, hooks: Hooks) -> Self {
        let heartbeat = Arc::new(Heartbeat::new(config.heartbeat_interval));
        let guard = ReconnectGuard::new(config.reconnect.delay);

        Self {
            inner: Arc::new(ClientInner {
                config,
                params: Arc::new(params),
                hooks,
                heartbeat,
                guard,
                link: Mutex::new(Link::default()),
            }),
        }
    }

    /// Open the channel.
    ///
    /// Validates that the launch parameters carry a token, appends it to
    /// `endpoint` as a query parameter and dials the result. `on_message`
    /// becomes the active consumer for decoded payload frames; both the
    /// endpoint and the consumer are remembered for later reconnects. Any
    /// previous session is closed and replaced.
    ///
    /// # Errors
    ///
    /// [`Kind::Credential`](crate::error::Kind) when no token is present (an
    /// error dialog is shown and no connection is attempted),
    /// [`Kind::Validation`](crate::error::Kind) for a non-WebSocket endpoint,
    /// [`Kind::WebSocket`](crate::error::Kind) when the dial fails.
    pub async fn connect<F>(&self, endpoint: &str, on_message: F) -> Result<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let target = parse_endpoint(endpoint)?;
        let consumer: Consumer = Arc::new(on_message);

        {
            let mut link = self.inner.lock_link();
            link.target = Some(target.clone());
            link.consumer = Some(Arc::clone(&consumer));
        }

        ClientInner::establish(&self.inner, target, consumer).await
    }

    /// Serialize `payload` to JSON text and send it over the live session.
    ///
    /// With no live session the payload is dropped silently: sends are
    /// fire-and-forget by contract, so callers racing a disconnect do not
    /// need a separate error path.
    ///
    /// # Errors
    ///
    /// Only serialization failures surface; a missing session does not.
    pub fn send<P: Serialize>(&self, payload: &P) -> Result<()> {
        let text = serde_json::to_string(payload)?;
        self.send_text(text);
        Ok(())
    }

    /// Send preformatted text over the live session, dropping it silently
    /// when no session exists.
    pub fn send_text<S: Into<String>>(&self, text: S) {
        let link = self.inner.lock_link();
        match &link.session {
            Some(session) => session.send_text(text.into()),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("no live session, dropping outbound frame");
            }
        }
    }

    /// Tear the channel down.
    ///
    /// Closes the live session when one exists, clears both heartbeat timers
    /// and releases the reconnect guard unconditionally, so a later manual
    /// [`connect`](Self::connect) is never refused. Idempotent: calling it
    /// with no active session does nothing.
    pub fn close(&self) {
        let session = self.inner.lock_link().session.take();
        if let Some(session) = session {
            session.close();
        }
        self.inner.heartbeat.clear();
        self.inner.guard.release();
    }

    /// Schedule a reconnect to the last-used endpoint after the configured
    /// fixed delay.
    ///
    /// At most one reconnect may be pending: returns `false` when one is
    /// already scheduled. The guard is released right before the attempt
    /// runs, so a failing attempt may itself schedule the next one. The
    /// attempt revalidates the token and reuses the stored endpoint and
    /// consumer callback.
    ///
    /// Nothing calls this automatically unless
    /// [`ReconnectConfig::on_close`](crate::ws::config::ReconnectConfig) is
    /// enabled; a disconnect otherwise surfaces to the user and waits for a
    /// manual decision.
    pub fn request_reconnect(&self) -> bool {
        ClientInner::schedule_reconnect(&self.inner)
    }

    /// Ready state of the underlying transport, [`ReadyState::Closed`] when
    /// no session exists.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.inner
            .lock_link()
            .session
            .as_ref()
            .map_or(ReadyState::Closed, Session::ready_state)
    }
}

impl ClientInner {
    fn lock_link(&self) -> MutexGuard<'_, Link> {
        // We can recover from a poisoned lock because Link has no
        // inconsistent intermediate state.
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dial the target and install the resulting session as current.
    async fn establish(inner: &Arc<Self>, target: Url, consumer: Consumer) -> Result<()> {
        let Some(token) = inner.params.token() else {
            inner
                .hooks
                .dialogs
                .error(ERROR_DIALOG_TITLE, MISSING_TOKEN_MESSAGE);
            return Err(Error::missing_credential(TOKEN_PARAM));
        };

        let target = with_token(&target, &token);
        let (session, events) = Session::open(&target).await?;

        let epoch = {
            let mut link = inner.lock_link();
            if let Some(previous) = link.session.replace(session.clone()) {
                previous.close();
            }
            link.consumer = Some(consumer);
            link.epoch = link.epoch.wrapping_add(1);
            link.epoch
        };

        inner.heartbeat.arm(session.clone());

        let weak = Arc::downgrade(inner);
        tokio::spawn(Self::route(weak, epoch, session, events));

        Ok(())
    }

    /// Per-session event loop: forwards payloads, logs errors, and runs the
    /// close path exactly once when the transport goes down.
    async fn route(
        inner: Weak<Self>,
        epoch: u64,
        session: Session,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else { return };
            match event {
                SessionEvent::Frame(text) => inner.on_frame(epoch, &session, &text),
                SessionEvent::Error(e) => {
                    // Logged only: the transport emits a close event for
                    // fatal errors, which drives the actual teardown.
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "transport error");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                }
                SessionEvent::Closed => {
                    Self::on_close(&inner, epoch);
                    return;
                }
            }
        }
    }

    fn on_frame(&self, epoch: u64, session: &Session, text: &str) {
        let consumer = {
            let link = self.lock_link();
            if link.epoch != epoch {
                return;
            }
            link.consumer.clone()
        };

        match Frame::parse(text) {
            Frame::Data(payload) => {
                if let Some(consumer) = &consumer {
                    consumer(payload);
                }
            }
            Frame::Ack => {
                #[cfg(feature = "tracing")]
                tracing::debug!("channel acknowledged by server");
            }
            Frame::Ping | Frame::Pong => {
                // Liveness traffic, nothing to forward.
            }
        }

        // Any inbound traffic proves the peer alive.
        self.heartbeat.reset(session.clone());
    }

    /// Close path: detach the session, stop the heartbeat and fan the
    /// disconnect out to the collaborators.
    fn on_close(self: &Arc<Self>, epoch: u64) {
        {
            let mut link = self.lock_link();
            if link.epoch != epoch {
                // A newer session took over; this close belongs to its
                // replaced predecessor.
                return;
            }
            link.session = None;
        }
        self.heartbeat.clear();

        #[cfg(feature = "tracing")]
        tracing::info!("chat channel closed");

        let hooks = &self.hooks;
        hooks.history.remove_last_chat();
        hooks.history.append_message(ChatRecord::disconnect_notice());
        hooks.embed.notify(EmbedEvent::Closed);
        hooks.dialogs.warning(NOTICE_DIALOG_TITLE, DISCONNECT_NOTICE);
        hooks.ui.set_input_disabled(true);

        if self.config.reconnect.on_close {
            _ = Self::schedule_reconnect(self);
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) -> bool {
        let weak = Arc::downgrade(self);
        self.guard.schedule(move || Self::attempt_reconnect(weak))
    }

    /// Redial with the stored endpoint and consumer once the guard delay has
    /// elapsed.
    async fn attempt_reconnect(weak: Weak<Self>) {
        let Some(inner) = weak.upgrade() else { return };

        let (target, consumer) = {
            let link = inner.lock_link();
            (link.target.clone(), link.consumer.clone())
        };
        let (Some(target), Some(consumer)) = (target, consumer) else {
            // Nothing to redial: no connect call ever stored a target.
            return;
        };

        if let Err(e) = Self::establish(&inner, target, consumer).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "reconnect attempt failed");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;

            if inner.config.reconnect.on_close {
                _ = Self::schedule_reconnect(&inner);
            }
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(session) = self.lock_link().session.take() {
            session.close();
        }
        self.heartbeat.clear();
    }
}

/// Parse and validate a channel endpoint.
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::validation(format!(
            "endpoint scheme must be ws or wss, got {other}"
        ))),
    }
}

/// Append the channel token to the target as a query parameter.
fn with_token(base: &Url, token: &SecretString) -> Url {
    let mut target = base.clone();
    target
        .query_pairs_mut()
        .append_pair(TOKEN_PARAM, token.expose_secret());
    target
}
