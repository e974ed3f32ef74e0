#![expect(
    clippy::module_name_repetitions,
    reason = "Session types expose their domain in the name for clarity"
)]

use std::sync::Arc;

use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::WsError;
use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Ready state of a session's underlying transport.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Handshake in flight
    Connecting,
    /// Transport established, frames flow both ways
    Open,
    /// Shutdown requested, transport going down
    Closing,
    /// Transport is down
    Closed,
}

impl ReadyState {
    /// Check if the transport is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Events a session reports to its owner, in arrival order.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// Inbound text frame
    Frame(String),
    /// Transport-level error; fatal errors are followed by `Closed`
    Error(WsError),
    /// The transport has shut down; always the final event
    Closed,
}

/// One physical socket connection.
///
/// A session is created open and replaced, never reconnected in place. The
/// manager owns exactly one at a time; clones share the same transport.
#[derive(Clone)]
pub(crate) struct Session {
    outbound: mpsc::UnboundedSender<Message>,
    state: Arc<watch::Sender<ReadyState>>,
    shutdown: CancellationToken,
}

impl Session {
    /// Dial `target` and spawn the pump task that surfaces transport events.
    pub(crate) async fn open(target: &Url) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        let (state, _) = watch::channel(ReadyState::Connecting);
        let state = Arc::new(state);

        let (stream, _) = connect_async(target.as_str())
            .await
            .map_err(WsError::Connection)?;
        state.send_replace(ReadyState::Open);

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        tokio::spawn(pump(
            stream,
            outbound_rx,
            events_tx,
            Arc::clone(&state),
            shutdown.clone(),
        ));

        Ok((
            Self {
                outbound,
                state,
                shutdown,
            },
            events_rx,
        ))
    }

    pub(crate) fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    /// Queue a text frame. Frames queued after shutdown are dropped.
    pub(crate) fn send_text(&self, text: String) {
        drop(self.outbound.send(Message::Text(text.into())));
    }

    /// Shut the transport down; the pump emits `Closed` once it is gone.
    ///
    /// A close frame is sent on a best-effort basis only, so this also works
    /// as the forced close used by heartbeat expiry, where the peer has
    /// stopped responding and a close handshake would stall.
    pub(crate) fn close(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, ReadyState::Connecting | ReadyState::Open) {
                *state = ReadyState::Closing;
                true
            } else {
                false
            }
        });
        self.shutdown.cancel();
    }
}

/// Per-session event loop: drains the outbound queue into the sink and
/// surfaces inbound traffic until the transport goes down.
async fn pump(
    stream: WsStream,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: Arc<watch::Sender<ReadyState>>,
    shutdown: CancellationToken,
) {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                // Best-effort close frame; the peer may already be gone.
                drop(write.send(Message::Close(None)).await);
                break;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if events
                            .send(SessionEvent::Frame(text.as_str().to_owned()))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary frames and transport-level ping/pong are not
                        // part of the protocol.
                    }
                    Some(Err(e)) => {
                        drop(events.send(SessionEvent::Error(WsError::Connection(e))));
                        break;
                    }
                }
            }

            out = outbound_rx.recv() => {
                match out {
                    Some(msg) => {
                        if let Err(e) = write.send(msg).await {
                            drop(events.send(SessionEvent::Error(WsError::Connection(e))));
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    state.send_replace(ReadyState::Closed);
    drop(events.send(SessionEvent::Closed));
}
