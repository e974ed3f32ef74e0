#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Not every helper is used by every test binary"
)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_client_sdk::chat::hooks::{
    ChatHistory, Dialogs, EmbedEvent, EmbedNotifier, Hooks, UiState,
};
use chat_client_sdk::chat::types::{ChatRecord, Role};
use futures_util::{SinkExt as _, StreamExt as _};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Every collaborator call observed by a test, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookCall {
    RemoveLastChat,
    Append {
        role: Role,
        content: String,
        error: bool,
    },
    InputDisabled(bool),
    Embed(EmbedEvent),
    DialogError {
        title: String,
        message: String,
    },
    DialogWarning {
        title: String,
        message: String,
    },
}

/// Records every collaborator call for later assertions.
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<HookCall>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, HookCall::DialogWarning { .. }))
            .count()
    }

    fn push(&self, call: HookCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ChatHistory for Recorder {
    fn remove_last_chat(&self) {
        self.push(HookCall::RemoveLastChat);
    }

    fn append_message(&self, record: ChatRecord) {
        self.push(HookCall::Append {
            role: record.message.role,
            content: record.message.content,
            error: record.error.is_some(),
        });
    }
}

impl UiState for Recorder {
    fn set_input_disabled(&self, disabled: bool) {
        self.push(HookCall::InputDisabled(disabled));
    }
}

impl EmbedNotifier for Recorder {
    fn notify(&self, event: EmbedEvent) {
        self.push(HookCall::Embed(event));
    }
}

impl Dialogs for Recorder {
    fn error(&self, title: &str, message: &str) {
        self.push(HookCall::DialogError {
            title: title.to_owned(),
            message: message.to_owned(),
        });
    }

    fn warning(&self, title: &str, message: &str) {
        self.push(HookCall::DialogWarning {
            title: title.to_owned(),
            message: message.to_owned(),
        });
    }
}

/// A recorder wired into every collaborator seam.
pub fn recording_hooks() -> (Arc<Recorder>, Hooks) {
    let recorder = Arc::new(Recorder::default());
    let history: Arc<dyn ChatHistory> = recorder.clone();
    let ui: Arc<dyn UiState> = recorder.clone();
    let embed: Arc<dyn EmbedNotifier> = recorder.clone();
    let dialogs: Arc<dyn Dialogs> = recorder.clone();
    let hooks = Hooks::builder()
        .history(history)
        .ui(ui)
        .embed(embed)
        .dialogs(dialogs)
        .build();
    (recorder, hooks)
}

/// Poll `condition` until it holds or `deadline` elapses.
pub async fn wait_for<F: Fn() -> bool>(deadline: Duration, condition: F) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Mock chat WebSocket server.
pub struct MockChatServer {
    addr: SocketAddr,
    /// Broadcasts text frames to ALL connected clients
    message_tx: broadcast::Sender<String>,
    /// Frames received from clients, heartbeat pings included
    inbound_rx: mpsc::UnboundedReceiver<String>,
    /// Request paths (with query) of accepted WebSocket handshakes
    path_rx: mpsc::UnboundedReceiver<String>,
    auto_pong: Arc<AtomicBool>,
    hangup: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
}

impl MockChatServer {
    /// Start a mock server on a random port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (message_tx, _) = broadcast::channel::<String>(100);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let (path_tx, path_rx) = mpsc::unbounded_channel::<String>();
        let auto_pong = Arc::new(AtomicBool::new(false));
        let hangup = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(AtomicUsize::new(0));

        let broadcast_tx = message_tx.clone();
        let pong_flag = Arc::clone(&auto_pong);
        let hangup_flag = Arc::clone(&hangup);
        let counter = Arc::clone(&connections);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                // Subscribe before the handshake completes so frames sent the
                // moment the client considers itself connected are not lost.
                let mut msg_rx = broadcast_tx.subscribe();

                let path_tx = path_tx.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    drop(path_tx.send(req.uri().to_string()));
                    Ok(resp)
                };
                let Ok(ws_stream) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                else {
                    continue;
                };

                counter.fetch_add(1, Ordering::SeqCst);

                let inbound = inbound_tx.clone();
                let pong_flag = Arc::clone(&pong_flag);
                let hangup_flag = Arc::clone(&hangup_flag);

                // Per-connection task
                tokio::spawn(async move {
                    let (mut write, mut read) = ws_stream.split();
                    loop {
                        tokio::select! {
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        let text = text.as_str().to_owned();
                                        if text == "ping"
                                            && pong_flag.load(Ordering::SeqCst)
                                            && write.send(Message::Text("pong".into())).await.is_err()
                                        {
                                            break;
                                        }
                                        drop(inbound.send(text));
                                    }
                                    Some(Ok(_)) => {}
                                    _ => break,
                                }
                            }
                            msg = msg_rx.recv() => {
                                match msg {
                                    Ok(text) => {
                                        if write.send(Message::Text(text.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => break,
                                }
                            }
                            () = sleep(Duration::from_millis(20)) => {
                                if hangup_flag.load(Ordering::SeqCst) {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            message_tx,
            inbound_rx,
            path_rx,
            auto_pong,
            hangup,
            connections,
        }
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Reply `pong` to every heartbeat ping.
    pub fn respond_to_pings(&self) {
        self.auto_pong.store(true, Ordering::SeqCst);
    }

    /// Drop every live connection (and any new one until allowed again).
    pub fn disconnect_all(&self) {
        self.hangup.store(true, Ordering::SeqCst);
    }

    pub fn allow_connections(&self) {
        self.hangup.store(false, Ordering::SeqCst);
    }

    /// Total number of WebSocket handshakes accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Send a text frame to all connected clients.
    pub fn send(&self, message: &str) {
        drop(self.message_tx.send(message.to_owned()));
    }

    /// Receive the next frame a client sent.
    pub async fn recv_frame(&mut self) -> Option<String> {
        timeout(Duration::from_secs(2), self.inbound_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Receive the path (with query) of the next accepted handshake.
    pub async fn recv_path(&mut self) -> Option<String> {
        timeout(Duration::from_secs(2), self.path_rx.recv())
            .await
            .ok()
            .flatten()
    }
}
