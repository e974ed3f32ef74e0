//! Chat channel client.
//!
//! [`ChatClient`] is the public entry point: it validates the launch token,
//! owns the single live session and drives the collaborator seams in
//! [`hooks`] as the channel changes state. Inbound JSON payloads reach the
//! consumer callback registered on connect, in arrival order; everything
//! else on the wire is heartbeat traffic the client consumes itself.
//!
//! # Example
//!
//! ```rust, no_run
//! use chat_client_sdk::chat::ChatClient;
//! use chat_client_sdk::chat::hooks::{Hooks, QueryParams};
//! use chat_client_sdk::ws::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let params = QueryParams::from_query("token=abc123");
//!     let client = ChatClient::new(Config::default(), params, Hooks::default());
//!
//!     client
//!         .connect("wss://chat.example.com/channel", |payload| {
//!             println!("message: {payload}");
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod hooks;
pub mod types;

pub use client::{ChatClient, Consumer};
pub use hooks::{ChatHistory, Dialogs, EmbedEvent, EmbedNotifier, Hooks, LaunchParams, QueryParams, UiState};
pub use types::{ChatMessage, ChatRecord, Role};
