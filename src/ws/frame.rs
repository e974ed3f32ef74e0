//! Classification of inbound text frames.
//!
//! The channel is text-only. Every frame the server sends is one of three
//! things: the acknowledgment sentinel emitted once the channel is accepted,
//! a bare-text liveness token, or a JSON payload for the consumer. Frames
//! are classified on arrival and never stored.

use std::borrow::Cow;

use serde_json::Value;

/// Acknowledgment sentinel the server sends once a channel is accepted.
pub const CONNECT_SUCCESS: &str = "Connect success";

/// Liveness probe sent to the server on the heartbeat interval.
pub const PING: &str = "ping";

/// Liveness reply token.
pub const PONG: &str = "pong";

/// A classified inbound frame.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Connection acknowledgment; consumed by the manager, never forwarded
    Ack,
    /// Liveness probe from the peer
    Ping,
    /// Heartbeat reply. Any text that is neither a known token nor valid
    /// JSON also lands here: the server replies to pings with bare text, so
    /// an undecodable frame counts as proof of liveness, not as an error.
    Pong,
    /// Decoded JSON payload for the consumer callback
    Data(Value),
}

impl Frame {
    /// Classify a raw text frame.
    ///
    /// Some peers prepend a UTF-8 BOM to text frames; it is stripped before
    /// classification.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let text = strip_bom(raw);
        match text.as_ref() {
            CONNECT_SUCCESS => Self::Ack,
            PING => Self::Ping,
            PONG => Self::Pong,
            other => serde_json::from_str(other).map_or(Self::Pong, Self::Data),
        }
    }

    /// Whether this frame carries a payload for the consumer callback.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

fn strip_bom(raw: &str) -> Cow<'_, str> {
    if raw.contains('\u{feff}') {
        Cow::Owned(raw.replace('\u{feff}', ""))
    } else {
        Cow::Borrowed(raw)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sentinel_is_an_ack() {
        assert_eq!(Frame::parse("Connect success"), Frame::Ack);
    }

    #[test]
    fn liveness_tokens_classify_as_such() {
        assert_eq!(Frame::parse("ping"), Frame::Ping);
        assert_eq!(Frame::parse("pong"), Frame::Pong);
    }

    #[test]
    fn json_object_is_data() {
        let frame = Frame::parse(r#"{"role":"assistant","content":"hi"}"#);

        assert_eq!(
            frame,
            Frame::Data(json!({"role": "assistant", "content": "hi"}))
        );
        assert!(frame.is_data());
    }

    #[test]
    fn undecodable_text_counts_as_a_reply() {
        assert_eq!(Frame::parse("PONG-ish-nonjson"), Frame::Pong);
    }

    #[test]
    fn bom_is_stripped_before_classification() {
        assert_eq!(
            Frame::parse("\u{feff}{\"content\":\"hi\"}"),
            Frame::Data(json!({"content": "hi"}))
        );
        assert_eq!(Frame::parse("\u{feff}pong"), Frame::Pong);
    }

    #[test]
    fn json_scalars_are_still_data() {
        assert_eq!(Frame::parse("\"hi\""), Frame::Data(json!("hi")));
    }
}
