//! The JSON frame envelope.
//!
//! Every message on the wire — client request, server response, server push —
//! is one JSON object: `{ver, cmd, seq, opcode, payload}`.  `payload` is an
//! opaque document whose shape depends on `opcode`; decoding it into a typed
//! record happens at the dispatch boundary, not here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed protocol version carried in every frame.
pub const PROTOCOL_VERSION: u8 = 11;

/// Command marker for client-originated request frames.
pub const CMD_REQUEST: u8 = 0;

// ─── Frame ────────────────────────────────────────────────────────────────────

/// One structured message exchanged over the persistent connection.
///
/// Requests and responses are correlated by `seq`; pushes carry a `seq` the
/// client never allocated (or `0`) and are classified by `opcode` instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub ver:    u8,
    pub cmd:    u8,
    #[serde(default)]
    pub seq:    i64,
    pub opcode: i32,
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    /// Build a client request frame with the fixed version and command marker.
    pub fn request(seq: i64, opcode: i32, payload: Value) -> Self {
        Self { ver: PROTOCOL_VERSION, cmd: CMD_REQUEST, seq, opcode, payload }
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a frame from its wire representation.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The `error` code string from the payload, if the payload carries one.
    ///
    /// A non-empty `error` field denotes a failed request per the wire
    /// convention; an empty or absent field means success.
    pub fn error_code(&self) -> Option<&str> {
        match self.payload.get("error").and_then(Value::as_str) {
            Some("") | None => None,
            Some(code)      => Some(code),
        }
    }
}
