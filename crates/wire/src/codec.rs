// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure encode/decode pair between an [`Envelope`] and the UTF-8 JSON text
//! that rides inside one WebSocket text frame (spec §4.1).
//!
//! Deliberately transport-agnostic: the orchestrator's listener runs on
//! `axum`'s WebSocket extractor, the node's client runs on
//! `tokio-tungstenite`, and both wrap their own `Message::Text(String)`
//! around whatever this module produces. No I/O of its own, so it's unit
//! tested without a socket; decode failures are typed and never close
//! anything themselves — that's the listener's/client's call.

use crate::envelope::Envelope;

/// Everything that can go wrong turning wire text into an [`Envelope`] or
/// back.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("failed to encode envelope: {0}")]
    EncodeFailed(String),
}

/// Encode an envelope as the JSON text for a single WebSocket text frame.
pub fn encode(envelope: &Envelope) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(|e| ProtocolError::EncodeFailed(e.to_string()))
}

/// Decode the text of a WebSocket text frame into an envelope. An unknown
/// `type` discriminator or any other shape mismatch is folded into
/// `MalformedJson`; the caller logs and ignores it (spec §4.2: "unknown
/// types are logged and ignored") rather than treating it as fatal.
pub fn decode(text: &str) -> Result<Envelope, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::MalformedJson(e.to_string()))
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
