//! Provider envelope decoding (spec §4.1/§4.12). Grounded on
//! `router.py`'s `handle_gmail_webhook`: Pub/Sub wraps the actual
//! notification in `{"message": {"data": "<base64>"}}`.

use base64::Engine;
use ingestgraph_core::EngineError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PubSubPush {
    message: Option<PubSubMessage>,
}

#[derive(Debug, Deserialize)]
struct PubSubMessage {
    data: Option<String>,
}

/// Decode a Gmail Pub/Sub push body into the raw notification bytes.
/// `data` is standard (not URL-safe) base64, matching `base64.b64decode`
/// in the original handler.
pub fn decode_gmail_pubsub(body: &[u8]) -> Result<Vec<u8>, EngineError> {
    let push: PubSubPush =
        serde_json::from_slice(body).map_err(|e| EngineError::validation(format!("invalid pubsub envelope: {e}")))?;

    let data = push
        .message
        .and_then(|m| m.data)
        .ok_or_else(|| EngineError::validation("pubsub envelope has no message.data"))?;

    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| EngineError::validation(format!("invalid base64 in pubsub envelope: {e}")))
}
