//! Per-provider webhook handlers (spec §4.1, §4.12). Grounded on
//! `router.py`'s `handle_drive_webhook`/`handle_gmail_webhook`/
//! `handle_admin_webhook`: verify first, decode the envelope, dispatch to
//! the background task, return 200 immediately. The handler never applies
//! a notification's payload directly — it only ever triggers
//! `run_incremental_sync` through [`ConnectorDriver::handle_webhook_notification`].

use std::collections::HashMap;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use bytes::Bytes;
use ingestgraph_runtime::WebhookNotification;

use crate::envelope::decode_gmail_pubsub;
use crate::signature::verify_hmac_sha256;
use crate::state::WebhookState;

const DRIVE_SIGNATURE_HEADER: &str = "x-goog-channel-token";
const DRIVE_RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";
const DRIVE_RESOURCE_ID_HEADER: &str = "x-goog-resource-id";
const ADMIN_SIGNATURE_HEADER: &str = "x-goog-channel-token";

fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or_default().to_string()))
        .collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn dispatch(state: &WebhookState, notification: WebhookNotification, provider: &'static str, resource_id: Option<String>) {
    let registry = state.registry.clone();
    tokio::spawn(async move {
        match registry.resolve(provider, resource_id.as_deref()).await {
            Ok((driver, ctx)) => {
                if let Err(e) = driver.handle_webhook_notification(&ctx, notification).await {
                    tracing::error!(provider, error = %e, "webhook-triggered incremental sync failed");
                }
            }
            Err(e) => {
                tracing::warn!(provider, error = %e, "no connector instance registered for webhook notification");
            }
        }
    });
}

pub async fn handle_drive_webhook(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let secret = match state.secrets.hmac_secret("drive").await {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(error = %e, "no hmac secret configured for drive webhooks");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"status": "error"})));
        }
    };
    let signature = header_str(&headers, DRIVE_SIGNATURE_HEADER).unwrap_or_default();
    if !verify_hmac_sha256(&secret, signature, &body) {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"status": "unauthorized"})));
    }

    let resource_state = header_str(&headers, DRIVE_RESOURCE_STATE_HEADER).map(str::to_string);
    let resource_id = header_str(&headers, DRIVE_RESOURCE_ID_HEADER).map(str::to_string);

    if resource_state.as_deref() == Some("sync") {
        return (StatusCode::OK, Json(serde_json::json!({"status": "sync_verified"})));
    }

    let notification =
        WebhookNotification { provider: "drive".into(), resource_id: resource_id.clone(), raw_body: body.to_vec(), headers: headers_to_map(&headers) };
    dispatch(&state, notification, "drive", resource_id);

    (StatusCode::OK, Json(serde_json::json!({"status": "accepted"})))
}

pub async fn handle_gmail_webhook(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let expected_token = match state.secrets.bearer_token("gmail").await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "no bearer token configured for gmail webhooks");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"status": "error"})));
        }
    };
    let provided = header_str(&headers, "authorization").unwrap_or_default().strip_prefix("Bearer ").unwrap_or_default();
    if provided.is_empty() || provided != expected_token {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"status": "unauthorized"})));
    }

    let decoded = match decode_gmail_pubsub(&body) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(error = %e, "invalid gmail pubsub envelope");
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"status": "error", "message": e.to_string()})));
        }
    };

    let notification = WebhookNotification { provider: "gmail".into(), resource_id: None, raw_body: decoded, headers: headers_to_map(&headers) };
    dispatch(&state, notification, "gmail", None);

    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

pub async fn handle_admin_webhook(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let secret = match state.secrets.hmac_secret("admin").await {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(error = %e, "no hmac secret configured for admin webhooks");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"status": "error"})));
        }
    };
    let signature = header_str(&headers, ADMIN_SIGNATURE_HEADER).unwrap_or_default();
    if !verify_hmac_sha256(&secret, signature, &body) {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"status": "unauthorized"})));
    }

    // An empty/invalid JSON body is treated as a channel verification
    // request, not an error (spec §4.12, `handle_admin_webhook`'s
    // try/except around `request.json()`).
    if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
        return (StatusCode::OK, Json(serde_json::json!({"status": "accepted", "message": "Verification request received"})));
    }

    let notification = WebhookNotification { provider: "admin".into(), resource_id: None, raw_body: body.to_vec(), headers: headers_to_map(&headers) };
    dispatch(&state, notification, "admin", None);

    (StatusCode::OK, Json(serde_json::json!({"status": "accepted"})))
}
