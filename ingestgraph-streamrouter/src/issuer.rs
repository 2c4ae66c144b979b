use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ingestgraph_core::EngineError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use crate::claims::SignedUrlClaims;
use crate::secret::SecretProvider;

/// What the caller wants a signed stream URL to grant. `ttl_seconds`
/// overrides the issuer's default, e.g. a shorter lifetime for an
/// anonymous share link.
#[derive(Debug, Clone)]
pub struct SignedUrlRequest {
    pub org_id: Uuid,
    pub record_id: Uuid,
    pub user_id: Uuid,
    pub connector: String,
    pub scopes: Vec<String>,
    pub ttl_seconds: Option<i64>,
}

/// Mints signed stream-access tokens. `r2e-security/src/jwt.rs`'s
/// `JwtClaimsValidator` runs this in reverse: where that validates an
/// inbound token against a JWKS/static key, this signs an outbound one
/// with HS256 against a rotating shared secret (spec §4.13).
pub struct SignedUrlIssuer {
    secrets: Arc<dyn SecretProvider>,
    default_ttl_seconds: i64,
}

impl SignedUrlIssuer {
    pub fn new(secrets: Arc<dyn SecretProvider>, default_ttl_seconds: i64) -> Self {
        Self { secrets, default_ttl_seconds }
    }

    /// Issue a signed token (just the JWT, not a full URL).
    pub async fn issue(&self, request: SignedUrlRequest) -> Result<String, EngineError> {
        let secret = self.secrets.signing_secret().await?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| EngineError::internal(e.to_string()))?.as_secs() as i64;
        let ttl = request.ttl_seconds.unwrap_or(self.default_ttl_seconds);

        let claims = SignedUrlClaims {
            org_id: request.org_id,
            record_id: request.record_id,
            user_id: request.user_id,
            connector: request.connector,
            scopes: request.scopes,
            exp: now + ttl,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|e| EngineError::internal(format!("failed to sign stream url: {e}")))
    }

    /// Issue a full stream URL by appending the token to `base_url` as a
    /// path segment, e.g. `https://host/stream/{token}` — the shape
    /// `router.py`'s `/download` handler expects on the way back in.
    pub async fn issue_url(&self, base_url: &str, request: SignedUrlRequest) -> Result<String, EngineError> {
        let token = self.issue(request).await?;
        let base = base_url.trim_end_matches('/');
        Ok(format!("{base}/{token}"))
    }
}
