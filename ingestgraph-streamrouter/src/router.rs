use std::sync::Arc;

use async_trait::async_trait;
use ingestgraph_core::EngineError;
use ingestgraph_runtime::{ConnectorDriver, StreamingResponse, SyncContext};
use ingestgraph_types::RecordKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::claims::SignedUrlClaims;
use crate::secret::SecretProvider;

/// Resolves a validated token's `connector` claim to the connector
/// instance (and the record it names) that should actually serve the
/// stream. Record lookup by id is deployment-specific — the `Store`
/// trait only indexes records by external id/path — so, like
/// `WebhookRegistry`, this is externalized to the caller rather than
/// wired against a concrete store here.
#[async_trait]
pub trait StreamRouteRegistry: Send + Sync {
    async fn resolve(&self, claims: &SignedUrlClaims) -> Result<(Arc<dyn ConnectorDriver>, SyncContext, RecordKind), EngineError>;
}

/// Validates an inbound signed-stream token and dispatches to the
/// connector that owns the record (spec §4.13). Grounded on
/// `r2e-security/src/jwt.rs`'s `JwtClaimsValidator::validate`: decode,
/// check algorithm, verify signature, return claims.
pub struct StreamRouter {
    registry: Arc<dyn StreamRouteRegistry>,
    secrets: Arc<dyn SecretProvider>,
}

impl StreamRouter {
    pub fn new(registry: Arc<dyn StreamRouteRegistry>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { registry, secrets }
    }

    pub async fn validate(&self, token: &str) -> Result<SignedUrlClaims, EngineError> {
        let candidates = self.secrets.verification_secrets().await?;
        if candidates.is_empty() {
            return Err(EngineError::internal("no verification secrets configured"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;

        let mut last_error = None;
        for secret in &candidates {
            match decode::<SignedUrlClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_error = Some(e),
            }
        }

        Err(EngineError::auth(format!(
            "stream token rejected by all {} verification secret(s): {}",
            candidates.len(),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Validate `token` and stream the record it names.
    pub async fn dispatch(&self, token: &str) -> Result<StreamingResponse, EngineError> {
        let claims = self.validate(token).await?;
        let (driver, ctx, record) = self.registry.resolve(&claims).await?;
        driver.stream_record(&ctx, &record).await
    }
}
