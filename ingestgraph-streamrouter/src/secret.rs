use async_trait::async_trait;
use ingestgraph_core::EngineError;

/// Backs the signing/verification secret behind the excluded
/// `ConfigService`, the same externalization `ingestgraph-webhook` uses
/// for its own HMAC secret. `verification_secrets` can return more than
/// one key during a rotation window: a token signed under the previous
/// secret still validates until it expires, while new tokens are always
/// signed with `signing_secret`.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn signing_secret(&self) -> Result<String, EngineError>;
    async fn verification_secrets(&self) -> Result<Vec<String>, EngineError>;
}

/// A fixed single secret, useful for tests and single-instance
/// deployments with no rotation in progress.
pub struct StaticSecretProvider {
    secret: String,
}

impl StaticSecretProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn signing_secret(&self) -> Result<String, EngineError> {
        Ok(self.secret.clone())
    }

    async fn verification_secrets(&self) -> Result<Vec<String>, EngineError> {
        Ok(vec![self.secret.clone()])
    }
}
