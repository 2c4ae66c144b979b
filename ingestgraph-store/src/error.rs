/// Errors from the store layer. Bridges into [`ingestgraph_core::EngineError::Store`]
/// per spec §7 "Downstream store failure": bubble up, no checkpoint advance.
#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Conflict(String),
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "not found: {msg}"),
            StoreError::Conflict(msg) => write!(f, "conflict: {msg}"),
            StoreError::Backend(err) => write!(f, "store backend error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<StoreError> for ingestgraph_core::EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ingestgraph_core::EngineError::entity_missing(msg),
            other => ingestgraph_core::EngineError::store(other.to_string()),
        }
    }
}
