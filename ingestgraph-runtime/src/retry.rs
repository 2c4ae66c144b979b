use ingestgraph_core::EngineError;

/// The run-level consequence of a failure, per spec §7's policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Retry the same batch; the rate limiter already mediates backoff.
    RetryBatch,
    /// Abort the whole run and mark the connector `NEEDS_REAUTH`.
    AbortNeedsReauth,
    /// Clear the SyncPoint for this scope and fall back to a full sync on
    /// the next run.
    ClearCursorContinue,
    /// Skip this one entity, log a warning, keep going.
    SkipEntityContinue,
    /// Bubble the error all the way up without advancing the checkpoint.
    BubbleNoCheckpointAdvance,
}

/// Maps an [`EngineError`] to the action a sync loop should take, per spec
/// §7's error-kind-to-policy table. Entity-level errors are classified by
/// the connector's own batch loop (`SkipEntityContinue`); run-level errors
/// are classified by `ingestgraph-runtime::ConnectorRuntime` once they
/// bubble past the batch loop unhandled.
pub struct RetryPolicy;

impl RetryPolicy {
    pub fn classify(err: &EngineError) -> RetryAction {
        match err {
            EngineError::Transient { .. } => RetryAction::RetryBatch,
            EngineError::Auth { .. } => RetryAction::AbortNeedsReauth,
            EngineError::CursorInvalid { .. } => RetryAction::ClearCursorContinue,
            EngineError::EntityMissing { .. } | EngineError::Validation { .. } | EngineError::Internal { .. } => {
                RetryAction::SkipEntityContinue
            }
            EngineError::Store { .. } => RetryAction::BubbleNoCheckpointAdvance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_kind_per_the_policy_table() {
        assert_eq!(RetryPolicy::classify(&EngineError::transient("x")), RetryAction::RetryBatch);
        assert_eq!(RetryPolicy::classify(&EngineError::auth("x")), RetryAction::AbortNeedsReauth);
        assert_eq!(RetryPolicy::classify(&EngineError::cursor_invalid("x")), RetryAction::ClearCursorContinue);
        assert_eq!(RetryPolicy::classify(&EngineError::entity_missing("x")), RetryAction::SkipEntityContinue);
        assert_eq!(RetryPolicy::classify(&EngineError::validation("x")), RetryAction::SkipEntityContinue);
        assert_eq!(RetryPolicy::classify(&EngineError::internal("x")), RetryAction::SkipEntityContinue);
        assert_eq!(RetryPolicy::classify(&EngineError::store("x")), RetryAction::BubbleNoCheckpointAdvance);
    }
}
