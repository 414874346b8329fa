use thiserror::Error;
use warden_store::StoreError;
use warden_types::RpcError;

/// Errors from engine construction and internal operations.
///
/// Per-request failures never surface as `Err` from the router; they are
/// materialized into the response's error slot. This enum covers what can go
/// wrong underneath (and at build time).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("an approval handler is required to construct the engine")]
    MissingApprovalHandler,

    #[error("restricted method `{0}` registered more than once")]
    DuplicateRestrictedMethod(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("delegation chain for `{method}` exceeded {limit} hops")]
    DelegationDepthExceeded { method: String, limit: usize },
}

impl From<EngineError> for RpcError {
    fn from(err: EngineError) -> Self {
        RpcError::internal(err.to_string())
    }
}
