use async_trait::async_trait;
use thiserror::Error;

use warden_types::{
    Disposition, PermissionsRequest, RequestedPermissions, RpcError, RpcRequest, RpcResponse,
    USER_REJECTED_CODE,
};

/// The permissions an approver settled on, keyed by method name.
///
/// May differ from what was requested; the engine trusts it verbatim.
pub type ApprovedPermissions = RequestedPermissions;

/// Implementation of a restricted method.
///
/// Runs only after a permission has resolved for the caller. The handler owns
/// the rest of the request lifetime: it either fills the response and ends,
/// or passes the request further down the chain.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, req: &RpcRequest, res: &mut RpcResponse) -> Disposition;
}

/// The external oracle that asks the user which permissions to grant.
///
/// Required at construction. The future may resolve long after the RPC
/// arrived; the pending ticket lives in the store meanwhile.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    async fn request_approval(
        &self,
        request: PermissionsRequest,
    ) -> Result<ApprovedPermissions, ApprovalError>;
}

/// Terminal refusal from an approval flow, carried back to the caller as a
/// wire error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApprovalError {
    pub code: i64,
    pub message: String,
}

impl ApprovalError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            code: USER_REJECTED_CODE,
            message: message.into(),
        }
    }
}

impl From<ApprovalError> for RpcError {
    fn from(err: ApprovalError) -> Self {
        RpcError::new(err.code, err.message)
    }
}
