use tracing::debug;

use crate::registry::MethodRegistry;
use warden_types::{Disposition, Permission, RpcError, RpcRequest, RpcResponse};

/// Run a restricted method under an already-resolved permission.
///
/// A missing registry entry means the store was rehydrated from a snapshot
/// that references a method no longer registered; the caller gets the
/// standard JSON-RPC method-not-found error. A `"static"` caveat on the
/// permission fixes the result without touching the handler; the last one
/// wins when several are attached.
pub(crate) async fn execute(
    registry: &MethodRegistry,
    permission: &Permission,
    req: &RpcRequest,
    res: &mut RpcResponse,
) -> Disposition {
    let Some(entry) = registry.get(&req.method) else {
        res.error = Some(RpcError::method_not_found());
        return Disposition::End;
    };

    if let Some(value) = permission.static_caveat_value() {
        debug!(method = %req.method, "static caveat short-circuit");
        res.result = Some(value.clone());
        return Disposition::End;
    }

    entry.handler.handle(req, res).await
}
