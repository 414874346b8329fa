use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::approval::ApprovalCoordinator;
use crate::config::EngineBuilder;
use crate::error::EngineError;
use crate::grants::GrantEngine;
use crate::registry::MethodRegistry;
use crate::resolver::DelegationResolver;
use crate::router;
use warden_store::PermissionStore;
use warden_types::{
    Disposition, DomainId, EngineState, Permission, PermissionsRequest, RequestedPermissions,
    RpcRequest, RpcResponse,
};

/// The assembled permission engine.
///
/// One instance serves every domain behind the host's RPC surface. All
/// configuration is fixed at build time; only the permission state changes
/// afterwards.
pub struct PermissionEngine {
    store: Arc<PermissionStore>,
    registry: MethodRegistry,
    safe_methods: HashSet<String>,
    method_prefix: String,
    resolver: DelegationResolver,
    grants: GrantEngine,
    approvals: ApprovalCoordinator,
}

impl PermissionEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        store: Arc<PermissionStore>,
        registry: MethodRegistry,
        safe_methods: HashSet<String>,
        method_prefix: String,
        resolver: DelegationResolver,
        grants: GrantEngine,
        approvals: ApprovalCoordinator,
    ) -> Self {
        Self {
            store,
            registry,
            safe_methods,
            method_prefix,
            resolver,
            grants,
            approvals,
        }
    }

    /// The middleware entry point.
    ///
    /// Exactly one of `Next` (forward the untouched request) or `End`
    /// (the response is terminal) comes back; per-request failures land in
    /// `res.error`, never in a panic or an `Err`.
    pub async fn handle(
        &self,
        domain: &DomainId,
        req: &RpcRequest,
        res: &mut RpcResponse,
    ) -> Disposition {
        router::route(self, domain, req, res).await
    }

    /// Issue root-granted permissions directly, bypassing the approval flow.
    ///
    /// This is what an embedding host calls when authority comes from
    /// somewhere other than the built-in approval surface.
    pub fn grant_new_permissions(
        &self,
        domain: &DomainId,
        requested: &RequestedPermissions,
    ) -> Result<Vec<Permission>, EngineError> {
        self.grants.grant_root(domain, requested)
    }

    /// The domain's current permission list.
    pub fn permissions(&self, domain: &DomainId) -> Result<Vec<Permission>, EngineError> {
        Ok(self.store.get_permissions(domain)?)
    }

    /// Pending approval tickets, oldest first.
    pub fn permissions_requests(&self) -> Result<Vec<PermissionsRequest>, EngineError> {
        Ok(self.store.pending_requests()?)
    }

    /// Drop a pending approval ticket, returning it if it was present.
    pub fn reject_permissions_request(
        &self,
        id: &str,
    ) -> Result<Option<PermissionsRequest>, EngineError> {
        Ok(self.store.remove_pending_request(id)?)
    }

    /// Remove every domain entry.
    pub fn clear_domains(&self) -> Result<(), EngineError> {
        Ok(self.store.clear_domains()?)
    }

    /// The full serializable engine state.
    pub fn snapshot(&self) -> Result<EngineState, EngineError> {
        Ok(self.store.snapshot()?)
    }

    /// Receive a state snapshot after every mutation (for persistence).
    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<EngineState>, EngineError> {
        Ok(self.store.subscribe()?)
    }

    /// Direct access to the underlying store, for hosts that manage domain
    /// entries out of band.
    pub fn store(&self) -> &PermissionStore {
        &self.store
    }

    pub(crate) fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub(crate) fn safe_methods(&self) -> &HashSet<String> {
        &self.safe_methods
    }

    pub(crate) fn method_prefix(&self) -> &str {
        &self.method_prefix
    }

    pub(crate) fn resolver(&self) -> &DelegationResolver {
        &self.resolver
    }

    pub(crate) fn grants(&self) -> &GrantEngine {
        &self.grants
    }

    pub(crate) fn approvals(&self) -> &ApprovalCoordinator {
        &self.approvals
    }
}
