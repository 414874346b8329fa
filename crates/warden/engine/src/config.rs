use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::approval::ApprovalCoordinator;
use crate::engine::PermissionEngine;
use crate::error::EngineError;
use crate::grants::GrantEngine;
use crate::registry::{MethodRegistry, RestrictedMethod};
use crate::resolver::{DelegationResolver, DEFAULT_MAX_DELEGATION_DEPTH};
use crate::traits::{ApprovalHandler, MethodHandler};
use warden_store::PermissionStore;
use warden_types::EngineState;

/// Builds a [`PermissionEngine`].
///
/// Everything is optional except the approval handler; building without one
/// fails, since the engine would have no way to ever mint a root grant.
pub struct EngineBuilder {
    safe_methods: HashSet<String>,
    restricted_methods: Vec<(String, RestrictedMethod)>,
    method_prefix: String,
    approval_handler: Option<Arc<dyn ApprovalHandler>>,
    init_state: Option<EngineState>,
    max_delegation_depth: usize,
    approval_timeout: Option<Duration>,
    retain_rejected_requests: bool,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            safe_methods: HashSet::new(),
            restricted_methods: Vec::new(),
            method_prefix: String::new(),
            approval_handler: None,
            init_state: None,
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
            approval_timeout: None,
            retain_rejected_requests: true,
        }
    }

    /// Methods that bypass permission checks entirely.
    pub fn with_safe_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.safe_methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// Register a method this engine governs.
    pub fn with_restricted_method(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn MethodHandler>,
    ) -> Self {
        self.restricted_methods.push((
            name.into(),
            RestrictedMethod {
                description: description.into(),
                handler,
            },
        ));
        self
    }

    /// Namespace prefix for the built-in meta methods (default: none).
    pub fn with_method_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.method_prefix = prefix.into();
        self
    }

    /// The external approval oracle. Required.
    pub fn with_approval_handler(mut self, handler: Arc<dyn ApprovalHandler>) -> Self {
        self.approval_handler = Some(handler);
        self
    }

    /// Rehydrate permission state from a snapshot.
    pub fn with_init_state(mut self, state: EngineState) -> Self {
        self.init_state = Some(state);
        self
    }

    /// Bound on delegation-chain length before resolution errors out.
    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = depth;
        self
    }

    /// Give the approver a deadline; timing out counts as user rejection.
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = Some(timeout);
        self
    }

    /// Whether rejected approval tickets stay in the pending list (default:
    /// true, keeping the record of what was asked).
    pub fn with_retain_rejected_requests(mut self, retain: bool) -> Self {
        self.retain_rejected_requests = retain;
        self
    }

    pub fn build(self) -> Result<PermissionEngine, EngineError> {
        let approval_handler = self
            .approval_handler
            .ok_or(EngineError::MissingApprovalHandler)?;
        let registry = MethodRegistry::new(self.restricted_methods)?;

        let descriptions = registry.descriptions();
        let store = Arc::new(match self.init_state {
            Some(state) => PermissionStore::from_snapshot(state, descriptions),
            None => PermissionStore::new(descriptions),
        });

        let resolver = DelegationResolver::new(store.clone(), self.max_delegation_depth);
        let grants = GrantEngine::new(store.clone());
        let approvals = ApprovalCoordinator::new(
            store.clone(),
            approval_handler,
            self.approval_timeout,
            self.retain_rejected_requests,
        );

        Ok(PermissionEngine::assemble(
            store,
            registry,
            self.safe_methods,
            self.method_prefix,
            resolver,
            grants,
            approvals,
        ))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
