use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::EngineError;
use crate::grants::GrantEngine;
use crate::traits::ApprovalHandler;
use warden_store::PermissionStore;
use warden_types::{
    Disposition, DomainId, PermissionsRequest, RequestedPermissions, RpcError, RpcRequest,
    RpcResponse, TicketMetadata,
};

/// Bridges the synchronous middleware contract with the asynchronous user
/// approval step.
///
/// The pending ticket is committed to the store before the approver is
/// awaited, so persistence subscribers see it while the decision is out.
/// Nothing is locked across the await; two in-flight approvals are
/// independent and may complete in any order.
pub struct ApprovalCoordinator {
    store: Arc<PermissionStore>,
    handler: Arc<dyn ApprovalHandler>,
    timeout: Option<Duration>,
    retain_rejected: bool,
}

impl ApprovalCoordinator {
    pub(crate) fn new(
        store: Arc<PermissionStore>,
        handler: Arc<dyn ApprovalHandler>,
        timeout: Option<Duration>,
        retain_rejected: bool,
    ) -> Self {
        Self {
            store,
            handler,
            timeout,
            retain_rejected,
        }
    }

    /// The `requestPermissions` meta method.
    ///
    /// Params: `[{ method -> { caveats? } }]`. Opens a ticket, awaits the
    /// approver, and on approval mints root grants for every method the
    /// approver returned (which may differ from what was asked).
    pub(crate) async fn handle_request_permissions(
        &self,
        grants: &GrantEngine,
        domain: &DomainId,
        req: &RpcRequest,
        res: &mut RpcResponse,
    ) -> Disposition {
        let options = match parse_options(req) {
            Ok(options) => options,
            Err(error) => {
                res.error = Some(error);
                return Disposition::End;
            }
        };

        let metadata = fill_metadata(domain, req);
        let ticket_id = metadata.id.clone();
        let ticket = PermissionsRequest {
            origin: domain.clone(),
            metadata,
            options,
        };

        if let Err(err) = self.store.push_pending_request(ticket.clone()) {
            res.error = Some(EngineError::from(err).into());
            return Disposition::End;
        }
        info!(domain = %domain, ticket = %ticket_id, "awaiting user approval");

        let decision = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.handler.request_approval(ticket)).await {
                    Ok(decision) => decision,
                    Err(_) => {
                        warn!(domain = %domain, ticket = %ticket_id, "approval timed out");
                        let _ = self.store.remove_pending_request(&ticket_id);
                        res.error = Some(RpcError::user_rejected());
                        return Disposition::End;
                    }
                }
            }
            None => self.handler.request_approval(ticket).await,
        };

        match decision {
            Err(rejection) => {
                warn!(domain = %domain, ticket = %ticket_id, "approval rejected");
                if !self.retain_rejected {
                    let _ = self.store.remove_pending_request(&ticket_id);
                }
                res.error = Some(rejection.into());
                Disposition::End
            }
            Ok(approved) if approved.is_empty() => {
                warn!(domain = %domain, ticket = %ticket_id, "approver returned nothing");
                if !self.retain_rejected {
                    let _ = self.store.remove_pending_request(&ticket_id);
                }
                res.error = Some(RpcError::user_rejected());
                Disposition::End
            }
            Ok(approved) => {
                if let Err(error) = self.commit(grants, domain, &ticket_id, &approved, res) {
                    res.error = Some(error);
                }
                Disposition::End
            }
        }
    }

    fn commit(
        &self,
        grants: &GrantEngine,
        domain: &DomainId,
        ticket_id: &str,
        approved: &RequestedPermissions,
        res: &mut RpcResponse,
    ) -> Result<(), RpcError> {
        self.store
            .remove_pending_request(ticket_id)
            .map_err(EngineError::from)?;
        grants.grant_root(domain, approved)?;
        let granted = self
            .store
            .get_permissions(domain)
            .map_err(EngineError::from)?;
        info!(domain = %domain, ticket = %ticket_id, granted = granted.len(), "approval committed");
        res.result =
            Some(serde_json::to_value(&granted).map_err(|e| RpcError::internal(e.to_string()))?);
        Ok(())
    }
}

fn parse_options(req: &RpcRequest) -> Result<RequestedPermissions, RpcError> {
    let expectation = "expected [{ method: { caveats? } }]";
    let params = req
        .params
        .clone()
        .ok_or_else(|| RpcError::invalid_params(expectation))?;
    let (options,): (RequestedPermissions,) =
        serde_json::from_value(params).map_err(|_| RpcError::invalid_params(expectation))?;
    Ok(options)
}

/// Complete the caller-supplied metadata: the caller domain stands in for a
/// missing origin and title, and a missing id gets a fresh one.
fn fill_metadata(domain: &DomainId, req: &RpcRequest) -> TicketMetadata {
    let supplied = req.metadata.clone().unwrap_or_default();
    TicketMetadata {
        id: supplied
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        origin: supplied.origin.unwrap_or_else(|| domain.clone()),
        site_title: supplied.site_title.or_else(|| Some(domain.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ApprovalError, ApprovedPermissions};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use warden_types::RequestMetadata;

    /// Approver double: replies with a canned decision and remembers the
    /// ticket it saw.
    struct ScriptedApprover {
        decision: Mutex<Option<Result<ApprovedPermissions, ApprovalError>>>,
        seen: Mutex<Option<PermissionsRequest>>,
    }

    impl ScriptedApprover {
        fn approving(approved: ApprovedPermissions) -> Arc<Self> {
            Arc::new(Self {
                decision: Mutex::new(Some(Ok(approved))),
                seen: Mutex::new(None),
            })
        }

        fn rejecting(message: &str) -> Arc<Self> {
            Arc::new(Self {
                decision: Mutex::new(Some(Err(ApprovalError::rejected(message)))),
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ApprovalHandler for ScriptedApprover {
        async fn request_approval(
            &self,
            request: PermissionsRequest,
        ) -> Result<ApprovedPermissions, ApprovalError> {
            *self.seen.lock().unwrap() = Some(request);
            self.decision.lock().unwrap().take().expect("single use")
        }
    }

    fn coordinator(
        approver: Arc<dyn ApprovalHandler>,
        retain_rejected: bool,
    ) -> (Arc<PermissionStore>, ApprovalCoordinator, GrantEngine) {
        let store = Arc::new(PermissionStore::new(vec![]));
        let grants = GrantEngine::new(store.clone());
        let coordinator = ApprovalCoordinator::new(store.clone(), approver, None, retain_rejected);
        (store, coordinator, grants)
    }

    fn request_for(methods: serde_json::Value) -> RpcRequest {
        RpcRequest::new("requestPermissions").with_params(json!([methods]))
    }

    #[tokio::test]
    async fn approval_mints_root_grants_and_clears_the_ticket() {
        let approver = ScriptedApprover::approving(
            serde_json::from_value(json!({ "write": {} })).unwrap(),
        );
        let (store, coordinator, grants) = coordinator(approver.clone(), true);
        let domain = DomainId::new("siteA");
        let req = request_for(json!({ "write": {} }));
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &req, &mut res)
            .await;

        assert!(res.error.is_none());
        let granted = res.result.unwrap();
        assert_eq!(granted[0]["method"], "write");
        assert_eq!(granted[0]["granter"], "user");
        assert!(store.pending_requests().unwrap().is_empty());
        assert_eq!(store.get_permissions(&domain).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn metadata_defaults_come_from_the_caller_domain() {
        let approver = ScriptedApprover::approving(
            serde_json::from_value(json!({ "write": {} })).unwrap(),
        );
        let (_, coordinator, grants) = coordinator(approver.clone(), true);
        let domain = DomainId::new("siteA");
        let req = request_for(json!({ "write": {} }));
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &req, &mut res)
            .await;

        let seen = approver.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.origin, domain);
        assert_eq!(seen.metadata.origin, domain);
        assert_eq!(seen.metadata.site_title.as_deref(), Some("siteA"));
        assert!(!seen.metadata.id.is_empty());
    }

    #[tokio::test]
    async fn supplied_metadata_is_respected() {
        let approver = ScriptedApprover::approving(
            serde_json::from_value(json!({ "write": {} })).unwrap(),
        );
        let (_, coordinator, grants) = coordinator(approver.clone(), true);
        let domain = DomainId::new("siteA");
        let req = request_for(json!({ "write": {} })).with_metadata(RequestMetadata {
            id: Some("ticket-7".into()),
            origin: None,
            site_title: Some("A Very Nice Site".into()),
        });
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &req, &mut res)
            .await;

        let seen = approver.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.metadata.id, "ticket-7");
        assert_eq!(seen.metadata.site_title.as_deref(), Some("A Very Nice Site"));
    }

    #[tokio::test]
    async fn empty_approval_is_a_user_rejection_and_retains_the_ticket() {
        let approver = ScriptedApprover::approving(ApprovedPermissions::new());
        let (store, coordinator, grants) = coordinator(approver, true);
        let domain = DomainId::new("siteA");
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &request_for(json!({ "write": {} })), &mut res)
            .await;

        assert_eq!(res.error.as_ref().unwrap().code, 5);
        assert_eq!(store.pending_requests().unwrap().len(), 1);
        assert!(store.get_permissions(&domain).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejection_reason_propagates_and_ticket_removal_is_configurable() {
        let approver = ScriptedApprover::rejecting("not today");
        let (store, coordinator, grants) = coordinator(approver, false);
        let domain = DomainId::new("siteA");
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &request_for(json!({ "write": {} })), &mut res)
            .await;

        let error = res.error.unwrap();
        assert_eq!(error.code, 5);
        assert_eq!(error.message, "not today");
        assert!(store.pending_requests().unwrap().is_empty());
    }

    #[tokio::test]
    async fn approver_may_grant_something_other_than_what_was_asked() {
        let approver = ScriptedApprover::approving(
            serde_json::from_value(json!({ "read": {} })).unwrap(),
        );
        let (store, coordinator, grants) = coordinator(approver, true);
        let domain = DomainId::new("siteA");
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &request_for(json!({ "write": {} })), &mut res)
            .await;

        assert!(res.error.is_none());
        let stored = store.get_permissions(&domain).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].method, "read");
    }

    #[tokio::test]
    async fn malformed_params_never_open_a_ticket() {
        let approver = ScriptedApprover::approving(ApprovedPermissions::new());
        let (store, coordinator, grants) = coordinator(approver, true);
        let domain = DomainId::new("siteA");
        let req = RpcRequest::new("requestPermissions").with_params(json!("nope"));
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &req, &mut res)
            .await;

        assert_eq!(res.error.as_ref().unwrap().code, -32602);
        assert!(store.pending_requests().unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeout_rejects_and_clears_the_ticket() {
        struct NeverApprover;

        #[async_trait]
        impl ApprovalHandler for NeverApprover {
            async fn request_approval(
                &self,
                _request: PermissionsRequest,
            ) -> Result<ApprovedPermissions, ApprovalError> {
                std::future::pending().await
            }
        }

        let store = Arc::new(PermissionStore::new(vec![]));
        let grants = GrantEngine::new(store.clone());
        let coordinator = ApprovalCoordinator::new(
            store.clone(),
            Arc::new(NeverApprover),
            Some(Duration::from_millis(10)),
            true,
        );
        let domain = DomainId::new("siteA");
        let mut res = RpcResponse::new();

        coordinator
            .handle_request_permissions(&grants, &domain, &request_for(json!({ "write": {} })), &mut res)
            .await;

        assert_eq!(res.error.as_ref().unwrap().code, 5);
        assert!(store.pending_requests().unwrap().is_empty());
    }
}
