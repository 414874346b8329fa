use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::resolver::DelegationResolver;
use warden_store::PermissionStore;
use warden_types::{
    Disposition, DomainId, Granter, MethodTarget, Permission, RequestedPermissions, RpcError,
    RpcRequest, RpcResponse,
};

/// Issues and withdraws permission records.
///
/// The only writer of domain entries. Upserts are keyed by `(method,
/// granter)`: granting the same slot again replaces the old record, so a
/// domain never holds two records for one slot.
pub struct GrantEngine {
    store: Arc<PermissionStore>,
}

impl GrantEngine {
    pub(crate) fn new(store: Arc<PermissionStore>) -> Self {
        Self { store }
    }

    /// Upsert `new_permissions` into the domain's entry.
    ///
    /// Records lacking an id are stamped with a fresh id and the current
    /// time. When the batch itself carries duplicate keys, the last
    /// occurrence wins.
    pub fn add_permissions_for(
        &self,
        domain: &DomainId,
        new_permissions: Vec<Permission>,
    ) -> Result<(), EngineError> {
        let mut staged: Vec<Permission> = Vec::with_capacity(new_permissions.len());
        for permission in new_permissions {
            staged.retain(|p| !p.same_key(&permission));
            staged.push(permission);
        }
        for permission in &mut staged {
            if permission.id.is_empty() {
                permission.id = uuid::Uuid::new_v4().to_string();
                permission.date = Utc::now();
            }
        }

        let mut entry = self.store.get_domain_settings(domain)?;
        entry
            .permissions
            .retain(|existing| !staged.iter().any(|p| p.same_key(existing)));
        for permission in &staged {
            info!(
                domain = %domain,
                method = %permission.method,
                granter = %permission.granter,
                "permission granted"
            );
        }
        entry.permissions.extend(staged);
        self.store.set_domain(domain, entry)?;
        Ok(())
    }

    /// Remove every permission of the domain matching a `(method, granter)`
    /// key in `to_remove`.
    pub fn remove_permissions_for(
        &self,
        domain: &DomainId,
        to_remove: &[Permission],
    ) -> Result<(), EngineError> {
        let mut entry = self.store.get_domain_settings(domain)?;
        entry.permissions.retain(|existing| {
            let removed = to_remove.iter().any(|p| p.same_key(existing));
            if removed {
                info!(
                    domain = %domain,
                    method = %existing.method,
                    granter = %existing.granter,
                    "permission revoked"
                );
            }
            !removed
        });
        self.store.set_domain(domain, entry)?;
        Ok(())
    }

    /// Issue root-granted permissions for every method in `requested`,
    /// carrying the requested caveats. Returns the minted records.
    pub fn grant_root(
        &self,
        domain: &DomainId,
        requested: &RequestedPermissions,
    ) -> Result<Vec<Permission>, EngineError> {
        let minted: Vec<Permission> = requested
            .iter()
            .map(|(method, shape)| {
                Permission::new(method.clone(), Granter::User, shape.caveats.clone())
            })
            .collect();
        self.add_permissions_for(domain, minted.clone())?;
        Ok(minted)
    }

    /// The `grantPermissions` meta method: peer delegation.
    ///
    /// Params: `[grantee, requestedPerms]`. Every requested method must
    /// resolve for the caller; the first miss rejects the whole batch.
    /// Delegated records point back at the caller and copy the caveats of
    /// the caller's resolved permission.
    pub(crate) fn handle_grant_permissions(
        &self,
        resolver: &DelegationResolver,
        caller: &DomainId,
        req: &RpcRequest,
        res: &mut RpcResponse,
    ) -> Disposition {
        let (grantee, requested): (DomainId, Vec<MethodTarget>) =
            match parse_two_params(req, "expected [grantee, requestedPermissions]") {
                Ok(parsed) => parsed,
                Err(error) => {
                    res.error = Some(error);
                    return Disposition::End;
                }
            };

        // First occurrence of a method wins.
        let mut methods: Vec<&str> = Vec::new();
        for target in &requested {
            if !methods.contains(&target.method()) {
                methods.push(target.method());
            }
        }

        let mut staged = Vec::with_capacity(methods.len());
        for method in methods {
            let resolved = match resolver.resolve(caller, method) {
                Ok(found) => found,
                Err(err) => {
                    res.error = Some(RpcError::internal(err.to_string()));
                    return Disposition::End;
                }
            };
            let Some(own) = resolved else {
                warn!(caller = %caller, method, "delegation refused: caller holds no permission");
                res.error = Some(RpcError::unauthorized(req));
                return Disposition::End;
            };
            staged.push(Permission::new(
                method,
                Granter::Domain(caller.clone()),
                own.caveats.clone(),
            ));
        }

        if let Err(err) = self.add_permissions_for(&grantee, staged.clone()) {
            res.error = Some(err.into());
            return Disposition::End;
        }
        match serde_json::to_value(&staged) {
            Ok(value) => res.result = Some(value),
            Err(err) => res.error = Some(RpcError::internal(err.to_string())),
        }
        Disposition::End
    }

    /// The `revokePermissions` meta method.
    ///
    /// Params: `[assignedDomain, requestedPerms]`, each element a method name
    /// or a permission-shaped object. A caller may withdraw grants it issued,
    /// or its own self-root records; anything else rejects the whole batch.
    pub(crate) fn handle_revoke_permissions(
        &self,
        resolver: &DelegationResolver,
        caller: &DomainId,
        req: &RpcRequest,
        res: &mut RpcResponse,
    ) -> Disposition {
        let (assigned, targets): (DomainId, Vec<MethodTarget>) =
            match parse_two_params(req, "expected [assignedDomain, requestedPermissions]") {
                Ok(parsed) => parsed,
                Err(error) => {
                    res.error = Some(error);
                    return Disposition::End;
                }
            };

        let mut staged = Vec::with_capacity(targets.len());
        for target in &targets {
            let method = target.method();
            let found = match resolver.resolve_untraversed(&assigned, method, caller) {
                Ok(found) => found,
                Err(err) => {
                    res.error = Some(RpcError::internal(err.to_string()));
                    return Disposition::End;
                }
            };
            let authorized = found.as_ref().is_some_and(|p| {
                p.granter == Granter::Domain(caller.clone()) || assigned == *caller
            });
            let Some(permission) = found.filter(|_| authorized) else {
                warn!(caller = %caller, domain = %assigned, method, "revocation refused");
                res.error = Some(RpcError::unauthorized(req));
                return Disposition::End;
            };
            staged.push(permission);
        }

        if let Err(err) = self.remove_permissions_for(&assigned, &staged) {
            res.error = Some(err.into());
            return Disposition::End;
        }
        match serde_json::to_value(&staged) {
            Ok(value) => res.result = Some(value),
            Err(err) => res.error = Some(RpcError::internal(err.to_string())),
        }
        Disposition::End
    }
}

/// Pull a two-element positional params array out of the request.
fn parse_two_params<A, B>(req: &RpcRequest, expectation: &str) -> Result<(A, B), RpcError>
where
    A: serde::de::DeserializeOwned,
    B: serde::de::DeserializeOwned,
{
    let params = req
        .params
        .clone()
        .ok_or_else(|| RpcError::invalid_params(expectation))?;
    serde_json::from_value::<(A, B)>(params).map_err(|_| RpcError::invalid_params(expectation))
}
