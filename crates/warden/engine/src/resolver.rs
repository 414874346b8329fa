use std::sync::Arc;

use crate::error::EngineError;
use warden_store::PermissionStore;
use warden_types::{DomainId, Granter, Permission};

/// Default bound on delegation-chain length.
pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 32;

/// Walks delegation chains from a holder to the user-granted root.
///
/// A pure reader over the store. At each hop only the holder's *first*
/// permission for the method is considered, so lookup order is stable under
/// insertion order. Chains longer than the configured bound are reported as
/// errors rather than walked forever; a well-formed store never hits the
/// bound because every grant is anchored on the granter already holding the
/// capability.
pub struct DelegationResolver {
    store: Arc<PermissionStore>,
    max_depth: usize,
}

impl DelegationResolver {
    pub(crate) fn new(store: Arc<PermissionStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// The permission that authorizes `domain` to call `method`, if any.
    ///
    /// Returns the record at which the walk reached the root. `Ok(None)`
    /// means no permission (including a chain orphaned by revocation
    /// upstream); `Err` means the chain exceeded the depth bound.
    pub fn resolve(
        &self,
        domain: &DomainId,
        method: &str,
    ) -> Result<Option<Permission>, EngineError> {
        let mut holder = domain.clone();
        for _ in 0..=self.max_depth {
            let permission = self
                .store
                .get_permissions(&holder)?
                .into_iter()
                .find(|p| p.method == method);
            match permission {
                None => return Ok(None),
                Some(p) => match &p.granter {
                    Granter::User => return Ok(Some(p)),
                    Granter::Domain(granter) => holder = granter.clone(),
                },
            }
        }
        Err(EngineError::DelegationDepthExceeded {
            method: method.to_string(),
            limit: self.max_depth,
        })
    }

    /// The permission of `domain` for `method` as granted by `granter`,
    /// without walking the chain.
    ///
    /// Asking about one's own domain selects the self-root record (granter
    /// `"user"`); anything else matches the granter exactly. This is how
    /// revocation locates the specific grant the revoker issued.
    pub fn resolve_untraversed(
        &self,
        domain: &DomainId,
        method: &str,
        granter: &DomainId,
    ) -> Result<Option<Permission>, EngineError> {
        let wanted = if granter == domain {
            Granter::User
        } else {
            Granter::Domain(granter.clone())
        };
        Ok(self
            .store
            .get_permissions(domain)?
            .into_iter()
            .find(|p| p.method == method && p.granter == wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::DomainEntry;

    fn store_with(entries: &[(&str, Vec<Permission>)]) -> Arc<PermissionStore> {
        let store = Arc::new(PermissionStore::new(vec![]));
        for (domain, permissions) in entries {
            store
                .set_domain(
                    &DomainId::new(*domain),
                    DomainEntry {
                        permissions: permissions.clone(),
                    },
                )
                .unwrap();
        }
        store
    }

    fn delegated(method: &str, granter: &str) -> Permission {
        Permission::new(method, Granter::Domain(DomainId::new(granter)), None)
    }

    fn root(method: &str) -> Permission {
        Permission::new(method, Granter::User, None)
    }

    #[test]
    fn resolves_a_direct_root_grant() {
        let store = store_with(&[("siteA", vec![root("write")])]);
        let resolver = DelegationResolver::new(store, DEFAULT_MAX_DELEGATION_DEPTH);
        let permission = resolver
            .resolve(&DomainId::new("siteA"), "write")
            .unwrap()
            .unwrap();
        assert!(permission.granter.is_root());
    }

    #[test]
    fn walks_a_delegation_chain_to_the_root_record() {
        let store = store_with(&[
            ("siteA", vec![root("write")]),
            ("siteB", vec![delegated("write", "siteA")]),
            ("siteC", vec![delegated("write", "siteB")]),
        ]);
        let resolver = DelegationResolver::new(store, DEFAULT_MAX_DELEGATION_DEPTH);
        let permission = resolver
            .resolve(&DomainId::new("siteC"), "write")
            .unwrap()
            .unwrap();
        assert!(permission.granter.is_root());
    }

    #[test]
    fn orphaned_chain_resolves_to_none() {
        // siteB's granter no longer holds the capability.
        let store = store_with(&[("siteB", vec![delegated("write", "siteA")])]);
        let resolver = DelegationResolver::new(store, DEFAULT_MAX_DELEGATION_DEPTH);
        assert!(resolver
            .resolve(&DomainId::new("siteB"), "write")
            .unwrap()
            .is_none());
    }

    #[test]
    fn unrelated_methods_do_not_resolve() {
        let store = store_with(&[("siteA", vec![root("write")])]);
        let resolver = DelegationResolver::new(store, DEFAULT_MAX_DELEGATION_DEPTH);
        assert!(resolver
            .resolve(&DomainId::new("siteA"), "read")
            .unwrap()
            .is_none());
    }

    #[test]
    fn cyclic_chains_hit_the_depth_bound() {
        let store = store_with(&[
            ("siteA", vec![delegated("write", "siteB")]),
            ("siteB", vec![delegated("write", "siteA")]),
        ]);
        let resolver = DelegationResolver::new(store, 8);
        let err = resolver.resolve(&DomainId::new("siteA"), "write").unwrap_err();
        assert!(matches!(
            err,
            EngineError::DelegationDepthExceeded { limit: 8, .. }
        ));
    }

    #[test]
    fn untraversed_lookup_selects_self_root_or_exact_granter() {
        let site_b = DomainId::new("siteB");
        let store = store_with(&[
            ("siteA", vec![root("write")]),
            ("siteB", vec![delegated("write", "siteA"), root("read")]),
        ]);
        let resolver = DelegationResolver::new(store, DEFAULT_MAX_DELEGATION_DEPTH);

        // Granter == domain selects the self-root record.
        let own = resolver
            .resolve_untraversed(&site_b, "read", &site_b)
            .unwrap()
            .unwrap();
        assert!(own.granter.is_root());

        // The delegated record is only visible to its actual granter.
        assert!(resolver
            .resolve_untraversed(&site_b, "write", &site_b)
            .unwrap()
            .is_none());
        let granted = resolver
            .resolve_untraversed(&site_b, "write", &DomainId::new("siteA"))
            .unwrap()
            .unwrap();
        assert_eq!(granted.granter.domain().unwrap().as_str(), "siteA");
    }
}
