use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use warden_types::{
    DomainEntry, DomainId, EngineState, MethodDescription, Permission, PermissionsRequest,
};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("permission store lock poisoned")]
    LockPoisoned,
}

/// Observable in-memory store for the full engine state.
///
/// All writes go through this type. Each mutation pushes a snapshot to every
/// live subscriber; subscribers that have gone away are pruned on the next
/// notification.
pub struct PermissionStore {
    state: RwLock<EngineState>,
    subscribers: RwLock<Vec<mpsc::UnboundedSender<EngineState>>>,
}

impl PermissionStore {
    /// An empty store carrying the given method descriptions.
    pub fn new(descriptions: Vec<MethodDescription>) -> Self {
        Self::from_snapshot(EngineState::new(), descriptions)
    }

    /// Rehydrate from a snapshot. The descriptions are always taken from the
    /// current registry, not the snapshot; a method removed from the registry
    /// leaves its permissions orphaned until they fail at execution.
    pub fn from_snapshot(mut state: EngineState, descriptions: Vec<MethodDescription>) -> Self {
        state.permissions_descriptions = descriptions;
        Self {
            state: RwLock::new(state),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Current state, by value.
    pub fn snapshot(&self) -> Result<EngineState, StoreError> {
        Ok(self.read()?.clone())
    }

    /// Receive a snapshot after every mutation.
    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<EngineState>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(tx);
        Ok(rx)
    }

    pub fn get_domains(&self) -> Result<HashMap<DomainId, DomainEntry>, StoreError> {
        Ok(self.read()?.domains.clone())
    }

    pub fn set_domains(&self, domains: HashMap<DomainId, DomainEntry>) -> Result<(), StoreError> {
        self.write()?.domains = domains;
        self.notify()
    }

    /// The domain's entry, or an empty one if the domain is unknown. Pure
    /// read: nothing is committed until a subsequent [`set_domain`].
    ///
    /// [`set_domain`]: PermissionStore::set_domain
    pub fn get_domain_settings(&self, domain: &DomainId) -> Result<DomainEntry, StoreError> {
        Ok(self.read()?.domains.get(domain).cloned().unwrap_or_default())
    }

    pub fn set_domain(&self, domain: &DomainId, entry: DomainEntry) -> Result<(), StoreError> {
        debug!(domain = %domain, permissions = entry.permissions.len(), "domain entry updated");
        self.write()?.domains.insert(domain.clone(), entry);
        self.notify()
    }

    /// The domain's permission list (empty for unknown domains).
    pub fn get_permissions(&self, domain: &DomainId) -> Result<Vec<Permission>, StoreError> {
        Ok(self
            .read()?
            .domains
            .get(domain)
            .map(|entry| entry.permissions.clone())
            .unwrap_or_default())
    }

    pub fn descriptions(&self) -> Result<Vec<MethodDescription>, StoreError> {
        Ok(self.read()?.permissions_descriptions.clone())
    }

    pub fn pending_requests(&self) -> Result<Vec<PermissionsRequest>, StoreError> {
        Ok(self.read()?.permissions_requests.clone())
    }

    pub fn push_pending_request(&self, request: PermissionsRequest) -> Result<(), StoreError> {
        debug!(origin = %request.origin, id = request.id(), "approval ticket opened");
        self.write()?.permissions_requests.push(request);
        self.notify()
    }

    /// Remove a pending ticket by its metadata id, returning it if present.
    pub fn remove_pending_request(
        &self,
        id: &str,
    ) -> Result<Option<PermissionsRequest>, StoreError> {
        let removed = {
            let mut state = self.write()?;
            let index = state.permissions_requests.iter().position(|r| r.id() == id);
            index.map(|i| state.permissions_requests.remove(i))
        };
        if removed.is_some() {
            self.notify()?;
        }
        Ok(removed)
    }

    /// Drop every domain entry. Pending tickets and descriptions survive.
    pub fn clear_domains(&self) -> Result<(), StoreError> {
        self.write()?.domains.clear();
        self.notify()
    }

    fn notify(&self) -> Result<(), StoreError> {
        let snapshot = self.read()?.clone();
        self.subscribers
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, EngineState>, StoreError> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, EngineState>, StoreError> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}
