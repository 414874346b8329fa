//! Warden Store - the observable permission store
//!
//! Holds the engine state (domain permission map, pending approval tickets,
//! method descriptions) behind interior mutability and pushes a full-state
//! snapshot to subscribers on every mutation, so an external persistence
//! layer can write through without polling.

#![deny(unsafe_code)]

pub mod store;

pub use store::{PermissionStore, StoreError};
