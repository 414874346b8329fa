//! Warden Types - data model for the permission layer
//!
//! Everything that crosses a boundary lives here: domain identifiers,
//! permission records with their granter backpointers, pending approval
//! tickets, the serializable engine state, and the JSON-RPC wire types.

#![deny(unsafe_code)]

pub mod domain;
pub mod permission;
pub mod request;
pub mod rpc;
pub mod state;

pub use domain::{DomainId, Granter, USER_GRANTER};
pub use permission::{Caveat, Permission, STATIC_CAVEAT};
pub use request::{
    MethodTarget, PermissionsRequest, RequestedPermission, RequestedPermissions, TicketMetadata,
};
pub use rpc::{
    Disposition, RequestMetadata, RpcError, RpcRequest, RpcResponse, INVALID_PARAMS_CODE,
    METHOD_NOT_FOUND_CODE, UNAUTHORIZED_CODE, USER_REJECTED_CODE,
};
pub use state::{DomainEntry, EngineState, MethodDescription};
