//! Warden Engine - the permission engine behind the RPC surface
//!
//! Sits in a middleware chain and decides, per request, whether the calling
//! domain may invoke the requested method. Safe methods pass through
//! untouched; the built-in meta methods (`getPermissions`,
//! `requestPermissions`, `grantPermissions`, `revokePermissions`) manage the
//! permission store over the same surface; everything else must resolve a
//! permission whose delegation chain roots at a user grant.
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden_engine::{Disposition, PermissionEngine};
//! use warden_types::{DomainId, RpcRequest, RpcResponse};
//!
//! # async fn demo(approver: Arc<dyn warden_engine::ApprovalHandler>,
//! #               handler: Arc<dyn warden_engine::MethodHandler>) {
//! let engine = PermissionEngine::builder()
//!     .with_safe_methods(["ping"])
//!     .with_restricted_method("write", "Write to the store", handler)
//!     .with_approval_handler(approver)
//!     .build()
//!     .expect("approval handler supplied");
//!
//! let domain = DomainId::new("site.example");
//! let req = RpcRequest::new("write");
//! let mut res = RpcResponse::new();
//! match engine.handle(&domain, &req, &mut res).await {
//!     Disposition::Next => { /* forward to the next middleware */ }
//!     Disposition::End => { /* res carries the terminal result or error */ }
//! }
//! # }
//! ```

#![deny(unsafe_code)]

pub mod approval;
pub mod config;
pub mod engine;
pub mod error;
pub mod grants;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod traits;

mod executor;

pub use config::EngineBuilder;
pub use engine::PermissionEngine;
pub use error::EngineError;
pub use registry::{MethodRegistry, RestrictedMethod};
pub use traits::{ApprovalError, ApprovalHandler, ApprovedPermissions, MethodHandler};

pub use warden_types::Disposition;
