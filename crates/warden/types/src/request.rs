use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::DomainId;
use crate::permission::Caveat;

/// The requested shape of a single permission: optional caveats to attach.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestedPermission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<Vec<Caveat>>,
}

impl RequestedPermission {
    pub fn bare() -> Self {
        Self::default()
    }

    pub fn with_caveats(caveats: Vec<Caveat>) -> Self {
        Self {
            caveats: Some(caveats),
        }
    }
}

/// Map from method name to its requested shape, as carried by
/// `requestPermissions` params and approval results.
pub type RequestedPermissions = HashMap<String, RequestedPermission>;

/// Identity of a pending approval ticket. `id` is unique across pending
/// tickets and is the removal key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMetadata {
    pub id: String,
    pub origin: DomainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_title: Option<String>,
}

/// A pending user-approval ticket: which domain asked for what.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionsRequest {
    pub origin: DomainId,
    pub metadata: TicketMetadata,
    pub options: RequestedPermissions,
}

impl PermissionsRequest {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

/// Wire shape accepted wherever a caller names a method to grant or revoke:
/// either the bare method name or a permission-shaped object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodTarget {
    Name(String),
    Shaped { method: String },
}

impl MethodTarget {
    pub fn method(&self) -> &str {
        match self {
            MethodTarget::Name(name) => name,
            MethodTarget::Shaped { method } => method,
        }
    }
}
