use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::DomainId;
use crate::permission::Permission;
use crate::request::PermissionsRequest;

/// One domain's slice of the permission map, insertion-ordered.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub permissions: Vec<Permission>,
}

impl DomainEntry {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Human-readable description of a restricted method, derived from the
/// registry at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodDescription {
    pub method: String,
    pub description: String,
}

/// The complete serializable engine state. This is the snapshot shape emitted
/// to persistence subscribers and accepted back at construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineState {
    pub domains: HashMap<DomainId, DomainEntry>,
    pub permissions_requests: Vec<PermissionsRequest>,
    pub permissions_descriptions: Vec<MethodDescription>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }
}
