use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainId;

/// No permission resolves for the caller, or a granter/revoker check failed.
pub const UNAUTHORIZED_CODE: i64 = 1;
/// The user declined an approval flow.
pub const USER_REJECTED_CODE: i64 = 5;
/// A permission names a method absent from the registry.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;
/// Meta-method params did not have the documented shape.
pub const INVALID_PARAMS_CODE: i64 = -32602;

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized to perform action. \
    Try requesting permission first using the `requestPermissions` method.";
const USER_REJECTED_MESSAGE: &str = "User rejected the request.";
const METHOD_NOT_FOUND_MESSAGE: &str = "Method not found";

/// Caller-supplied hints for an approval ticket; missing fields are filled
/// from the caller domain when the ticket is opened.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<DomainId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_title: Option<String>,
}

/// An RPC request as seen by the permission layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RequestMetadata>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params: None,
            metadata: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// The mutable response slot threaded through the middleware chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn new() -> Self {
        Self::default()
    }
}

/// How a handler leaves the middleware chain: pass the request on untouched,
/// or terminate it with the current response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Next,
    End,
}

impl Disposition {
    pub fn is_end(&self) -> bool {
        matches!(self, Disposition::End)
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// The offending request rides along as `data` so callers can see what
    /// to ask approval for.
    pub fn unauthorized(req: &RpcRequest) -> Self {
        Self {
            code: UNAUTHORIZED_CODE,
            message: UNAUTHORIZED_MESSAGE.to_string(),
            data: serde_json::to_value(req).ok(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, USER_REJECTED_MESSAGE)
    }

    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND_CODE, METHOD_NOT_FOUND_MESSAGE)
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS_CODE, format!("Invalid params: {}", detail.into()))
    }

    /// An unexpected internal failure, surfaced with its original message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(UNAUTHORIZED_CODE, message)
    }
}
