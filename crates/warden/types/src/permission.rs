use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Granter;

/// Caveat type whose presence short-circuits execution with a fixed value.
pub const STATIC_CAVEAT: &str = "static";

/// A typed restriction attached to a permission.
///
/// Only [`STATIC_CAVEAT`] has built-in semantics; other types are preserved
/// verbatim for interpretation by restricted-method implementations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Caveat {
    #[serde(rename = "type")]
    pub caveat_type: String,
    pub value: Value,
}

impl Caveat {
    pub fn new(caveat_type: impl Into<String>, value: Value) -> Self {
        Self {
            caveat_type: caveat_type.into(),
            value,
        }
    }

    /// A caveat that fixes the method result to `value`.
    pub fn fixed(value: Value) -> Self {
        Self::new(STATIC_CAVEAT, value)
    }

    pub fn is_static(&self) -> bool {
        self.caveat_type == STATIC_CAVEAT
    }
}

/// An immutable record authorizing one domain to invoke one method.
///
/// The pair `(method, granter)` is the natural key: a domain holds at most
/// one permission per pair, and upserts replace by it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub method: String,
    pub granter: Granter,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<Vec<Caveat>>,
}

impl Permission {
    /// Mint a permission with a fresh id and the current timestamp.
    pub fn new(method: impl Into<String>, granter: Granter, caveats: Option<Vec<Caveat>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method: method.into(),
            granter,
            date: Utc::now(),
            caveats,
        }
    }

    /// Whether `other` occupies the same `(method, granter)` slot.
    pub fn same_key(&self, other: &Permission) -> bool {
        self.method == other.method && self.granter == other.granter
    }

    /// The value of the last `"static"` caveat, if any.
    pub fn static_caveat_value(&self) -> Option<&Value> {
        self.caveats
            .as_deref()?
            .iter()
            .rev()
            .find(|c| c.is_static())
            .map(|c| &c.value)
    }
}
