use serde::{Deserialize, Serialize};

/// Reserved granter identifier naming the user as the root of authority.
///
/// No caller domain may ever carry this identifier.
pub const USER_GRANTER: &str = "user";

/// Opaque identifier for a requesting agent (an origin, an extension, a
/// session). Compared by exact equality, never interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainId(pub String);

impl DomainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier is acceptable as a caller domain.
    ///
    /// The empty string carries no identity and [`USER_GRANTER`] is reserved
    /// for root grants.
    pub fn is_valid_caller(&self) -> bool {
        !self.0.is_empty() && self.0 != USER_GRANTER
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DomainId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Who conferred a permission: the user (root) or another domain (delegated).
///
/// Serialized as a bare string; [`USER_GRANTER`] maps to [`Granter::User`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Granter {
    User,
    Domain(DomainId),
}

impl Granter {
    pub fn is_root(&self) -> bool {
        matches!(self, Granter::User)
    }

    /// The delegating domain, if this is not a root grant.
    pub fn domain(&self) -> Option<&DomainId> {
        match self {
            Granter::User => None,
            Granter::Domain(d) => Some(d),
        }
    }
}

impl From<String> for Granter {
    fn from(s: String) -> Self {
        if s == USER_GRANTER {
            Granter::User
        } else {
            Granter::Domain(DomainId(s))
        }
    }
}

impl From<Granter> for String {
    fn from(g: Granter) -> Self {
        match g {
            Granter::User => USER_GRANTER.to_string(),
            Granter::Domain(d) => d.0,
        }
    }
}

impl From<DomainId> for Granter {
    fn from(d: DomainId) -> Self {
        Granter::Domain(d)
    }
}

impl std::fmt::Display for Granter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granter::User => write!(f, "{USER_GRANTER}"),
            Granter::Domain(d) => write!(f, "{d}"),
        }
    }
}
