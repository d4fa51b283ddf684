use serde::{Deserialize, Serialize};

use crate::errors::ContextError;

/// Lifetime of objects built from a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectScope {
    /// Single cached instance per factory
    Singleton,
    /// New instance for every lookup
    Prototype,
}

impl ObjectScope {
    pub fn is_singleton(&self) -> bool {
        matches!(self, ObjectScope::Singleton)
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self, ObjectScope::Prototype)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectScope::Singleton => "singleton",
            ObjectScope::Prototype => "prototype",
        }
    }
}

impl Default for ObjectScope {
    fn default() -> Self {
        ObjectScope::Singleton
    }
}

impl std::fmt::Display for ObjectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ObjectScope {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "singleton" => Ok(ObjectScope::Singleton),
            "prototype" | "transient" => Ok(ObjectScope::Prototype),
            _ => Err(ContextError::config_value("scope", s, "singleton or prototype")),
        }
    }
}

/// Whether objects of a definition are exposed through a scoped proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopedProxyMode {
    /// Defer to the container-wide default, which is `No`
    Default,
    /// No scoped proxy
    No,
    /// Interface-based proxy over every interface the target type exposes
    Interfaces,
    /// Concrete-type proxy
    TargetType,
}

impl ScopedProxyMode {
    /// Resolve `Default` to the effective mode
    pub fn effective(&self) -> ScopedProxyMode {
        match self {
            ScopedProxyMode::Default => ScopedProxyMode::No,
            other => *other,
        }
    }

    pub fn is_proxied(&self) -> bool {
        !matches!(self.effective(), ScopedProxyMode::No)
    }
}

impl Default for ScopedProxyMode {
    fn default() -> Self {
        ScopedProxyMode::Default
    }
}

/// Role hint distinguishing application objects from container plumbing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Normal,
    Infrastructure,
}

impl Default for Role {
    fn default() -> Self {
        Role::Normal
    }
}
