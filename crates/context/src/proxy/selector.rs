use serde::{Deserialize, Serialize};

use crate::errors::{ContextError, ContextResult};
use crate::metadata::TypeKind;

/// Interfaces the container itself adds to proxies; they never count as user interfaces
pub const MARKER_INTERFACES: &[&str] = &[
    "elif::context::proxy::ContainerProxy",
    "elif::context::proxy::ScopedObject",
];

pub fn is_marker_interface(name: &str) -> bool {
    MARKER_INTERFACES.contains(&name)
}

/// How an intercepting surrogate is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyStrategy {
    /// Surrogate derived from the concrete target type
    ConcreteType,
    /// Surrogate exposing only the target's interfaces
    Interface,
}

impl ProxyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyStrategy::ConcreteType => "concrete_type",
            ProxyStrategy::Interface => "interface",
        }
    }
}

impl std::fmt::Display for ProxyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target type of a proxy, as far as the selector needs to know it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub type_name: String,
    pub kind: TypeKind,
}

impl ProxyTarget {
    pub fn new(type_name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
        }
    }
}

/// Inputs to the strategy decision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySpec {
    pub target: Option<ProxyTarget>,
    pub interfaces: Vec<String>,
    pub force_optimize: bool,
    pub force_concrete_type: bool,
}

impl ProxySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_target(type_name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            target: Some(ProxyTarget::new(type_name, kind)),
            ..Self::default()
        }
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_interfaces(mut self, interfaces: impl IntoIterator<Item = String>) -> Self {
        self.interfaces.extend(interfaces);
        self
    }

    pub fn optimize(mut self) -> Self {
        self.force_optimize = true;
        self
    }

    pub fn concrete_type(mut self) -> Self {
        self.force_concrete_type = true;
        self
    }

    /// True when no interface, or only container marker interfaces, were supplied
    pub fn has_no_user_interfaces(&self) -> bool {
        self.interfaces.iter().all(|i| is_marker_interface(i))
    }
}

/// Chooses a proxy strategy for a target specification
pub trait ProxyStrategySelector: Send + Sync {
    fn select(&self, spec: &ProxySpec) -> ContextResult<ProxyStrategy>;
}

/// Stateless selector: concrete-type proxies when forced or when there is nothing
/// but marker interfaces, interface proxies otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProxyStrategySelector;

impl ProxyStrategySelector for DefaultProxyStrategySelector {
    fn select(&self, spec: &ProxySpec) -> ContextResult<ProxyStrategy> {
        if !(spec.force_optimize || spec.force_concrete_type || spec.has_no_user_interfaces()) {
            return Ok(ProxyStrategy::Interface);
        }

        let target = spec.target.as_ref().ok_or_else(|| {
            ContextError::configuration(
                "Cannot determine target class for proxy creation: either an interface or a target is required",
            )
        })?;

        match target.kind {
            TypeKind::Interface | TypeKind::GeneratedProxy => Ok(ProxyStrategy::Interface),
            TypeKind::Concrete => Ok(ProxyStrategy::ConcreteType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(spec: ProxySpec) -> ContextResult<ProxyStrategy> {
        DefaultProxyStrategySelector.select(&spec)
    }

    #[test]
    fn test_no_interfaces_selects_concrete_type() {
        let spec = ProxySpec::for_target("app::OrderService", TypeKind::Concrete);
        assert_eq!(select(spec).unwrap(), ProxyStrategy::ConcreteType);
    }

    #[test]
    fn test_marker_interfaces_count_as_none() {
        let spec = ProxySpec::for_target("app::OrderService", TypeKind::Concrete)
            .with_interface(MARKER_INTERFACES[0]);
        assert_eq!(select(spec).unwrap(), ProxyStrategy::ConcreteType);
    }

    #[test]
    fn test_user_interface_selects_interface_strategy() {
        let spec = ProxySpec::for_target("app::OrderService", TypeKind::Concrete)
            .with_interface("app::Orders")
            .with_interface(MARKER_INTERFACES[1]);
        assert_eq!(select(spec).unwrap(), ProxyStrategy::Interface);
    }

    #[test]
    fn test_force_flags_override_user_interfaces() {
        let optimized = ProxySpec::for_target("app::OrderService", TypeKind::Concrete)
            .with_interface("app::Orders")
            .optimize();
        let concrete = ProxySpec::for_target("app::OrderService", TypeKind::Concrete)
            .with_interface("app::Orders")
            .concrete_type();

        assert_eq!(select(optimized).unwrap(), ProxyStrategy::ConcreteType);
        assert_eq!(select(concrete).unwrap(), ProxyStrategy::ConcreteType);
    }

    #[test]
    fn test_interface_or_generated_target_falls_back_to_interface() {
        let interface = ProxySpec::for_target("app::Orders", TypeKind::Interface).concrete_type();
        let generated = ProxySpec::for_target("Proxy$12", TypeKind::GeneratedProxy);

        assert_eq!(select(interface).unwrap(), ProxyStrategy::Interface);
        assert_eq!(select(generated).unwrap(), ProxyStrategy::Interface);
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let err = select(ProxySpec::new()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Cannot determine target class"));
    }

    #[test]
    fn test_decision_is_repeatable() {
        let spec = ProxySpec::for_target("app::OrderService", TypeKind::Concrete).with_interface("app::Orders");
        let first = select(spec.clone()).unwrap();
        for _ in 0..3 {
            assert_eq!(select(spec.clone()).unwrap(), first);
        }
    }
}
