use std::sync::Arc;

use crate::config::{Environment, PropertyResolver};
use crate::definitions::DefinitionRegistry;
use crate::errors::ContextResult;

/// Point of the expansion at which a condition is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionPhase {
    /// While a source is parsed; a failing condition drops the whole source
    ParseSource,
    /// While derived definitions are registered; the source itself is still parsed
    RegisterDefinition,
}

/// Conditional-inclusion rule attached to a source or factory method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Property present (and equal to `having`, when given)
    OnProperty {
        key: String,
        having: Option<String>,
        phase: ConditionPhase,
    },
    /// Active profile is one of `profiles`
    OnProfile {
        profiles: Vec<Environment>,
        phase: ConditionPhase,
    },
    /// No definition named `name` is registered yet; always a registration-phase check
    OnMissingDefinition { name: String },
}

impl Condition {
    pub fn on_property(key: impl Into<String>) -> Self {
        Condition::OnProperty {
            key: key.into(),
            having: None,
            phase: ConditionPhase::ParseSource,
        }
    }

    pub fn on_property_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::OnProperty {
            key: key.into(),
            having: Some(value.into()),
            phase: ConditionPhase::ParseSource,
        }
    }

    pub fn on_profile(profiles: impl IntoIterator<Item = Environment>) -> Self {
        Condition::OnProfile {
            profiles: profiles.into_iter().collect(),
            phase: ConditionPhase::ParseSource,
        }
    }

    pub fn on_missing_definition(name: impl Into<String>) -> Self {
        Condition::OnMissingDefinition { name: name.into() }
    }

    /// Move the condition to the registration phase
    pub fn at_registration(self) -> Self {
        match self {
            Condition::OnProperty { key, having, .. } => Condition::OnProperty {
                key,
                having,
                phase: ConditionPhase::RegisterDefinition,
            },
            Condition::OnProfile { profiles, .. } => Condition::OnProfile {
                profiles,
                phase: ConditionPhase::RegisterDefinition,
            },
            other => other,
        }
    }

    pub fn phase(&self) -> ConditionPhase {
        match self {
            Condition::OnProperty { phase, .. } | Condition::OnProfile { phase, .. } => *phase,
            Condition::OnMissingDefinition { .. } => ConditionPhase::RegisterDefinition,
        }
    }
}

/// Evaluates conditions against the property resolver and the registry
#[derive(Clone)]
pub struct ConditionEvaluator {
    resolver: Arc<dyn PropertyResolver>,
}

impl ConditionEvaluator {
    pub fn new(resolver: Arc<dyn PropertyResolver>) -> Self {
        Self { resolver }
    }

    /// Whether any condition belonging to `phase` fails
    pub fn should_skip(
        &self,
        conditions: &[Condition],
        phase: ConditionPhase,
        registry: &DefinitionRegistry,
    ) -> ContextResult<bool> {
        for condition in conditions.iter().filter(|c| c.phase() == phase) {
            if !self.matches(condition, registry)? {
                tracing::debug!("Condition {:?} did not match during {:?}", condition, phase);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn matches(&self, condition: &Condition, registry: &DefinitionRegistry) -> ContextResult<bool> {
        Ok(match condition {
            Condition::OnProperty { key, having, .. } => match (self.resolver.property(key), having) {
                (Some(value), Some(expected)) => value.eq_ignore_ascii_case(expected),
                (Some(_), None) => true,
                (None, _) => false,
            },
            Condition::OnProfile { profiles, .. } => profiles.contains(&self.resolver.profile()),
            Condition::OnMissingDefinition { name } => !registry.contains(name)?,
        })
    }
}

impl std::fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("profile", &self.resolver.profile())
            .finish()
    }
}
