use thiserror::Error;

use crate::errors::Problem;

/// Bootstrap phase a post-processor callback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Registry-mutating callback
    Registry,
    /// Factory (definition rewrite) callback
    Factory,
    /// Whole-context refresh
    Refresh,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Registry => "registry",
            Phase::Factory => "factory",
            Phase::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Core error type for the elif context bootstrap
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Configuration error: {message}{}", format_problems(.problems))]
    Configuration {
        message: String,
        problems: Vec<Problem>,
    },

    #[error("{phase} phase already invoked by '{extension}' against {target}")]
    DuplicateInvocation {
        phase: Phase,
        extension: String,
        target: String,
    },

    #[error("No definition named '{name}'")]
    DefinitionNotFound { name: String },

    #[error("Object '{name}' is currently in creation: is there an unresolvable circular reference?")]
    CurrentlyInCreation { name: String },

    #[error("Creating object '{name}' failed: {source}")]
    ObjectCreation {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Object '{name}' is not a {expected}")]
    UnexpectedInstance { name: String, expected: String },

    #[error("Invalid value for '{field}': '{value}'. Expected: {expected}")]
    ConfigValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_problems(problems: &[Problem]) -> String {
    if problems.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = problems.iter().map(|p| format!("\n  - {}", p)).collect();
    lines.concat()
}

impl ContextError {
    /// Create a configuration error without collected problems
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            problems: Vec::new(),
        }
    }

    /// Create a configuration error carrying every problem found in a parse pass
    pub fn configuration_problems(message: impl Into<String>, problems: Vec<Problem>) -> Self {
        Self::Configuration {
            message: message.into(),
            problems,
        }
    }

    pub fn duplicate_invocation(
        phase: Phase,
        extension: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::DuplicateInvocation {
            phase,
            extension: extension.into(),
            target: target.into(),
        }
    }

    pub fn definition_not_found(name: impl Into<String>) -> Self {
        Self::DefinitionNotFound { name: name.into() }
    }

    pub fn currently_in_creation(name: impl Into<String>) -> Self {
        Self::CurrentlyInCreation { name: name.into() }
    }

    pub fn unexpected_instance(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::UnexpectedInstance {
            name: name.into(),
            expected: expected.into(),
        }
    }

    /// Wrap an arbitrary failure raised while building an object
    pub fn creation_failed(
        name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ObjectCreation {
            name: name.into(),
            source: Box::new(source),
        }
    }

    pub fn config_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::ConfigValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn lock(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Check if the error is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Check if the error is a duplicate phase invocation
    pub fn is_duplicate_invocation(&self) -> bool {
        matches!(self, Self::DuplicateInvocation { .. })
    }

    /// Check if the error, or the creation failure it wraps, is an in-creation conflict
    pub fn is_currently_in_creation(&self) -> bool {
        self.in_creation_name().is_some()
    }

    /// Name of the object whose in-progress construction caused this error, if any
    pub fn in_creation_name(&self) -> Option<&str> {
        match self {
            Self::CurrentlyInCreation { name } => Some(name),
            Self::ObjectCreation { source, .. } => source
                .downcast_ref::<ContextError>()
                .and_then(|inner| inner.in_creation_name()),
            _ => None,
        }
    }

    /// Problems collected during a parse pass (empty for other errors)
    pub fn problems(&self) -> &[Problem] {
        match self {
            Self::Configuration { problems, .. } => problems,
            _ => &[],
        }
    }
}
