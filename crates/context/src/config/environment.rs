use std::collections::HashMap;

use crate::config::{ConfigSource, Environment};

/// Read-only key/value lookup consulted while parsing configuration sources
pub trait PropertyResolver: Send + Sync {
    /// Resolve a property, `None` when absent
    fn property(&self, key: &str) -> Option<String>;

    /// The active profile
    fn profile(&self) -> Environment;

    fn contains_property(&self, key: &str) -> bool {
        self.property(key).is_some()
    }
}

/// Profile plus an in-memory property map, optionally seeded from the process environment
#[derive(Debug, Clone, Default)]
pub struct StandardEnvironment {
    profile: Environment,
    properties: HashMap<String, (String, ConfigSource)>,
}

impl StandardEnvironment {
    pub fn new(profile: Environment) -> Self {
        Self {
            profile,
            properties: HashMap::new(),
        }
    }

    /// Seed properties from every process environment variable
    pub fn from_process_env(profile: Environment) -> Self {
        let mut environment = Self::new(profile);
        for (key, value) in std::env::vars() {
            environment
                .properties
                .insert(key.clone(), (value, ConfigSource::EnvVar(key)));
        }
        environment
    }

    /// Add a property; later values replace earlier ones
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .insert(key.into(), (value.into(), ConfigSource::Programmatic));
    }

    /// Where a property value came from
    pub fn property_source(&self, key: &str) -> Option<&ConfigSource> {
        self.properties.get(key).map(|(_, source)| source)
    }
}

impl PropertyResolver for StandardEnvironment {
    fn property(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(|(value, _)| value.clone())
    }

    fn profile(&self) -> Environment {
        self.profile
    }
}
