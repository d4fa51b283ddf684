use crate::config::ConfigSource;
use crate::errors::ContextError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::Path;
use std::str::FromStr;

pub const PROFILE_VAR: &str = "ELIF_PROFILE";
pub const ALLOW_OVERRIDING_VAR: &str = "ELIF_ALLOW_DEFINITION_OVERRIDING";
pub const EAGER_SINGLETONS_VAR: &str = "ELIF_EAGER_SINGLETONS";
pub const ENHANCE_SOURCES_VAR: &str = "ELIF_ENHANCE_SOURCES";
pub const LOG_SUMMARY_VAR: &str = "ELIF_LOG_SUMMARY";

/// Active profile of the bootstrapping application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ContextError::config_value(
                "profile",
                s,
                "development, testing, or production",
            )),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

/// Settings that steer a single bootstrap run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub profile: Environment,
    /// Whether re-registering an existing definition name with a different definition is allowed
    pub allow_definition_overriding: bool,
    /// Instantiate every non-lazy singleton at the end of refresh
    pub eager_singletons: bool,
    /// Rewrite full configuration sources into enhanced specifications
    pub enhance_sources: bool,
    /// Log a timing summary once refresh completes
    pub log_summary: bool,
    /// Settings read from a YAML document, mapped to that document's label
    #[serde(skip)]
    pub file_settings: BTreeMap<String, String>,
}

impl BootstrapConfig {
    pub fn new() -> Self {
        Self {
            profile: Environment::Development,
            allow_definition_overriding: true,
            eager_singletons: true,
            enhance_sources: true,
            log_summary: true,
            file_settings: BTreeMap::new(),
        }
    }

    /// Configuration suited to tests: no eager instantiation, no summary output
    pub fn testing() -> Self {
        Self {
            profile: Environment::Testing,
            eager_singletons: false,
            log_summary: false,
            ..Self::new()
        }
    }

    /// Production is strict about silently replaced definitions
    pub fn production() -> Self {
        Self {
            profile: Environment::Production,
            allow_definition_overriding: false,
            ..Self::new()
        }
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ContextError> {
        let mut config = Self::new();

        if let Ok(profile) = env::var(PROFILE_VAR) {
            config.profile = profile.parse()?;
        }
        if let Some(value) = read_flag(ALLOW_OVERRIDING_VAR)? {
            config.allow_definition_overriding = value;
        }
        if let Some(value) = read_flag(EAGER_SINGLETONS_VAR)? {
            config.eager_singletons = value;
        }
        if let Some(value) = read_flag(ENHANCE_SOURCES_VAR)? {
            config.enhance_sources = value;
        }
        if let Some(value) = read_flag(LOG_SUMMARY_VAR)? {
            config.log_summary = value;
        }

        Ok(config)
    }

    /// Load configuration from a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ContextError> {
        Self::from_yaml_labeled(yaml, "inline YAML")
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|err| {
            ContextError::configuration(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                err
            ))
        })?;
        Self::from_yaml_labeled(&yaml, &path.display().to_string())
    }

    fn from_yaml_labeled(yaml: &str, label: &str) -> Result<Self, ContextError> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let keys: Vec<String> = document
            .as_mapping()
            .map(|mapping| {
                mapping
                    .keys()
                    .filter_map(|key| key.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut config: Self = serde_yaml::from_value(document)?;
        config.file_settings = keys
            .into_iter()
            .map(|key| (key, label.to_string()))
            .collect();
        tracing::debug!(
            "Loaded {} bootstrap setting(s) from {}",
            config.file_settings.len(),
            label
        );
        Ok(config)
    }

    /// Report where each setting came from
    pub fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        let settings = [
            ("profile", PROFILE_VAR, self.profile.to_string()),
            (
                "allow_definition_overriding",
                ALLOW_OVERRIDING_VAR,
                self.allow_definition_overriding.to_string(),
            ),
            ("eager_singletons", EAGER_SINGLETONS_VAR, self.eager_singletons.to_string()),
            ("enhance_sources", ENHANCE_SOURCES_VAR, self.enhance_sources.to_string()),
            ("log_summary", LOG_SUMMARY_VAR, self.log_summary.to_string()),
        ];
        for (field, var, value) in settings {
            let source = if let Some(label) = self.file_settings.get(field) {
                ConfigSource::File(label.clone())
            } else if env::var(var).is_ok() {
                ConfigSource::EnvVar(var.to_string())
            } else {
                ConfigSource::Default(value)
            };
            sources.insert(field.to_string(), source);
        }
        sources
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn read_flag(var: &str) -> Result<Option<bool>, ContextError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ContextError::config_value(var, raw, "true or false")),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        for var in [
            PROFILE_VAR,
            ALLOW_OVERRIDING_VAR,
            EAGER_SINGLETONS_VAR,
            ENHANCE_SOURCES_VAR,
            LOG_SUMMARY_VAR,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_profile_parsing() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Testing".parse::<Environment>().unwrap(), Environment::Testing);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_vars();
        let config = BootstrapConfig::from_env().unwrap();
        assert_eq!(config, BootstrapConfig::new());
        assert!(config.config_sources()["profile"].is_default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_vars();
        env::set_var(PROFILE_VAR, "production");
        env::set_var(EAGER_SINGLETONS_VAR, "off");

        let config = BootstrapConfig::from_env().unwrap();
        assert_eq!(config.profile, Environment::Production);
        assert!(!config.eager_singletons);
        assert!(config.config_sources()["eager_singletons"].is_env_var());

        env::set_var(LOG_SUMMARY_VAR, "maybe");
        assert!(matches!(
            BootstrapConfig::from_env(),
            Err(ContextError::ConfigValue { .. })
        ));
        clear_vars();
    }

    #[test]
    fn test_from_yaml_keeps_defaults() {
        let config = BootstrapConfig::from_yaml_str(
            "profile: production\nallow_definition_overriding: false\n",
        )
        .unwrap();
        assert_eq!(config.profile, Environment::Production);
        assert!(!config.allow_definition_overriding);
        assert!(config.enhance_sources);
        assert!(config.eager_singletons);
    }

    #[test]
    #[serial]
    fn test_yaml_settings_report_file_source() {
        clear_vars();
        let config = BootstrapConfig::from_yaml_str("eager_singletons: false\n").unwrap();
        let sources = config.config_sources();

        assert!(sources["eager_singletons"].is_file());
        assert_eq!(
            sources["eager_singletons"],
            ConfigSource::File("inline YAML".to_string())
        );
        assert!(sources["profile"].is_default());
    }

    #[test]
    fn test_from_yaml_file_labels_settings_with_path() {
        let path = env::temp_dir().join(format!("elif-context-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "profile: production\n").unwrap();

        let config = BootstrapConfig::from_yaml_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.profile, Environment::Production);
        assert_eq!(
            config.config_sources()["profile"],
            ConfigSource::File(path.display().to_string())
        );
        assert!(BootstrapConfig::from_yaml_file(&path).unwrap_err().is_configuration());
    }
}
