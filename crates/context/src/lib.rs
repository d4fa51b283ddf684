//! Bootstrap orchestration for the elif.rs object container
//!
//! Extensions run in phased, tiered order against a definition registry;
//! configuration sources expand to a fixed point; creation interceptors are
//! registered tier by tier; proxies pick their strategy from the target shape.

pub mod bootstrap;
pub mod config;
pub mod definitions;
pub mod errors;
pub mod expansion;
pub mod extensions;
pub mod factory;
pub mod metadata;
pub mod pipeline;
pub mod proxy;

// Re-export key types for convenience
pub use bootstrap::{BootstrapBuilder, BootstrapContext, BootstrapStats};
pub use config::{BootstrapConfig, Environment, PropertyResolver, StandardEnvironment};
pub use definitions::{Definition, DefinitionRegistry, ImportRegistry, ObjectScope, Role, ScopedProxyMode};
pub use errors::{ContextError, ContextResult, Phase, Problem, ProblemReporter};
pub use expansion::ConfigurationProcessor;
pub use extensions::{
    CreationInterceptor, Extension, FactoryPostProcessor, Interceptor, MergedDefinitionInterceptor,
    RegistryPostProcessor, Tier,
};
pub use factory::{Instance, ObjectFactory, SourceCall};
pub use metadata::{Condition, FactoryMethod, MetadataReader, SourceMode, SourceModel, TypeCatalog, TypeMetadata};
pub use pipeline::PostProcessorPipeline;
pub use proxy::{AutoProxyInterceptor, DefaultProxyStrategySelector, ProxySpec, ProxyStrategy, ProxyStrategySelector};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework information
pub const FRAMEWORK_NAME: &str = "elif.rs";

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}

/// Get framework name
pub fn name() -> &'static str {
    FRAMEWORK_NAME
}
