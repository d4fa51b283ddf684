use std::sync::Arc;

use crate::definitions::DefinitionRegistry;
use crate::errors::ContextResult;
use crate::factory::ObjectFactory;

/// Bootstrap hook that rewrites existing definitions once registry mutation is over
///
/// Implementations must not instantiate application objects.
pub trait FactoryPostProcessor: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn post_process_factory(&self, factory: &ObjectFactory) -> ContextResult<()>;
}

/// Bootstrap hook allowed to add and remove definitions before the factory phase
pub trait RegistryPostProcessor: FactoryPostProcessor {
    fn post_process_registry(&self, registry: &DefinitionRegistry) -> ContextResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    RegistryMutating,
    FactoryOnly,
}

/// A bootstrap extension, classified by capability when it is created
#[derive(Clone)]
pub enum Extension {
    RegistryMutating(Arc<dyn RegistryPostProcessor>),
    FactoryOnly(Arc<dyn FactoryPostProcessor>),
}

impl Extension {
    pub fn registry_mutating<P: RegistryPostProcessor + 'static>(processor: P) -> Self {
        Extension::RegistryMutating(Arc::new(processor))
    }

    pub fn factory_only<P: FactoryPostProcessor + 'static>(processor: P) -> Self {
        Extension::FactoryOnly(Arc::new(processor))
    }

    pub fn kind(&self) -> ExtensionKind {
        match self {
            Extension::RegistryMutating(_) => ExtensionKind::RegistryMutating,
            Extension::FactoryOnly(_) => ExtensionKind::FactoryOnly,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Extension::RegistryMutating(p) => p.name(),
            Extension::FactoryOnly(p) => p.name(),
        }
    }

    /// Instance identity, stable for the lifetime of the extension
    pub fn identity(&self) -> usize {
        match self {
            Extension::RegistryMutating(p) => Arc::as_ptr(p) as *const () as usize,
            Extension::FactoryOnly(p) => Arc::as_ptr(p) as *const () as usize,
        }
    }

    pub fn post_process_factory(&self, factory: &ObjectFactory) -> ContextResult<()> {
        match self {
            Extension::RegistryMutating(p) => p.post_process_factory(factory),
            Extension::FactoryOnly(p) => p.post_process_factory(factory),
        }
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}
