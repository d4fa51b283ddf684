use std::sync::Arc;

use crate::definitions::Definition;
use crate::errors::ContextResult;
use crate::factory::{Instance, ObjectFactory};

/// Hook around object construction; may replace the instance it is handed
pub trait CreationInterceptor: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn before_initialization(
        &self,
        instance: Instance,
        _name: &str,
        _factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        Ok(instance)
    }

    fn after_initialization(
        &self,
        instance: Instance,
        _name: &str,
        _factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        Ok(instance)
    }
}

/// Interceptor that also customizes the per-creation copy of a definition
pub trait MergedDefinitionInterceptor: CreationInterceptor {
    fn post_process_merged_definition(
        &self,
        definition: &mut Definition,
        name: &str,
    ) -> ContextResult<()>;
}

/// A creation interceptor, classified when it is created
#[derive(Clone)]
pub enum Interceptor {
    Standard(Arc<dyn CreationInterceptor>),
    MergedDefinition(Arc<dyn MergedDefinitionInterceptor>),
}

impl Interceptor {
    pub fn standard<I: CreationInterceptor + 'static>(interceptor: I) -> Self {
        Interceptor::Standard(Arc::new(interceptor))
    }

    pub fn merged_definition<I: MergedDefinitionInterceptor + 'static>(interceptor: I) -> Self {
        Interceptor::MergedDefinition(Arc::new(interceptor))
    }

    pub fn name(&self) -> &str {
        match self {
            Interceptor::Standard(i) => i.name(),
            Interceptor::MergedDefinition(i) => i.name(),
        }
    }

    pub fn is_merged_definition(&self) -> bool {
        matches!(self, Interceptor::MergedDefinition(_))
    }

    pub fn identity(&self) -> usize {
        match self {
            Interceptor::Standard(i) => Arc::as_ptr(i) as *const () as usize,
            Interceptor::MergedDefinition(i) => Arc::as_ptr(i) as *const () as usize,
        }
    }

    pub fn before_initialization(
        &self,
        instance: Instance,
        name: &str,
        factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        match self {
            Interceptor::Standard(i) => i.before_initialization(instance, name, factory),
            Interceptor::MergedDefinition(i) => i.before_initialization(instance, name, factory),
        }
    }

    pub fn after_initialization(
        &self,
        instance: Instance,
        name: &str,
        factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        match self {
            Interceptor::Standard(i) => i.after_initialization(instance, name, factory),
            Interceptor::MergedDefinition(i) => i.after_initialization(instance, name, factory),
        }
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name())
            .field("merged_definition", &self.is_merged_definition())
            .finish()
    }
}
