use std::sync::Arc;

use crate::definitions::ImportRegistry;
use crate::errors::ContextResult;
use crate::extensions::CreationInterceptor;
use crate::factory::{Instance, ObjectFactory};

/// Hands imported configuration sources the metadata of the source that imported them
#[derive(Debug, Clone)]
pub struct ImportAwareInterceptor {
    import_registry: Arc<ImportRegistry>,
}

impl ImportAwareInterceptor {
    pub fn new(import_registry: Arc<ImportRegistry>) -> Self {
        Self { import_registry }
    }
}

impl CreationInterceptor for ImportAwareInterceptor {
    fn name(&self) -> &str {
        "importAwareInterceptor"
    }

    fn before_initialization(
        &self,
        instance: Instance,
        name: &str,
        _factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        if let Instance::Source(source) = &instance {
            if let Some(origin) = self.import_registry.importing_source_for(name)? {
                tracing::trace!("Source '{}' was imported by '{}'", name, origin.source_name);
                source.set_import_origin(origin);
            }
        }
        Ok(instance)
    }
}
