use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::definitions::Definition;
use crate::metadata::{SourceMode, TypeMetadata};

/// What the expansion engine needs to know about a definition's type
#[derive(Debug, Clone, Default)]
pub struct StructuralMetadata {
    /// `Some` when the definition qualifies as a configuration source
    pub source_mode: Option<SourceMode>,
    pub order: Option<i32>,
    pub attributes: HashMap<String, Value>,
}

impl StructuralMetadata {
    pub fn is_source_candidate(&self) -> bool {
        self.source_mode.is_some()
    }
}

/// Reads structural metadata for types; pure and read-only
pub trait MetadataReader: Send + Sync {
    fn type_metadata(&self, type_name: &str) -> Option<Arc<TypeMetadata>>;

    /// Structural view of a definition, looked up through its user type
    fn read(&self, definition: &Definition) -> StructuralMetadata {
        match self.type_metadata(definition.user_type()) {
            Some(metadata) => StructuralMetadata {
                source_mode: metadata.source.as_ref().map(|model| model.mode),
                order: definition.order.or(metadata.order),
                attributes: metadata.attributes.clone(),
            },
            None => StructuralMetadata {
                order: definition.order,
                ..StructuralMetadata::default()
            },
        }
    }
}

/// In-memory catalog of type metadata
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: RwLock<HashMap<String, Arc<TypeMetadata>>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; a later registration under the same name replaces it
    pub fn register(&self, metadata: TypeMetadata) -> Arc<TypeMetadata> {
        let metadata = Arc::new(metadata);
        match self.types.write() {
            Ok(mut types) => {
                types.insert(metadata.name.clone(), metadata.clone());
            }
            Err(_) => tracing::error!("Type catalog lock poisoned; '{}' not registered", metadata.name),
        }
        metadata
    }

    pub fn with_type(self, metadata: TypeMetadata) -> Self {
        self.register(metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.types.read().map(|types| types.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataReader for TypeCatalog {
    fn type_metadata(&self, type_name: &str) -> Option<Arc<TypeMetadata>> {
        self.types.read().ok()?.get(type_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SourceModel;

    #[test]
    fn test_read_reports_source_candidates() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::source("app::AppConfig", SourceModel::full()).with_order(3))
            .with_type(TypeMetadata::concrete("app::Mailer"));

        let source = catalog.read(&Definition::new("appConfig", "app::AppConfig"));
        assert_eq!(source.source_mode, Some(SourceMode::Full));
        assert_eq!(source.order, Some(3));

        let overridden = catalog.read(&Definition::new("appConfig", "app::AppConfig").with_order(1));
        assert_eq!(overridden.order, Some(1));

        assert!(!catalog.read(&Definition::new("mailer", "app::Mailer")).is_source_candidate());
        assert!(!catalog.read(&Definition::new("x", "app::Unknown")).is_source_candidate());
    }

    #[test]
    fn test_enhanced_definitions_resolve_user_type() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::source("app::AppConfig", SourceModel::lite()));

        let metadata = catalog.read(&Definition::new("appConfig", "app::AppConfig$$Enhanced"));
        assert_eq!(metadata.source_mode, Some(SourceMode::Lite));
    }
}
