use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::errors::{ContextError, ContextResult};

/// Name under which the import registry is published as a singleton
pub const IMPORT_REGISTRY_NAME: &str = "elif.context.internal.importRegistry";

/// Metadata of the configuration source that caused a definition to be expanded
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOrigin {
    pub source_name: String,
    pub source_type: String,
    pub order: Option<i32>,
    pub attributes: HashMap<String, Value>,
}

impl ImportOrigin {
    pub fn new(source_name: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            source_type: source_type.into(),
            order: None,
            attributes: HashMap::new(),
        }
    }
}

/// Expanded definition name -> originating configuration source
#[derive(Debug, Default)]
pub struct ImportRegistry {
    imports: RwLock<HashMap<String, ImportOrigin>>,
}

impl ImportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the origin of an expanded definition; the first recorded origin wins
    pub fn register_import(&self, imported: impl Into<String>, origin: ImportOrigin) -> ContextResult<()> {
        let mut imports = self.write()?;
        imports.entry(imported.into()).or_insert(origin);
        Ok(())
    }

    pub fn importing_source_for(&self, imported: &str) -> ContextResult<Option<ImportOrigin>> {
        Ok(self.read()?.get(imported).cloned())
    }

    /// Forget every entry that names `source_name` as its origin, and the entry for it
    pub fn remove_source(&self, source_name: &str) -> ContextResult<()> {
        let mut imports = self.write()?;
        imports.remove(source_name);
        imports.retain(|_, origin| origin.source_name != source_name);
        Ok(())
    }

    pub fn imported_names(&self) -> ContextResult<Vec<String>> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn len(&self) -> ContextResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> ContextResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> ContextResult<std::sync::RwLockReadGuard<'_, HashMap<String, ImportOrigin>>> {
        self.imports.read().map_err(|_| ContextError::lock("import_registry"))
    }

    fn write(&self) -> ContextResult<std::sync::RwLockWriteGuard<'_, HashMap<String, ImportOrigin>>> {
        self.imports.write().map_err(|_| ContextError::lock("import_registry"))
    }
}
