use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::definitions::{Capability, Definition};
use crate::errors::{ContextError, ContextResult};

/// Insertion-ordered store of named definitions
///
/// Every registry carries a unique identity used by the processed-phase guards,
/// and a generation counter bumped on each registration or removal so cached
/// name lookups can tell when they are stale.
#[derive(Debug)]
pub struct DefinitionRegistry {
    id: Uuid,
    definitions: RwLock<IndexMap<String, Definition>>,
    generation: AtomicU64,
    allow_overriding: bool,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            definitions: RwLock::new(IndexMap::new()),
            generation: AtomicU64::new(0),
            allow_overriding: true,
        }
    }

    /// Reject re-registration of an existing name instead of overwriting it
    pub fn without_overriding() -> Self {
        Self {
            allow_overriding: false,
            ..Self::new()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Structural generation, bumped whenever a definition is registered or removed
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn allows_overriding(&self) -> bool {
        self.allow_overriding
    }

    /// Register a definition under its name; an existing name is overwritten in place
    pub fn register(&self, definition: Definition) -> ContextResult<()> {
        let mut definitions = self.write()?;
        let name = definition.name.clone();
        if name.is_empty() {
            return Err(ContextError::configuration("Definition name must not be empty"));
        }

        match definitions.get_mut(&name) {
            Some(existing) => {
                if !self.allow_overriding {
                    return Err(ContextError::configuration(format!(
                        "Cannot register definition '{}' of type '{}': name already bound to type '{}' and overriding is disabled",
                        name, definition.type_name, existing.type_name
                    )));
                }
                tracing::debug!(
                    "Overriding definition '{}': replacing type '{}' with '{}'",
                    name,
                    existing.type_name,
                    definition.type_name
                );
                *existing = definition;
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
            None => {
                tracing::debug!("Registering definition '{}' ({})", name, definition.type_name);
                definitions.insert(name, definition);
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
        }
        Ok(())
    }

    /// Remove a definition, preserving the order of the remaining ones
    pub fn remove(&self, name: &str) -> ContextResult<Definition> {
        let mut definitions = self.write()?;
        let removed = definitions
            .shift_remove(name)
            .ok_or_else(|| ContextError::definition_not_found(name))?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        tracing::debug!("Removed definition '{}'", name);
        Ok(removed)
    }

    pub fn contains(&self, name: &str) -> ContextResult<bool> {
        Ok(self.read()?.contains_key(name))
    }

    /// Snapshot of a definition
    pub fn definition(&self, name: &str) -> ContextResult<Definition> {
        self.find(name)?
            .ok_or_else(|| ContextError::definition_not_found(name))
    }

    pub fn find(&self, name: &str) -> ContextResult<Option<Definition>> {
        Ok(self.read()?.get(name).cloned())
    }

    /// Registered names in insertion order
    pub fn names(&self) -> ContextResult<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    pub fn len(&self) -> ContextResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> ContextResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Names whose definitions satisfy `predicate`, in insertion order
    pub fn names_matching<F>(&self, predicate: F) -> ContextResult<Vec<String>>
    where
        F: Fn(&Definition) -> bool,
    {
        Ok(self
            .read()?
            .iter()
            .filter(|(_, definition)| predicate(definition))
            .map(|(name, _)| name.clone())
            .collect())
    }

    pub fn names_for_capability(&self, capability: Capability) -> ContextResult<Vec<String>> {
        self.names_matching(|definition| definition.capability() == capability)
    }

    /// Mutate a definition in place; never changes the set of names
    pub fn update<F, R>(&self, name: &str, f: F) -> ContextResult<R>
    where
        F: FnOnce(&mut Definition) -> R,
    {
        let mut definitions = self.write()?;
        let definition = definitions
            .get_mut(name)
            .ok_or_else(|| ContextError::definition_not_found(name))?;
        Ok(f(definition))
    }

    pub fn attribute(&self, name: &str, key: &str) -> ContextResult<Option<Value>> {
        let definitions = self.read()?;
        let definition = definitions
            .get(name)
            .ok_or_else(|| ContextError::definition_not_found(name))?;
        Ok(definition.attribute(key).cloned())
    }

    pub fn set_attribute(
        &self,
        name: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> ContextResult<()> {
        self.update(name, |definition| definition.set_attribute(key, value))
    }

    fn read(&self) -> ContextResult<std::sync::RwLockReadGuard<'_, IndexMap<String, Definition>>> {
        self.definitions
            .read()
            .map_err(|_| ContextError::lock("definition_registry"))
    }

    fn write(&self) -> ContextResult<std::sync::RwLockWriteGuard<'_, IndexMap<String, Definition>>> {
        self.definitions
            .write()
            .map_err(|_| ContextError::lock("definition_registry"))
    }
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DefinitionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DefinitionRegistry({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_overwrites_without_duplicating() {
        let registry = DefinitionRegistry::new();
        registry.register(Definition::new("a", "app::A")).unwrap();
        registry.register(Definition::new("b", "app::B")).unwrap();
        let generation = registry.generation();

        registry.register(Definition::new("a", "app::A2")).unwrap();

        assert_eq!(registry.names().unwrap(), vec!["a", "b"]);
        assert_eq!(registry.definition("a").unwrap().type_name, "app::A2");
        assert_eq!(registry.len().unwrap(), 2);
        assert!(registry.generation() > generation);
    }

    #[test]
    fn test_overriding_can_be_disabled() {
        let registry = DefinitionRegistry::without_overriding();
        registry.register(Definition::new("a", "app::A")).unwrap();

        let err = registry.register(Definition::new("a", "app::Other")).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(registry.definition("a").unwrap().type_name, "app::A");
    }

    #[test]
    fn test_remove_keeps_order_and_bumps_generation() {
        let registry = DefinitionRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(Definition::new(name, "app::T")).unwrap();
        }
        let generation = registry.generation();

        registry.remove("b").unwrap();

        assert_eq!(registry.names().unwrap(), vec!["a", "c"]);
        assert!(registry.generation() > generation);
        assert!(matches!(
            registry.remove("b"),
            Err(ContextError::DefinitionNotFound { .. })
        ));
    }

    #[test]
    fn test_attribute_rewrite_in_place() {
        let registry = DefinitionRegistry::new();
        registry.register(Definition::new("a", "app::A")).unwrap();

        registry.set_attribute("a", "timeout", 30).unwrap();

        assert_eq!(
            registry.attribute("a", "timeout").unwrap(),
            Some(Value::from(30))
        );
        assert!(registry.attribute("missing", "timeout").is_err());
    }
}
