use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

use crate::definitions::{Capability, DefinitionRegistry};
use crate::errors::{ContextError, ContextResult};

#[derive(Debug, Clone)]
struct CachedNames {
    generation: u64,
    names: Vec<String>,
}

/// Capability name lookups, cached per registry until its generation moves
#[derive(Debug, Default)]
pub struct NameLookupCache {
    entries: Mutex<HashMap<(Uuid, Capability), CachedNames>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl NameLookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of definitions with `capability`, in registration order
    pub fn names_for(
        &self,
        registry: &DefinitionRegistry,
        capability: Capability,
    ) -> ContextResult<Vec<String>> {
        let key = (registry.id(), capability);
        let generation = registry.generation();

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ContextError::lock("name_lookup_cache"))?;
        if let Some(cached) = entries.get(&key) {
            if cached.generation == generation {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached.names.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let names = registry.names_for_capability(capability)?;
        entries.insert(
            key,
            CachedNames {
                generation,
                names: names.clone(),
            },
        );
        Ok(names)
    }

    pub fn clear(&self) -> ContextResult<()> {
        self.entries
            .lock()
            .map_err(|_| ContextError::lock("name_lookup_cache"))?
            .clear();
        Ok(())
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
