use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::errors::{ContextError, ContextResult, Phase};

/// Identity-keyed claims that keep the claimed instance alive
type Claims = HashMap<(usize, Uuid), Option<Box<dyn Any + Send + Sync>>>;

/// Records which (extension, target) pairs completed a phase; only ever grows
///
/// Identities are instance addresses. Instances claimed through
/// [`ProcessedGuard::claim_retaining`] are held for the guard's lifetime so their
/// address cannot be reused by a later instance.
#[derive(Debug)]
pub struct ProcessedGuard {
    phase: Phase,
    processed: Mutex<Claims>,
}

impl ProcessedGuard {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            processed: Mutex::new(HashMap::new()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check-and-add in one step; a second claim for the same pair is a duplicate invocation
    ///
    /// For identities whose owner outlives the guard.
    pub fn claim(&self, extension: &str, identity: usize, target: Uuid) -> ContextResult<()> {
        self.insert(extension, identity, target, None)
    }

    /// Like [`ProcessedGuard::claim`], holding `instance` for as long as the guard lives
    pub fn claim_retaining<T: Any + Send + Sync>(
        &self,
        extension: &str,
        identity: usize,
        target: Uuid,
        instance: T,
    ) -> ContextResult<()> {
        self.insert(extension, identity, target, Some(Box::new(instance)))
    }

    fn insert(
        &self,
        extension: &str,
        identity: usize,
        target: Uuid,
        instance: Option<Box<dyn Any + Send + Sync>>,
    ) -> ContextResult<()> {
        let mut processed = self
            .processed
            .lock()
            .map_err(|_| ContextError::lock("processed_guard"))?;
        if processed.contains_key(&(identity, target)) {
            return Err(ContextError::duplicate_invocation(
                self.phase,
                extension,
                target.to_string(),
            ));
        }
        processed.insert((identity, target), instance);
        Ok(())
    }

    pub fn contains(&self, identity: usize, target: Uuid) -> ContextResult<bool> {
        Ok(self
            .processed
            .lock()
            .map_err(|_| ContextError::lock("processed_guard"))?
            .contains_key(&(identity, target)))
    }

    pub fn len(&self) -> ContextResult<usize> {
        Ok(self
            .processed
            .lock()
            .map_err(|_| ContextError::lock("processed_guard"))?
            .len())
    }

    pub fn is_empty(&self) -> ContextResult<bool> {
        Ok(self.len()? == 0)
    }
}
