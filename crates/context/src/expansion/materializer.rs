use std::collections::HashSet;

use crate::definitions::{DefinitionRegistry, ImportRegistry};
use crate::errors::ContextResult;
use crate::expansion::ParsedSource;
use crate::metadata::{ConditionEvaluator, ConditionPhase};

/// Registers derived definitions, evaluating registration-phase conditions
pub struct Materializer<'a> {
    evaluator: &'a ConditionEvaluator,
    import_registry: &'a ImportRegistry,
}

impl<'a> Materializer<'a> {
    pub fn new(evaluator: &'a ConditionEvaluator, import_registry: &'a ImportRegistry) -> Self {
        Self {
            evaluator,
            import_registry,
        }
    }

    /// Register what each parsed source derived; returns the registered names in order
    ///
    /// A source is skipped when its own registration conditions fail or when the
    /// source that imported it was skipped. Skipped names are added to `skipped`.
    pub fn materialize(
        &self,
        parsed: Vec<ParsedSource>,
        registry: &DefinitionRegistry,
        skipped: &mut HashSet<String>,
    ) -> ContextResult<Vec<String>> {
        let mut registered = Vec::new();

        for source in parsed {
            let name = source.origin.source_name.clone();
            if self.is_skipped(&source, registry, skipped)? {
                skipped.insert(name.clone());
                self.discard_source(&name, registry)?;
                continue;
            }

            for derived in source.derived {
                if self
                    .evaluator
                    .should_skip(&derived.conditions, ConditionPhase::RegisterDefinition, registry)?
                {
                    tracing::debug!(
                        "Not registering '{}' from '{}': conditions not met",
                        derived.definition.name,
                        name
                    );
                    continue;
                }
                let derived_name = derived.definition.name.clone();
                registry.register(derived.definition)?;
                self.import_registry
                    .register_import(derived_name.clone(), source.origin.clone())?;
                registered.push(derived_name);
            }
        }
        Ok(registered)
    }

    /// Drop a source that was itself imported; user-registered sources are left in place
    pub fn discard_source(&self, name: &str, registry: &DefinitionRegistry) -> ContextResult<bool> {
        if self.import_registry.importing_source_for(name)?.is_none() {
            return Ok(false);
        }
        if registry.contains(name)? {
            registry.remove(name)?;
        }
        self.import_registry.remove_source(name)?;
        tracing::debug!("Removed skipped imported source '{}'", name);
        Ok(true)
    }

    fn is_skipped(
        &self,
        source: &ParsedSource,
        registry: &DefinitionRegistry,
        skipped: &HashSet<String>,
    ) -> ContextResult<bool> {
        if let Some(origin) = self.import_registry.importing_source_for(&source.origin.source_name)? {
            if skipped.contains(&origin.source_name) {
                return Ok(true);
            }
        }
        self.evaluator
            .should_skip(&source.conditions, ConditionPhase::RegisterDefinition, registry)
    }
}
