use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::definitions::{Definition, DefinitionRegistry, ImportOrigin, Supplier};
use crate::errors::{ContextResult, ProblemReporter};
use crate::expansion::candidates::{lineage, named, source_spec, SourceCandidate};
use crate::metadata::{
    CandidateScanner, Condition, ConditionEvaluator, ConditionPhase, FactoryMethod, MetadataReader,
    SourceMode,
};

/// How a derived definition came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedKind {
    Component,
    Scanned,
    ImportedSource,
    FactoryMethod,
}

/// A definition produced by parsing a source, not yet registered
#[derive(Debug, Clone)]
pub struct DerivedDefinition {
    pub kind: DerivedKind,
    pub definition: Definition,
    /// Evaluated when the definition is registered
    pub conditions: Vec<Condition>,
}

/// Everything one source contributed in a parse pass
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub origin: ImportOrigin,
    /// The source's own registration-phase conditions
    pub conditions: Vec<Condition>,
    pub derived: Vec<DerivedDefinition>,
}

/// Parses configuration sources into derived definitions
pub struct SourceParser<'a> {
    reader: &'a dyn MetadataReader,
    scanner: Option<&'a dyn CandidateScanner>,
    evaluator: &'a ConditionEvaluator,
}

impl<'a> SourceParser<'a> {
    pub fn new(
        reader: &'a dyn MetadataReader,
        scanner: Option<&'a dyn CandidateScanner>,
        evaluator: &'a ConditionEvaluator,
    ) -> Self {
        Self {
            reader,
            scanner,
            evaluator,
        }
    }

    /// Parse one source; `None` when its parse-phase conditions skip it
    ///
    /// `claimed` holds the type names of sources already parsed or already
    /// imported this run, so each imported source is derived at most once.
    /// `known_ancestors` maps each structural ancestor to the source that first
    /// derived its declarations; later sources sharing it skip them.
    pub fn parse(
        &self,
        candidate: &SourceCandidate,
        registry: &DefinitionRegistry,
        claimed: &mut HashSet<String>,
        known_ancestors: &mut HashMap<String, String>,
        reporter: &mut ProblemReporter,
    ) -> ContextResult<Option<ParsedSource>> {
        let lineage = lineage(&candidate.type_name, &candidate.model, self.reader);
        let conditions: Vec<Condition> = lineage
            .iter()
            .flat_map(|(_, model)| model.conditions.iter().cloned())
            .collect();
        if self
            .evaluator
            .should_skip(&conditions, ConditionPhase::ParseSource, registry)?
        {
            tracing::debug!("Skipping configuration source '{}': conditions not met", candidate.name);
            return Ok(None);
        }

        self.validate_source(candidate, reporter);

        let mut models = Vec::with_capacity(lineage.len());
        for (index, (type_name, model)) in lineage.into_iter().enumerate() {
            if index > 0 {
                if let Some(owner) = known_ancestors.get(&type_name) {
                    tracing::trace!(
                        "Ancestor '{}' of '{}' already derived by '{}'",
                        type_name,
                        candidate.name,
                        owner
                    );
                    continue;
                }
                known_ancestors.insert(type_name, candidate.name.clone());
            }
            models.push(model);
        }
        let declared: HashSet<&str> = models
            .iter()
            .flat_map(|model| model.factory_methods.iter().map(|method| method.name.as_str()))
            .collect();

        let mut derived = Vec::new();
        for model in &models {
            for component in &model.components {
                derived.push(DerivedDefinition {
                    kind: DerivedKind::Component,
                    definition: named(component.clone()),
                    conditions: Vec::new(),
                });
            }
            for pattern in &model.scan_patterns {
                self.scan(pattern, candidate, registry, &mut derived, reporter)?;
            }
            for import in &model.imports {
                self.import(import, candidate, registry, claimed, &mut derived, reporter)?;
            }
        }

        let spec = source_spec(&candidate.type_name, candidate.mode, &candidate.model, self.reader);
        for method in spec.methods.iter().filter(|method| declared.contains(method.name.as_str())) {
            if self
                .evaluator
                .should_skip(&method.conditions, ConditionPhase::ParseSource, registry)?
            {
                tracing::debug!(
                    "Skipping factory method '{}::{}': conditions not met",
                    candidate.type_name,
                    method.name
                );
                continue;
            }
            self.validate_method(candidate, method, reporter);
            derived.push(DerivedDefinition {
                kind: DerivedKind::FactoryMethod,
                definition: factory_method_definition(&candidate.name, method),
                conditions: method.conditions.clone(),
            });
        }

        let mut origin = ImportOrigin::new(&candidate.name, &candidate.type_name);
        origin.order = candidate.order;
        if let Some(metadata) = self.reader.type_metadata(&candidate.type_name) {
            origin.attributes = metadata.attributes.clone();
        }

        Ok(Some(ParsedSource {
            origin,
            conditions,
            derived,
        }))
    }

    fn validate_source(&self, candidate: &SourceCandidate, reporter: &mut ProblemReporter) {
        if candidate.mode != SourceMode::Full {
            return;
        }
        let immutable = self
            .reader
            .type_metadata(&candidate.type_name)
            .map(|metadata| metadata.immutable)
            .unwrap_or(false);
        if immutable {
            reporter.fatal(
                format!(
                    "Full configuration source '{}' may not be immutable: it must be enhanceable",
                    candidate.type_name
                ),
                &candidate.type_name,
            );
        }
    }

    fn validate_method(&self, candidate: &SourceCandidate, method: &FactoryMethod, reporter: &mut ProblemReporter) {
        if candidate.mode == SourceMode::Full && method.immutable && !method.is_static {
            reporter.fatal(
                format!(
                    "Factory method '{}' must not be immutable: it must be interceptable to be shared through the container",
                    method.name
                ),
                format!("{}::{}", candidate.type_name, method.name),
            );
        }
    }

    fn scan(
        &self,
        pattern: &str,
        candidate: &SourceCandidate,
        registry: &DefinitionRegistry,
        derived: &mut Vec<DerivedDefinition>,
        reporter: &mut ProblemReporter,
    ) -> ContextResult<()> {
        let scanner = match self.scanner {
            Some(scanner) => scanner,
            None => {
                reporter.warning(
                    format!("No candidate scanner configured; pattern '{}' ignored", pattern),
                    &candidate.type_name,
                );
                return Ok(());
            }
        };

        for found in scanner.scan(pattern) {
            let found = named(found);
            match registry.find(&found.name)? {
                Some(existing) if existing.user_type() == found.user_type() => continue,
                Some(existing) => {
                    reporter.fatal(
                        format!(
                            "Scanned definition '{}' of type '{}' conflicts with existing definition of type '{}'",
                            found.name,
                            found.type_name,
                            existing.type_name
                        ),
                        format!("{} (scan '{}')", candidate.type_name, pattern),
                    );
                }
                None => derived.push(DerivedDefinition {
                    kind: DerivedKind::Scanned,
                    definition: found,
                    conditions: Vec::new(),
                }),
            }
        }
        Ok(())
    }

    fn import(
        &self,
        type_name: &str,
        candidate: &SourceCandidate,
        registry: &DefinitionRegistry,
        claimed: &mut HashSet<String>,
        derived: &mut Vec<DerivedDefinition>,
        reporter: &mut ProblemReporter,
    ) -> ContextResult<()> {
        let metadata = match self.reader.type_metadata(type_name) {
            Some(metadata) => metadata,
            None => {
                reporter.fatal(
                    format!("Imported type '{}' cannot be resolved", type_name),
                    &candidate.type_name,
                );
                return Ok(());
            }
        };
        let model = match &metadata.source {
            Some(model) => model.clone(),
            None => {
                reporter.warning(
                    format!("Imported type '{}' is not a configuration source; ignored", type_name),
                    &candidate.type_name,
                );
                return Ok(());
            }
        };

        if claimed.contains(type_name) || registered_type(registry, type_name)? {
            tracing::trace!(
                "Import of '{}' from '{}' already satisfied",
                type_name,
                candidate.type_name
            );
            return Ok(());
        }
        claimed.insert(type_name.to_string());

        let mut definition = Definition::new(type_name, type_name);
        definition.order = metadata.order;
        derived.push(DerivedDefinition {
            kind: DerivedKind::ImportedSource,
            definition,
            conditions: model.conditions.clone(),
        });
        Ok(())
    }
}

fn registered_type(registry: &DefinitionRegistry, type_name: &str) -> ContextResult<bool> {
    Ok(!registry
        .names_matching(|definition| definition.user_type() == type_name)?
        .is_empty())
}

/// Definition for an object produced by a source's factory method
pub fn factory_method_definition(source: &str, method: &Arc<FactoryMethod>) -> Definition {
    let mut definition = Definition::new(&method.name, &method.return_type)
        .with_scope(method.scope)
        .with_role(method.role)
        .with_scoped_proxy(method.scoped_proxy)
        .with_supplier(Supplier::FactoryMethod {
            source: source.to_string(),
            method: method.clone(),
        });
    definition.lazy = method.lazy;
    definition.attributes.extend(method.attributes.clone());
    definition
}
