use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::config::PropertyResolver;
use crate::definitions::{
    Definition, DefinitionRegistry, ExtensionFn, ImportRegistry, Role, Supplier, IMPORT_REGISTRY_NAME,
};
use crate::errors::{ContextError, ContextResult, Phase, ProblemReporter};
use crate::expansion::{
    check_candidate, enhance_sources, sort_candidates, ImportAwareInterceptor, Materializer, SourceParser,
};
use crate::extensions::{
    Extension, ExtensionKind, FactoryPostProcessor, Interceptor, RegistryPostProcessor, Tier, LOWEST_PRECEDENCE,
};
use crate::factory::{Instance, ObjectFactory};
use crate::metadata::{CandidateScanner, ConditionEvaluator, MetadataReader};
use crate::pipeline::ProcessedGuard;

/// Reserved name of the configuration processor definition
pub const CONFIGURATION_PROCESSOR_NAME: &str = "elif.context.internal.configurationProcessor";

/// One parsed source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedEntry {
    pub name: String,
    pub type_name: String,
    /// 1-based expansion round
    pub round: usize,
    /// 1-based position across all rounds
    pub sequence: usize,
}

/// Cumulative record of what expansion did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpansionLog {
    pub rounds: usize,
    pub parsed: Vec<ParsedEntry>,
    pub registered: Vec<String>,
    pub skipped: Vec<String>,
    pub enhanced: Vec<String>,
    pub duration: Duration,
}

impl ExpansionLog {
    pub fn entry(&self, name: &str) -> Option<&ParsedEntry> {
        self.parsed.iter().find(|entry| entry.name == name)
    }

    /// How many times sources of `type_name` were parsed
    pub fn parse_count(&self, type_name: &str) -> usize {
        self.parsed.iter().filter(|entry| entry.type_name == type_name).count()
    }
}

/// Expands configuration sources into derived definitions until nothing new appears
///
/// Runs as a priority-tier registry-mutating extension. Its factory phase
/// enhances full sources, installs the import-aware interceptor and publishes
/// the import registry as a singleton.
pub struct ConfigurationProcessor {
    reader: Arc<dyn MetadataReader>,
    scanner: Option<Arc<dyn CandidateScanner>>,
    evaluator: ConditionEvaluator,
    import_registry: Arc<ImportRegistry>,
    enhance_sources: bool,
    registry_guard: ProcessedGuard,
    factory_guard: ProcessedGuard,
    factory_registries: Mutex<HashSet<Uuid>>,
    log: Mutex<ExpansionLog>,
}

impl ConfigurationProcessor {
    pub fn new(reader: Arc<dyn MetadataReader>, resolver: Arc<dyn PropertyResolver>) -> Self {
        Self {
            reader,
            scanner: None,
            evaluator: ConditionEvaluator::new(resolver),
            import_registry: Arc::new(ImportRegistry::new()),
            enhance_sources: true,
            registry_guard: ProcessedGuard::new(Phase::Registry),
            factory_guard: ProcessedGuard::new(Phase::Factory),
            factory_registries: Mutex::new(HashSet::new()),
            log: Mutex::new(ExpansionLog::default()),
        }
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn CandidateScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn with_enhancement(mut self, enabled: bool) -> Self {
        self.enhance_sources = enabled;
        self
    }

    pub fn import_registry(&self) -> &Arc<ImportRegistry> {
        &self.import_registry
    }

    pub fn expansion_log(&self) -> ContextResult<ExpansionLog> {
        Ok(self
            .log
            .lock()
            .map_err(|_| ContextError::lock("expansion_log"))?
            .clone())
    }

    /// Infrastructure definition that hands out this processor
    pub fn into_definition(self: Arc<Self>) -> Definition {
        let processor = self;
        let create: ExtensionFn = Arc::new(move |_: &ObjectFactory| -> ContextResult<Extension> {
            Ok(Extension::RegistryMutating(processor.clone()))
        });
        Definition::new(CONFIGURATION_PROCESSOR_NAME, std::any::type_name::<ConfigurationProcessor>())
            .with_role(Role::Infrastructure)
            .with_tier(Tier::Priority)
            .with_order(LOWEST_PRECEDENCE)
            .with_supplier(Supplier::Extension {
                kind: ExtensionKind::RegistryMutating,
                create,
            })
    }

    fn identity(&self) -> usize {
        self as *const Self as *const () as usize
    }

    /// Run expansion rounds until no new configuration source appears
    pub fn process_registry(&self, registry: &DefinitionRegistry) -> ContextResult<()> {
        let started = Instant::now();
        let parser = SourceParser::new(self.reader.as_ref(), self.scanner.as_deref(), &self.evaluator);
        let materializer = Materializer::new(&self.evaluator, &self.import_registry);

        let mut parsed_types: HashSet<String> = HashSet::new();
        let mut claimed: HashSet<String> = HashSet::new();
        let mut known_ancestors: HashMap<String, String> = HashMap::new();
        let mut skipped: HashSet<String> = HashSet::new();
        let mut known: HashSet<String> = HashSet::new();
        let mut pending: Vec<String> = registry.names()?;
        known.extend(pending.iter().cloned());
        let mut log = ExpansionLog::default();

        loop {
            let mut candidates = Vec::new();
            for name in &pending {
                if let Some(candidate) = check_candidate(registry, name, self.reader.as_ref())? {
                    candidates.push(candidate);
                }
            }
            if candidates.is_empty() {
                break;
            }
            sort_candidates(&mut candidates);
            log.rounds += 1;
            tracing::debug!(
                "Expansion round {}: {} candidate source(s)",
                log.rounds,
                candidates.len()
            );

            let mut reporter = ProblemReporter::new();
            let mut parsed = Vec::new();
            for candidate in &candidates {
                registry.update(&candidate.name, |definition| definition.parsed = true)?;
                if !parsed_types.insert(candidate.type_name.clone()) {
                    tracing::trace!(
                        "Source type '{}' already parsed; '{}' not expanded again",
                        candidate.type_name,
                        candidate.name
                    );
                    continue;
                }
                claimed.insert(candidate.type_name.clone());
                log.parsed.push(ParsedEntry {
                    name: candidate.name.clone(),
                    type_name: candidate.type_name.clone(),
                    round: log.rounds,
                    sequence: log.parsed.len() + 1,
                });

                match parser.parse(candidate, registry, &mut claimed, &mut known_ancestors, &mut reporter)? {
                    Some(source) => parsed.push(source),
                    None => {
                        skipped.insert(candidate.name.clone());
                        materializer.discard_source(&candidate.name, registry)?;
                    }
                }
            }

            if reporter.has_fatal() {
                let problems = reporter.take_fatal();
                return Err(ContextError::configuration_problems(
                    format!(
                        "{} problem(s) found while parsing configuration sources",
                        problems.len()
                    ),
                    problems,
                ));
            }

            log.registered
                .extend(materializer.materialize(parsed, registry, &mut skipped)?);
            pending = registry
                .names()?
                .into_iter()
                .filter(|name| known.insert(name.clone()))
                .collect();
        }

        let mut skipped: Vec<String> = skipped.into_iter().collect();
        skipped.sort();
        log.skipped = skipped;
        log.duration = started.elapsed();
        tracing::info!(
            "Expanded {} configuration source(s) in {} round(s): {} definition(s) registered in {:?}",
            log.parsed.len(),
            log.rounds,
            log.registered.len(),
            log.duration
        );

        let mut total = self.log.lock().map_err(|_| ContextError::lock("expansion_log"))?;
        total.rounds += log.rounds;
        total.parsed.extend(log.parsed);
        total.registered.extend(log.registered);
        total.skipped.extend(log.skipped);
        total.duration += log.duration;
        Ok(())
    }
}

impl std::fmt::Debug for ConfigurationProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationProcessor")
            .field("enhance_sources", &self.enhance_sources)
            .field("scanner", &self.scanner.is_some())
            .field("import_registry", &self.import_registry)
            .finish()
    }
}

impl FactoryPostProcessor for ConfigurationProcessor {
    fn name(&self) -> &str {
        CONFIGURATION_PROCESSOR_NAME
    }

    fn post_process_factory(&self, factory: &ObjectFactory) -> ContextResult<()> {
        self.factory_guard
            .claim(self.name(), self.identity(), factory.id())?;
        let registry = factory.registry();
        self.factory_registries
            .lock()
            .map_err(|_| ContextError::lock("configuration_processor"))?
            .insert(registry.id());

        if !self.registry_guard.contains(self.identity(), registry.id())? {
            tracing::debug!("Registry phase never ran against {}; expanding now", registry);
            self.process_registry(registry)?;
        }

        if self.enhance_sources {
            let enhanced = enhance_sources(factory)?;
            self.log
                .lock()
                .map_err(|_| ContextError::lock("expansion_log"))?
                .enhanced
                .extend(enhanced);
        }

        factory.add_interceptor(Interceptor::standard(ImportAwareInterceptor::new(
            self.import_registry.clone(),
        )))?;
        if !factory.contains_singleton(IMPORT_REGISTRY_NAME)? {
            factory.register_singleton(IMPORT_REGISTRY_NAME, Instance::Object(self.import_registry.clone()))?;
        }
        Ok(())
    }
}

impl RegistryPostProcessor for ConfigurationProcessor {
    fn post_process_registry(&self, registry: &DefinitionRegistry) -> ContextResult<()> {
        let already_factory_processed = self
            .factory_registries
            .lock()
            .map_err(|_| ContextError::lock("configuration_processor"))?
            .contains(&registry.id());
        if already_factory_processed {
            return Err(ContextError::duplicate_invocation(
                Phase::Factory,
                self.name(),
                registry.to_string(),
            ));
        }
        self.registry_guard
            .claim(self.name(), self.identity(), registry.id())?;
        self.process_registry(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, StandardEnvironment};
    use crate::metadata::{FactoryMethod, SourceModel, TypeCatalog, TypeMetadata};

    struct Clock;

    fn processor(catalog: TypeCatalog) -> ConfigurationProcessor {
        ConfigurationProcessor::new(
            Arc::new(catalog),
            Arc::new(StandardEnvironment::new(Environment::Testing)),
        )
    }

    #[test]
    fn test_cyclic_imports_converge() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::source("app::A", SourceModel::lite().with_import("app::B")))
            .with_type(TypeMetadata::source("app::B", SourceModel::lite().with_import("app::A")));
        let processor = processor(catalog);
        let registry = DefinitionRegistry::new();
        registry.register(Definition::new("a", "app::A")).unwrap();

        processor.post_process_registry(&registry).unwrap();

        let log = processor.expansion_log().unwrap();
        assert_eq!(log.parse_count("app::A"), 1);
        assert_eq!(log.parse_count("app::B"), 1);
        assert_eq!(registry.names().unwrap(), vec!["a", "app::B"]);
        assert!(registry.definition("app::B").unwrap().parsed);
    }

    #[test]
    fn test_registry_phase_twice_is_duplicate() {
        let processor = processor(TypeCatalog::new());
        let registry = DefinitionRegistry::new();

        processor.post_process_registry(&registry).unwrap();
        let err = processor.post_process_registry(&registry).unwrap_err();
        assert!(err.is_duplicate_invocation());
    }

    #[test]
    fn test_registry_phase_after_factory_phase_is_rejected() {
        let processor = processor(TypeCatalog::new());
        let factory = ObjectFactory::new(Arc::new(DefinitionRegistry::new()));

        processor.post_process_factory(&factory).unwrap();
        let err = processor.post_process_registry(factory.registry()).unwrap_err();
        assert!(err.is_duplicate_invocation());
    }

    #[test]
    fn test_factory_phase_expands_lazily_and_publishes_imports() {
        let catalog = TypeCatalog::new().with_type(TypeMetadata::source(
            "app::AppConfig",
            SourceModel::full().with_factory_method(FactoryMethod::new("clock", |_| Ok(Clock))),
        ));
        let processor = processor(catalog);
        let registry = Arc::new(DefinitionRegistry::new());
        registry.register(Definition::new("appConfig", "app::AppConfig")).unwrap();
        let factory = ObjectFactory::new(registry);

        processor.post_process_factory(&factory).unwrap();

        assert!(factory.registry().contains("clock").unwrap());
        assert!(factory.registry().definition("appConfig").unwrap().is_enhanced());
        assert!(factory
            .get_typed::<ImportRegistry>(IMPORT_REGISTRY_NAME)
            .unwrap()
            .importing_source_for("clock")
            .unwrap()
            .is_some());
        assert_eq!(
            factory.interceptor_names().unwrap(),
            vec!["importAwareInterceptor".to_string()]
        );
        assert_eq!(processor.expansion_log().unwrap().enhanced, vec!["appConfig"]);
    }

    #[test]
    fn test_fatal_problems_are_aggregated() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::source("app::One", SourceModel::lite().with_import("app::Gone")))
            .with_type(TypeMetadata::source(
                "app::Two",
                SourceModel::full().with_factory_method(FactoryMethod::new("clock", |_| Ok(Clock)).immutable()),
            ));
        let processor = processor(catalog);
        let registry = DefinitionRegistry::new();
        registry.register(Definition::new("one", "app::One")).unwrap();
        registry.register(Definition::new("two", "app::Two")).unwrap();

        let err = processor.post_process_registry(&registry).unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(err.problems().len(), 2);
        assert!(!registry.contains("clock").unwrap());
    }

    #[test]
    fn test_shared_ancestor_expands_once_without_overriding() {
        let base = SourceModel::lite()
            .with_component(Definition::new("", "app::Auditor"))
            .with_factory_method(FactoryMethod::new("clock", |_| Ok(Clock)));
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::source("app::Base", base))
            .with_type(TypeMetadata::source("app::A", SourceModel::lite().with_ancestor("app::Base")))
            .with_type(TypeMetadata::source("app::B", SourceModel::lite().with_ancestor("app::Base")));
        let processor = processor(catalog);
        let registry = DefinitionRegistry::without_overriding();
        registry.register(Definition::new("a", "app::A")).unwrap();
        registry.register(Definition::new("b", "app::B")).unwrap();

        processor.post_process_registry(&registry).unwrap();

        assert_eq!(registry.names().unwrap(), vec!["a", "b", "auditor", "clock"]);
        for name in ["auditor", "clock"] {
            let origin = processor
                .import_registry()
                .importing_source_for(name)
                .unwrap()
                .unwrap();
            assert_eq!(origin.source_name, "a");
        }
    }
}
