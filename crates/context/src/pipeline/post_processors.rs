use std::collections::HashSet;

use serde::Serialize;

use crate::definitions::{Capability, DefinitionRegistry};
use crate::errors::{ContextResult, Phase};
use crate::extensions::{sort_ranked, Extension, ExtensionKind, Ranked, Tier};
use crate::factory::ObjectFactory;
use crate::pipeline::{NameLookupCache, ProcessedGuard};

/// What a pipeline run invoked, in invocation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    pub registry_phase: Vec<String>,
    pub factory_phase: Vec<String>,
    /// Extensions passed over because they were under construction
    pub skipped: Vec<String>,
}

impl InvocationReport {
    pub fn invoked(&self) -> usize {
        self.registry_phase.len() + self.factory_phase.len()
    }
}

/// Names handled during one pipeline run
#[derive(Debug, Default)]
struct RunState {
    processed: HashSet<String>,
    deferred: HashSet<String>,
    report: InvocationReport,
}

/// Runs bootstrap extensions in tier order
///
/// Explicit registry-mutating extensions run first in caller order. Registry
/// extensions are then discovered in waves (priority, ordered, then unordered
/// until a pass finds nothing new), re-querying the registry before each wave.
/// Factory callbacks follow: every registry extension invoked so far, explicit
/// factory-only extensions, then discovered factory-only extensions by tier.
#[derive(Debug)]
pub struct PostProcessorPipeline {
    registry_guard: ProcessedGuard,
    factory_guard: ProcessedGuard,
    lookup: NameLookupCache,
}

impl PostProcessorPipeline {
    pub fn new() -> Self {
        Self {
            registry_guard: ProcessedGuard::new(Phase::Registry),
            factory_guard: ProcessedGuard::new(Phase::Factory),
            lookup: NameLookupCache::new(),
        }
    }

    pub fn lookup(&self) -> &NameLookupCache {
        &self.lookup
    }

    pub fn invoke_factory_post_processors(
        &self,
        factory: &ObjectFactory,
        explicit: &[Extension],
    ) -> ContextResult<InvocationReport> {
        let registry = factory.registry().clone();
        let mut state = RunState::default();
        let mut registry_extensions: Vec<Extension> = Vec::new();
        let mut factory_only: Vec<Extension> = Vec::new();

        tracing::info!(
            "Invoking factory post-processors: {} explicit, registry {}",
            explicit.len(),
            registry
        );

        for extension in explicit {
            match extension.kind() {
                ExtensionKind::RegistryMutating => {
                    self.invoke_registry(extension, &registry, &mut state)?;
                    registry_extensions.push(extension.clone());
                }
                ExtensionKind::FactoryOnly => factory_only.push(extension.clone()),
            }
        }

        for tier in [Tier::Priority, Tier::Ordered] {
            let wave = self.discover(factory, ExtensionKind::RegistryMutating, Some(tier), &mut state)?;
            for ranked in wave {
                self.invoke_registry(&ranked.item, &registry, &mut state)?;
                registry_extensions.push(ranked.item);
            }
        }

        loop {
            let wave = self.discover(factory, ExtensionKind::RegistryMutating, None, &mut state)?;
            if wave.is_empty() {
                break;
            }
            for ranked in wave {
                self.invoke_registry(&ranked.item, &registry, &mut state)?;
                registry_extensions.push(ranked.item);
            }
        }

        for extension in registry_extensions.iter().chain(factory_only.iter()) {
            self.invoke_factory(extension, factory, &mut state)?;
        }

        for tier in [Tier::Priority, Tier::Ordered, Tier::Unordered] {
            let batch = self.discover(factory, ExtensionKind::FactoryOnly, Some(tier), &mut state)?;
            for ranked in batch {
                self.invoke_factory(&ranked.item, factory, &mut state)?;
            }
        }

        tracing::info!(
            "Factory post-processing complete: {} registry callbacks, {} factory callbacks, {} skipped",
            state.report.registry_phase.len(),
            state.report.factory_phase.len(),
            state.report.skipped.len()
        );
        Ok(state.report)
    }

    /// Resolve unprocessed extensions of `kind`, optionally restricted to one tier, sorted
    fn discover(
        &self,
        factory: &ObjectFactory,
        kind: ExtensionKind,
        tier: Option<Tier>,
        state: &mut RunState,
    ) -> ContextResult<Vec<Ranked<Extension>>> {
        let registry = factory.registry();
        let names = self.lookup.names_for(registry, Capability::Extension(kind))?;

        let mut found = Vec::new();
        for name in names {
            if state.processed.contains(&name) || state.deferred.contains(&name) {
                continue;
            }
            let definition = match registry.find(&name)? {
                Some(definition) => definition,
                None => continue,
            };
            let definition_tier = definition.effective_tier();
            if tier.map_or(false, |wanted| wanted != definition_tier) {
                continue;
            }

            match factory.get_extension(&name) {
                Ok(extension) => {
                    state.processed.insert(name.clone());
                    found.push(Ranked::new(name, definition_tier, definition.order, extension));
                }
                Err(err) if err.is_currently_in_creation() => {
                    tracing::trace!("Skipping extension '{}' for this wave: {}", name, err);
                    state.deferred.insert(name.clone());
                    state.report.skipped.push(name);
                }
                Err(err) => return Err(err),
            }
        }

        sort_ranked(&mut found);
        Ok(found)
    }

    fn invoke_registry(
        &self,
        extension: &Extension,
        registry: &DefinitionRegistry,
        state: &mut RunState,
    ) -> ContextResult<()> {
        if let Extension::RegistryMutating(processor) = extension {
            self.registry_guard.claim_retaining(
                extension.name(),
                extension.identity(),
                registry.id(),
                extension.clone(),
            )?;
            tracing::debug!("Invoking registry post-processor '{}'", extension.name());
            processor.post_process_registry(registry)?;
            state.report.registry_phase.push(extension.name().to_string());
        }
        Ok(())
    }

    fn invoke_factory(
        &self,
        extension: &Extension,
        factory: &ObjectFactory,
        state: &mut RunState,
    ) -> ContextResult<()> {
        self.factory_guard.claim_retaining(
            extension.name(),
            extension.identity(),
            factory.id(),
            extension.clone(),
        )?;
        tracing::debug!("Invoking factory post-processor '{}'", extension.name());

        let generation = factory.registry().generation();
        extension.post_process_factory(factory)?;
        if extension.kind() == ExtensionKind::FactoryOnly && factory.registry().generation() != generation {
            tracing::warn!(
                "Factory-only post-processor '{}' changed the definition set; only attribute rewrites are expected",
                extension.name()
            );
        }

        state.report.factory_phase.push(extension.name().to_string());
        Ok(())
    }
}

impl Default for PostProcessorPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::Definition;
    use crate::extensions::{FactoryPostProcessor, RegistryPostProcessor};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        label: String,
        log: Log,
    }

    impl FactoryPostProcessor for Recorder {
        fn name(&self) -> &str {
            &self.label
        }

        fn post_process_factory(&self, _factory: &ObjectFactory) -> ContextResult<()> {
            self.log.lock().unwrap().push(format!("factory:{}", self.label));
            Ok(())
        }
    }

    impl RegistryPostProcessor for Recorder {
        fn post_process_registry(&self, _registry: &DefinitionRegistry) -> ContextResult<()> {
            self.log.lock().unwrap().push(format!("registry:{}", self.label));
            Ok(())
        }
    }

    fn recorder(label: &str, log: &Log) -> Recorder {
        Recorder {
            label: label.to_string(),
            log: log.clone(),
        }
    }

    fn registry_extension(name: &str, log: &Log) -> Definition {
        let log = log.clone();
        let label = name.to_string();
        Definition::registry_post_processor(name, move |_| Ok(recorder(&label, &log)))
    }

    #[test]
    fn test_registry_waves_follow_tiers() {
        let log: Log = Arc::default();
        let registry = Arc::new(DefinitionRegistry::new());
        registry.register(registry_extension("plain", &log)).unwrap();
        registry
            .register(registry_extension("ordered", &log).with_tier(Tier::Ordered).with_order(1))
            .unwrap();
        registry
            .register(registry_extension("priority-late", &log).with_tier(Tier::Priority).with_order(9))
            .unwrap();
        registry
            .register(registry_extension("priority-early", &log).with_tier(Tier::Priority).with_order(2))
            .unwrap();
        let factory = ObjectFactory::new(registry);

        let report = PostProcessorPipeline::new()
            .invoke_factory_post_processors(&factory, &[])
            .unwrap();

        assert_eq!(
            report.registry_phase,
            vec!["priority-early", "priority-late", "ordered", "plain"]
        );
        assert_eq!(report.factory_phase, report.registry_phase);
    }

    #[test]
    fn test_explicit_extensions_run_first_in_caller_order() {
        let log: Log = Arc::default();
        let registry = Arc::new(DefinitionRegistry::new());
        registry
            .register(registry_extension("discovered", &log).with_tier(Tier::Priority))
            .unwrap();
        let factory = ObjectFactory::new(registry);
        let explicit = vec![
            Extension::registry_mutating(recorder("second-by-order", &log)),
            Extension::factory_only(recorder("factory-only", &log)),
            Extension::registry_mutating(recorder("first-by-order", &log)),
        ];

        PostProcessorPipeline::new()
            .invoke_factory_post_processors(&factory, &explicit)
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "registry:second-by-order",
                "registry:first-by-order",
                "registry:discovered",
                "factory:second-by-order",
                "factory:first-by-order",
                "factory:discovered",
                "factory:factory-only",
            ]
        );
    }

    struct Spawner {
        log: Log,
    }

    impl FactoryPostProcessor for Spawner {
        fn name(&self) -> &str {
            "spawner"
        }

        fn post_process_factory(&self, _factory: &ObjectFactory) -> ContextResult<()> {
            Ok(())
        }
    }

    impl RegistryPostProcessor for Spawner {
        fn post_process_registry(&self, registry: &DefinitionRegistry) -> ContextResult<()> {
            registry.register(registry_extension("spawned", &self.log))
        }
    }

    #[test]
    fn test_unordered_wave_repeats_until_nothing_new() {
        let log: Log = Arc::default();
        let registry = Arc::new(DefinitionRegistry::new());
        let spawner_log = log.clone();
        registry
            .register(Definition::registry_post_processor("spawner", move |_| {
                Ok(Spawner { log: spawner_log.clone() })
            }))
            .unwrap();
        let factory = ObjectFactory::new(registry);

        let report = PostProcessorPipeline::new()
            .invoke_factory_post_processors(&factory, &[])
            .unwrap();

        assert_eq!(report.registry_phase, vec!["spawner", "spawned"]);
    }

    #[test]
    fn test_in_creation_extension_is_skipped() {
        let log: Log = Arc::default();
        let registry = Arc::new(DefinitionRegistry::new());
        registry.register(registry_extension("busy", &log)).unwrap();
        registry.register(registry_extension("free", &log)).unwrap();
        let factory = ObjectFactory::new(registry);

        let report = {
            let _busy = factory.mark_in_creation("busy").unwrap();
            PostProcessorPipeline::new()
                .invoke_factory_post_processors(&factory, &[])
                .unwrap()
        };

        assert_eq!(report.registry_phase, vec!["free"]);
        assert_eq!(report.skipped, vec!["busy"]);
    }

    #[test]
    fn test_second_factory_callback_on_same_factory_is_duplicate() {
        let log: Log = Arc::default();
        let factory = ObjectFactory::new(Arc::new(DefinitionRegistry::new()));
        let explicit = vec![Extension::factory_only(recorder("once", &log))];
        let pipeline = PostProcessorPipeline::new();

        pipeline.invoke_factory_post_processors(&factory, &explicit).unwrap();
        let err = pipeline
            .invoke_factory_post_processors(&factory, &explicit)
            .unwrap_err();

        assert!(err.is_duplicate_invocation());
        assert_eq!(*log.lock().unwrap(), vec!["factory:once"]);
    }

    #[test]
    fn test_processed_extension_stays_alive_with_pipeline() {
        let log: Log = Arc::default();
        let factory = ObjectFactory::new(Arc::new(DefinitionRegistry::new()));
        let pipeline = PostProcessorPipeline::new();
        let weak = {
            let processor = Arc::new(recorder("transient", &log));
            let weak = Arc::downgrade(&processor);
            let explicit = vec![Extension::FactoryOnly(processor)];
            pipeline.invoke_factory_post_processors(&factory, &explicit).unwrap();
            weak
        };

        assert!(weak.upgrade().is_some());
        assert_eq!(*log.lock().unwrap(), vec!["factory:transient"]);
    }

    #[test]
    fn test_factory_only_tiers() {
        let log: Log = Arc::default();
        let registry = Arc::new(DefinitionRegistry::new());
        for (name, tier, order) in [
            ("rest", Tier::Unordered, None),
            ("ordered", Tier::Ordered, Some(3)),
            ("priority", Tier::Priority, Some(100)),
        ] {
            let log = log.clone();
            let label = name.to_string();
            let mut definition =
                Definition::factory_post_processor(name, move |_| Ok(recorder(&label, &log))).with_tier(tier);
            definition.order = order;
            registry.register(definition).unwrap();
        }
        let factory = ObjectFactory::new(registry);

        let report = PostProcessorPipeline::new()
            .invoke_factory_post_processors(&factory, &[])
            .unwrap();

        assert!(report.registry_phase.is_empty());
        assert_eq!(report.factory_phase, vec!["priority", "ordered", "rest"]);
    }
}
