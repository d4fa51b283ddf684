use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::bootstrap::BootstrapStats;
use crate::config::{BootstrapConfig, PropertyResolver, StandardEnvironment};
use crate::definitions::{Definition, DefinitionRegistry, ImportRegistry, Role};
use crate::errors::{ContextError, ContextResult, Phase};
use crate::expansion::{ConfigurationProcessor, ExpansionLog};
use crate::extensions::{Extension, Interceptor, Tier};
use crate::factory::ObjectFactory;
use crate::metadata::{CandidateScanner, MetadataReader, TypeCatalog};
use crate::pipeline::{register_interceptors, InvocationReport, ListenerDetector, PostProcessorPipeline};
use crate::proxy::AutoProxyInterceptor;

/// Reserved name of the auto-proxy interceptor definition
pub const AUTO_PROXY_NAME: &str = "elif.context.internal.autoProxyInterceptor";

/// Results recorded by a completed refresh
#[derive(Debug, Clone, Default)]
struct RefreshOutcome {
    report: InvocationReport,
    chain: Vec<String>,
    ineligible: Vec<String>,
    stats: BootstrapStats,
}

/// One container startup: registry, factory and the pipeline that prepares them
pub struct BootstrapContext {
    config: BootstrapConfig,
    factory: ObjectFactory,
    processor: Arc<ConfigurationProcessor>,
    pipeline: PostProcessorPipeline,
    listener_detector: Arc<ListenerDetector>,
    auto_proxy: Option<Arc<AutoProxyInterceptor>>,
    extensions: Vec<Extension>,
    refreshed: AtomicBool,
    outcome: RwLock<Option<RefreshOutcome>>,
}

impl BootstrapContext {
    pub fn builder() -> BootstrapBuilder {
        BootstrapBuilder::new()
    }

    /// Run post-processing, interceptor registration and eager instantiation
    ///
    /// A context refreshes once; a second call fails with a duplicate invocation error.
    pub fn refresh(&self) -> ContextResult<BootstrapStats> {
        if self.refreshed.swap(true, Ordering::SeqCst) {
            return Err(ContextError::duplicate_invocation(
                Phase::Refresh,
                "bootstrapContext",
                self.factory.to_string(),
            ));
        }

        tracing::info!("Starting bootstrap refresh ({} profile)...", self.config.profile);
        let start_time = Instant::now();
        let mut stats = BootstrapStats::new();

        let phase_start = Instant::now();
        let report = self
            .pipeline
            .invoke_factory_post_processors(&self.factory, &self.extensions)?;
        stats.post_processing_time = phase_start.elapsed();
        stats.extension_count = report.factory_phase.len();

        let phase_start = Instant::now();
        let registration =
            register_interceptors(&self.factory, self.pipeline.lookup(), &self.listener_detector)?;
        stats.interceptor_registration_time = phase_start.elapsed();
        stats.interceptor_count = registration.chain.len();

        if self.config.eager_singletons {
            let phase_start = Instant::now();
            stats.singleton_count = self.factory.pre_instantiate_singletons()?;
            stats.instantiation_time = phase_start.elapsed();
        }

        stats.definition_count = self.factory.registry().len()?;
        stats.total_time = start_time.elapsed();

        tracing::info!(
            "Bootstrap completed successfully in {:?} with {} definitions",
            stats.total_time,
            stats.definition_count
        );
        if self.config.log_summary {
            stats.log_summary();
        }

        let outcome = RefreshOutcome {
            report,
            chain: registration.chain,
            ineligible: registration.checker.ineligible()?,
            stats: stats.clone(),
        };
        *self
            .outcome
            .write()
            .map_err(|_| ContextError::lock("bootstrap_outcome"))? = Some(outcome);

        Ok(stats)
    }

    pub fn is_refreshed(&self) -> bool {
        self.refreshed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn factory(&self) -> &ObjectFactory {
        &self.factory
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        self.factory.registry()
    }

    /// Resolve an object and downcast it
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> ContextResult<Arc<T>> {
        self.factory.get_typed(name)
    }

    pub fn import_registry(&self) -> &Arc<ImportRegistry> {
        self.processor.import_registry()
    }

    pub fn expansion_log(&self) -> ContextResult<ExpansionLog> {
        self.processor.expansion_log()
    }

    /// Singletons created so far whose definitions are flagged as listeners
    pub fn listeners(&self) -> ContextResult<Vec<String>> {
        self.listener_detector.listeners()
    }

    /// Names wrapped by the auto-proxy interceptor, empty when it is not installed
    pub fn proxied_names(&self) -> ContextResult<Vec<String>> {
        match &self.auto_proxy {
            Some(auto_proxy) => auto_proxy.proxied_names(),
            None => Ok(Vec::new()),
        }
    }

    /// Extension invocation order of the last refresh
    pub fn report(&self) -> ContextResult<Option<InvocationReport>> {
        self.with_outcome(|outcome| outcome.report.clone())
    }

    /// Interceptor chain as registered by the last refresh
    pub fn interceptor_chain(&self) -> ContextResult<Vec<String>> {
        Ok(self
            .with_outcome(|outcome| outcome.chain.clone())?
            .unwrap_or_default())
    }

    /// Objects created before every interceptor was registered
    pub fn ineligible_objects(&self) -> ContextResult<Vec<String>> {
        Ok(self
            .with_outcome(|outcome| outcome.ineligible.clone())?
            .unwrap_or_default())
    }

    pub fn stats(&self) -> ContextResult<Option<BootstrapStats>> {
        self.with_outcome(|outcome| outcome.stats.clone())
    }

    fn with_outcome<T>(&self, read: impl FnOnce(&RefreshOutcome) -> T) -> ContextResult<Option<T>> {
        Ok(self
            .outcome
            .read()
            .map_err(|_| ContextError::lock("bootstrap_outcome"))?
            .as_ref()
            .map(read))
    }
}

impl std::fmt::Debug for BootstrapContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapContext")
            .field("config", &self.config)
            .field("factory", &self.factory.to_string())
            .field("extensions", &self.extensions.len())
            .field("auto_proxy", &self.auto_proxy.is_some())
            .field("refreshed", &self.is_refreshed())
            .finish()
    }
}

/// Builder for bootstrap contexts
pub struct BootstrapBuilder {
    config: BootstrapConfig,
    reader: Option<Arc<dyn MetadataReader>>,
    resolver: Option<Arc<dyn PropertyResolver>>,
    scanner: Option<Arc<dyn CandidateScanner>>,
    definitions: Vec<Definition>,
    extensions: Vec<Extension>,
    auto_proxy: Option<AutoProxyInterceptor>,
}

impl BootstrapBuilder {
    pub fn new() -> Self {
        Self {
            config: BootstrapConfig::default(),
            reader: None,
            resolver: None,
            scanner: None,
            definitions: Vec::new(),
            extensions: Vec::new(),
            auto_proxy: None,
        }
    }

    pub fn with_config(mut self, config: BootstrapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PropertyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn CandidateScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Register a definition before refresh
    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_definitions(mut self, definitions: impl IntoIterator<Item = Definition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Add an extension that runs ahead of every discovered one, in the order added
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Install the auto-proxy interceptor as an ordered-tier interceptor definition
    pub fn with_auto_proxy(mut self, auto_proxy: AutoProxyInterceptor) -> Self {
        self.auto_proxy = Some(auto_proxy);
        self
    }

    pub fn build(self) -> ContextResult<BootstrapContext> {
        let registry = if self.config.allow_definition_overriding {
            DefinitionRegistry::new()
        } else {
            DefinitionRegistry::without_overriding()
        };
        let registry = Arc::new(registry);

        let reader = self
            .reader
            .unwrap_or_else(|| Arc::new(TypeCatalog::new()) as Arc<dyn MetadataReader>);
        let resolver = self.resolver.unwrap_or_else(|| {
            Arc::new(StandardEnvironment::new(self.config.profile)) as Arc<dyn PropertyResolver>
        });

        let mut processor = ConfigurationProcessor::new(reader, resolver)
            .with_enhancement(self.config.enhance_sources);
        if let Some(scanner) = self.scanner {
            processor = processor.with_scanner(scanner);
        }
        let processor = Arc::new(processor);
        registry.register(processor.clone().into_definition())?;

        let auto_proxy = self.auto_proxy.map(Arc::new);
        if let Some(auto_proxy) = &auto_proxy {
            let interceptor = auto_proxy.clone();
            registry.register(
                Definition::interceptor(AUTO_PROXY_NAME, move |_| {
                    Ok(Interceptor::Standard(interceptor.clone()))
                })
                .with_role(Role::Infrastructure)
                .with_tier(Tier::Ordered),
            )?;
        }

        for definition in self.definitions {
            registry.register(definition)?;
        }

        let factory = ObjectFactory::new(registry);
        let listener_detector = Arc::new(ListenerDetector::new());
        factory.add_interceptor(Interceptor::MergedDefinition(listener_detector.clone()))?;

        tracing::debug!(
            "Built bootstrap context over {} with {} explicit extensions",
            factory.registry(),
            self.extensions.len()
        );

        Ok(BootstrapContext {
            config: self.config,
            factory,
            processor,
            pipeline: PostProcessorPipeline::new(),
            listener_detector,
            auto_proxy,
            extensions: self.extensions,
            refreshed: AtomicBool::new(false),
            outcome: RwLock::new(None),
        })
    }
}

impl Default for BootstrapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::IMPORT_REGISTRY_NAME;
    use crate::expansion::CONFIGURATION_PROCESSOR_NAME;
    use crate::pipeline::LISTENER_ATTRIBUTE;
    use crate::proxy::AUTO_PROXY_ATTRIBUTE;

    struct Mailer;
    struct AuditListener;

    fn testing() -> BootstrapBuilder {
        BootstrapContext::builder().with_config(BootstrapConfig::testing())
    }

    #[test]
    fn test_refresh_registers_infrastructure() {
        let context = testing()
            .with_definition(Definition::object("mailer", |_| Ok(Mailer)))
            .build()
            .unwrap();

        let stats = context.refresh().unwrap();

        assert!(context.is_refreshed());
        assert_eq!(stats.singleton_count, 0);
        assert!(context.registry().contains(CONFIGURATION_PROCESSOR_NAME).unwrap());
        assert!(context.factory().contains_singleton(IMPORT_REGISTRY_NAME).unwrap());

        let report = context.report().unwrap().unwrap();
        assert_eq!(report.registry_phase, vec![CONFIGURATION_PROCESSOR_NAME]);
        assert_eq!(report.factory_phase, vec![CONFIGURATION_PROCESSOR_NAME]);

        assert_eq!(
            context.interceptor_chain().unwrap(),
            vec!["importAwareInterceptor", "eligibilityChecker", "listenerDetector"]
        );
    }

    #[test]
    fn test_second_refresh_is_rejected() {
        let context = testing().build().unwrap();
        context.refresh().unwrap();

        let err = context.refresh().unwrap_err();
        assert!(err.is_duplicate_invocation());
    }

    #[test]
    fn test_eager_singletons_and_listeners() {
        let config = BootstrapConfig {
            eager_singletons: true,
            ..BootstrapConfig::testing()
        };
        let context = BootstrapContext::builder()
            .with_config(config)
            .with_definition(Definition::object("mailer", |_| Ok(Mailer)))
            .with_definition(
                Definition::object("audit", |_| Ok(AuditListener)).with_attribute(LISTENER_ATTRIBUTE, true),
            )
            .with_definition(Definition::object("report", |_| Ok(Mailer)).lazy())
            .build()
            .unwrap();

        let stats = context.refresh().unwrap();

        assert_eq!(stats.singleton_count, 2);
        assert!(!context.factory().contains_singleton("report").unwrap());
        assert_eq!(context.listeners().unwrap(), vec!["audit"]);
        assert!(context.ineligible_objects().unwrap().is_empty());
    }

    #[test]
    fn test_overriding_disallowed_by_config() {
        let result = BootstrapContext::builder()
            .with_config(BootstrapConfig::production())
            .with_definition(Definition::object("mailer", |_| Ok(Mailer)))
            .with_definition(Definition::object("mailer", |_| Ok(AuditListener)))
            .build();

        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_auto_proxy_is_installed_as_interceptor() {
        let context = testing()
            .with_auto_proxy(AutoProxyInterceptor::new(Arc::new(TypeCatalog::new())))
            .with_definition(
                Definition::object("mailer", |_| Ok(Mailer)).with_attribute(AUTO_PROXY_ATTRIBUTE, true),
            )
            .build()
            .unwrap();
        context.refresh().unwrap();

        assert!(context.interceptor_chain().unwrap().iter().any(|n| n == "autoProxyInterceptor"));
        let mailer = context.get::<Mailer>("mailer");
        assert!(mailer.is_ok());
        assert_eq!(context.proxied_names().unwrap(), vec!["mailer"]);
    }
}
