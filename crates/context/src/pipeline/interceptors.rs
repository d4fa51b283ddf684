use std::sync::Arc;

use crate::definitions::Capability;
use crate::errors::ContextResult;
use crate::extensions::{sort_ranked, Interceptor, Ranked, Tier};
use crate::factory::ObjectFactory;
use crate::pipeline::{EligibilityChecker, ListenerDetector, NameLookupCache};

/// Outcome of interceptor registration
#[derive(Debug, Clone)]
pub struct InterceptorRegistration {
    /// Final chain, in invocation order
    pub chain: Vec<String>,
    pub checker: Arc<EligibilityChecker>,
}

/// Register every interceptor definition with the factory, tier by tier
///
/// The eligibility checker goes first. Each tier is instantiated only after the
/// previous one is registered, so later tiers are created through the earlier
/// ones. Merged-definition interceptors are moved to the end, then the listener
/// detector is appended last.
pub fn register_interceptors(
    factory: &ObjectFactory,
    lookup: &NameLookupCache,
    listener_detector: &Arc<ListenerDetector>,
) -> ContextResult<InterceptorRegistration> {
    let names = lookup.names_for(factory.registry(), Capability::Interceptor)?;
    let expected = factory.interceptor_count()? + 1 + names.len();
    let checker = Arc::new(EligibilityChecker::new(expected));
    factory.add_interceptor(Interceptor::Standard(checker.clone()))?;

    tracing::info!(
        "Registering {} interceptors (expecting {} in the chain)",
        names.len(),
        expected
    );

    let mut merged: Vec<Ranked<Interceptor>> = Vec::new();
    for tier in [Tier::Priority, Tier::Ordered, Tier::Unordered] {
        let mut batch = Vec::new();
        for name in &names {
            let definition = match factory.registry().find(name)? {
                Some(definition) if definition.effective_tier() == tier => definition,
                _ => continue,
            };
            let interceptor = factory.get_interceptor(name)?;
            if interceptor.is_merged_definition() {
                merged.push(Ranked::new(name.clone(), tier, definition.order, interceptor.clone()));
            }
            batch.push(Ranked::new(name.clone(), tier, definition.order, interceptor));
        }

        sort_ranked(&mut batch);
        for ranked in batch {
            tracing::debug!("Registering {} interceptor '{}'", tier, ranked.name);
            factory.add_interceptor(ranked.item)?;
        }
    }

    sort_ranked(&mut merged);
    for ranked in merged {
        factory.add_interceptor(ranked.item)?;
    }
    factory.add_interceptor(Interceptor::MergedDefinition(listener_detector.clone()))?;

    Ok(InterceptorRegistration {
        chain: factory.interceptor_names()?,
        checker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{Definition, DefinitionRegistry};
    use crate::errors::ContextResult;
    use crate::extensions::{CreationInterceptor, MergedDefinitionInterceptor};
    use crate::factory::Instance;

    struct Named(&'static str);

    impl CreationInterceptor for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    impl MergedDefinitionInterceptor for Named {
        fn post_process_merged_definition(
            &self,
            _definition: &mut Definition,
            _name: &str,
        ) -> ContextResult<()> {
            Ok(())
        }
    }

    fn standard(name: &'static str) -> Definition {
        Definition::interceptor(name, move |_| Ok(Interceptor::standard(Named(name))))
    }

    fn merged(name: &'static str) -> Definition {
        Definition::interceptor(name, move |_| Ok(Interceptor::merged_definition(Named(name))))
    }

    #[test]
    fn test_chain_order() {
        let registry = Arc::new(DefinitionRegistry::new());
        registry.register(standard("plain")).unwrap();
        registry.register(merged("merged-priority").with_tier(Tier::Priority)).unwrap();
        registry.register(standard("ordered").with_tier(Tier::Ordered).with_order(4)).unwrap();
        registry.register(standard("priority").with_tier(Tier::Priority).with_order(1)).unwrap();
        let factory = ObjectFactory::new(registry);
        let lookup = NameLookupCache::new();

        let registration =
            register_interceptors(&factory, &lookup, &Arc::new(ListenerDetector::new())).unwrap();

        assert_eq!(
            registration.chain,
            vec![
                "eligibilityChecker",
                "priority",
                "ordered",
                "plain",
                "merged-priority",
                "listenerDetector"
            ]
        );
        assert_eq!(registration.checker.expected(), 5);
    }

    struct Widget;

    #[test]
    fn test_object_built_by_a_late_tier_is_reported_but_returned() {
        let registry = Arc::new(DefinitionRegistry::new());
        for name in ["p1", "p2", "p3"] {
            registry.register(standard(name).with_tier(Tier::Priority)).unwrap();
        }
        registry
            .register(
                Definition::interceptor("o1", |factory: &ObjectFactory| {
                    factory.get_typed::<Widget>("widget")?;
                    Ok(Interceptor::standard(Named("o1")))
                })
                .with_tier(Tier::Ordered),
            )
            .unwrap();
        registry.register(standard("o2").with_tier(Tier::Ordered)).unwrap();
        registry.register(Definition::object("widget", |_| Ok(Widget))).unwrap();
        let factory = ObjectFactory::new(registry);

        let registration = register_interceptors(
            &factory,
            &NameLookupCache::new(),
            &Arc::new(ListenerDetector::new()),
        )
        .unwrap();

        assert_eq!(registration.checker.ineligible().unwrap(), vec!["widget".to_string()]);
        assert!(matches!(factory.get("widget").unwrap(), Instance::Object(_)));
        assert_eq!(factory.interceptor_count().unwrap(), 7);
    }
}
