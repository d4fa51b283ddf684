use std::collections::HashMap;
use std::sync::Mutex;

use crate::definitions::{Definition, ObjectScope};
use crate::errors::{ContextError, ContextResult};
use crate::extensions::{CreationInterceptor, MergedDefinitionInterceptor};
use crate::factory::{Instance, ObjectFactory};

/// Definition attribute flagging objects as event listeners
pub const LISTENER_ATTRIBUTE: &str = "elif.context.listener";

/// Warns about objects created before every interceptor is registered
///
/// Such objects are never passed through interceptors registered after them.
#[derive(Debug)]
pub struct EligibilityChecker {
    expected: usize,
    ineligible: Mutex<Vec<String>>,
}

impl EligibilityChecker {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            ineligible: Mutex::new(Vec::new()),
        }
    }

    /// Interceptor count at which the chain is complete
    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn ineligible(&self) -> ContextResult<Vec<String>> {
        Ok(self
            .ineligible
            .lock()
            .map_err(|_| ContextError::lock("eligibility_checker"))?
            .clone())
    }
}

impl CreationInterceptor for EligibilityChecker {
    fn name(&self) -> &str {
        "eligibilityChecker"
    }

    fn after_initialization(
        &self,
        instance: Instance,
        name: &str,
        factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        if instance.is_interceptor() {
            return Ok(instance);
        }
        let infrastructure = factory
            .registry()
            .find(name)?
            .map(|definition| definition.is_infrastructure())
            .unwrap_or(false);
        if infrastructure {
            return Ok(instance);
        }

        let registered = factory.interceptor_count()?;
        if registered < self.expected {
            tracing::warn!(
                "Object '{}' ({}) is not eligible for getting processed by all interceptors \
                 ({} of {} registered): for example, it is not eligible for auto-proxying",
                name,
                instance.kind_name(),
                registered,
                self.expected
            );
            self.ineligible
                .lock()
                .map_err(|_| ContextError::lock("eligibility_checker"))?
                .push(name.to_string());
        }
        Ok(instance)
    }
}

/// Records created singletons whose definitions are flagged as listeners
#[derive(Debug, Default)]
pub struct ListenerDetector {
    singleton_flags: Mutex<HashMap<String, bool>>,
    listeners: Mutex<Vec<String>>,
}

impl ListenerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listeners(&self) -> ContextResult<Vec<String>> {
        Ok(self
            .listeners
            .lock()
            .map_err(|_| ContextError::lock("listener_detector"))?
            .clone())
    }
}

impl CreationInterceptor for ListenerDetector {
    fn name(&self) -> &str {
        "listenerDetector"
    }

    fn after_initialization(
        &self,
        instance: Instance,
        name: &str,
        _factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        let flag = self
            .singleton_flags
            .lock()
            .map_err(|_| ContextError::lock("listener_detector"))?
            .get(name)
            .copied();

        match flag {
            Some(true) => {
                let mut listeners = self
                    .listeners
                    .lock()
                    .map_err(|_| ContextError::lock("listener_detector"))?;
                if !listeners.iter().any(|l| l == name) {
                    tracing::debug!("Detected listener '{}'", name);
                    listeners.push(name.to_string());
                }
            }
            Some(false) => tracing::warn!(
                "Listener '{}' is not a singleton: it will not be tracked as a listener",
                name
            ),
            None => {}
        }
        Ok(instance)
    }
}

impl MergedDefinitionInterceptor for ListenerDetector {
    fn post_process_merged_definition(
        &self,
        definition: &mut Definition,
        name: &str,
    ) -> ContextResult<()> {
        if definition.flag(LISTENER_ATTRIBUTE) {
            self.singleton_flags
                .lock()
                .map_err(|_| ContextError::lock("listener_detector"))?
                .insert(name.to_string(), definition.scope == ObjectScope::Singleton);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{DefinitionRegistry, Role};
    use crate::extensions::Interceptor;
    use std::sync::Arc;

    struct Audit;

    #[test]
    fn test_checker_records_early_objects_but_returns_them() {
        let registry = Arc::new(DefinitionRegistry::new());
        registry.register(Definition::object("audit", |_| Ok(Audit))).unwrap();
        registry
            .register(Definition::object("plumbing", |_| Ok(Audit)).with_role(Role::Infrastructure))
            .unwrap();
        let factory = ObjectFactory::new(registry);
        let checker = Arc::new(EligibilityChecker::new(3));
        factory.add_interceptor(Interceptor::Standard(checker.clone())).unwrap();

        assert!(factory.get_typed::<Audit>("audit").is_ok());
        assert!(factory.get("plumbing").is_ok());

        assert_eq!(checker.ineligible().unwrap(), vec!["audit".to_string()]);
    }

    #[test]
    fn test_listener_detector_tracks_singleton_listeners() {
        let registry = Arc::new(DefinitionRegistry::new());
        registry
            .register(Definition::object("onSignup", |_| Ok(Audit)).with_attribute(LISTENER_ATTRIBUTE, true))
            .unwrap();
        registry
            .register(
                Definition::object("perRequest", |_| Ok(Audit))
                    .with_attribute(LISTENER_ATTRIBUTE, true)
                    .with_scope(ObjectScope::Prototype),
            )
            .unwrap();
        registry.register(Definition::object("plain", |_| Ok(Audit))).unwrap();
        let factory = ObjectFactory::new(registry);
        let detector = Arc::new(ListenerDetector::new());
        factory
            .add_interceptor(Interceptor::MergedDefinition(detector.clone()))
            .unwrap();

        for name in ["onSignup", "perRequest", "plain"] {
            factory.get(name).unwrap();
        }

        assert_eq!(detector.listeners().unwrap(), vec!["onSignup".to_string()]);
    }
}
