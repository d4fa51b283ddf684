use std::sync::{Arc, Mutex};

use crate::definitions::{Definition, ScopedProxyMode};
use crate::errors::{ContextError, ContextResult};
use crate::extensions::CreationInterceptor;
use crate::factory::{Instance, ObjectFactory};
use crate::metadata::{MetadataReader, TypeKind};
use crate::proxy::{
    DefaultProxyStrategySelector, ProxySpec, ProxyStrategy, ProxyStrategySelector, MARKER_INTERFACES,
};

/// Definition attribute marking objects that must be wrapped in a proxy
pub const AUTO_PROXY_ATTRIBUTE: &str = "elif.context.proxy.autoProxy";

/// Definition attribute forcing the concrete-type strategy for any proxy of the object
pub const PRESERVE_TARGET_TYPE_ATTRIBUTE: &str = "elif.context.proxy.preserveTargetType";

/// Restricts auto-proxying to matching user types
pub type TypeFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Intercepting surrogate standing in for a created object
#[derive(Debug)]
pub struct ProxyObject {
    strategy: ProxyStrategy,
    target: Instance,
    target_type: String,
    interfaces: Vec<String>,
}

impl ProxyObject {
    pub fn new(
        strategy: ProxyStrategy,
        target: Instance,
        target_type: impl Into<String>,
        interfaces: Vec<String>,
    ) -> Self {
        Self {
            strategy,
            target,
            target_type: target_type.into(),
            interfaces,
        }
    }

    pub fn strategy(&self) -> ProxyStrategy {
        self.strategy
    }

    pub fn target(&self) -> &Instance {
        &self.target
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Whether callers may treat the proxy as `type_name`
    pub fn exposes(&self, type_name: &str) -> bool {
        match self.strategy {
            ProxyStrategy::ConcreteType => {
                type_name == self.target_type || self.interfaces.iter().any(|i| i == type_name)
            }
            ProxyStrategy::Interface => self.interfaces.iter().any(|i| i == type_name),
        }
    }
}

/// Wraps objects whose definitions ask for a proxy
pub struct AutoProxyInterceptor {
    reader: Arc<dyn MetadataReader>,
    selector: Arc<dyn ProxyStrategySelector>,
    type_filter: Option<TypeFilter>,
    proxied: Mutex<Vec<String>>,
}

impl AutoProxyInterceptor {
    pub fn new(reader: Arc<dyn MetadataReader>) -> Self {
        Self {
            reader,
            selector: Arc::new(DefaultProxyStrategySelector),
            type_filter: None,
            proxied: Mutex::new(Vec::new()),
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn ProxyStrategySelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_type_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.type_filter = Some(Arc::new(filter));
        self
    }

    /// Names of the objects wrapped so far
    pub fn proxied_names(&self) -> ContextResult<Vec<String>> {
        Ok(self
            .proxied
            .lock()
            .map_err(|_| ContextError::lock("auto_proxy"))?
            .clone())
    }

    fn wants_proxy(&self, definition: &Definition) -> bool {
        if definition.is_infrastructure() {
            return false;
        }
        if !definition.flag(AUTO_PROXY_ATTRIBUTE) && !definition.scoped_proxy.is_proxied() {
            return false;
        }
        match &self.type_filter {
            Some(filter) => filter(definition.user_type()),
            None => true,
        }
    }

    fn proxy_spec(&self, definition: &Definition) -> ProxySpec {
        let metadata = self.reader.type_metadata(definition.user_type());
        let kind = metadata.as_ref().map(|m| m.kind).unwrap_or(TypeKind::Concrete);
        let mode = definition.scoped_proxy.effective();

        let mut spec = ProxySpec::for_target(definition.user_type(), kind);
        if let Some(metadata) = metadata {
            spec = spec.with_interfaces(metadata.interfaces.iter().cloned());
        }
        if mode.is_proxied() {
            spec = spec.with_interface(MARKER_INTERFACES[1]);
        }
        if mode == ScopedProxyMode::TargetType || definition.flag(PRESERVE_TARGET_TYPE_ATTRIBUTE) {
            spec = spec.concrete_type();
        }
        spec
    }
}

impl std::fmt::Debug for AutoProxyInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoProxyInterceptor")
            .field("type_filter", &self.type_filter.is_some())
            .field("proxied", &self.proxied)
            .finish()
    }
}

impl CreationInterceptor for AutoProxyInterceptor {
    fn name(&self) -> &str {
        "autoProxyInterceptor"
    }

    fn after_initialization(
        &self,
        instance: Instance,
        name: &str,
        factory: &ObjectFactory,
    ) -> ContextResult<Instance> {
        if !matches!(instance, Instance::Object(_) | Instance::Source(_)) {
            return Ok(instance);
        }
        let definition = match factory.registry().find(name)? {
            Some(definition) if self.wants_proxy(&definition) => definition,
            _ => return Ok(instance),
        };

        let spec = self.proxy_spec(&definition);
        let strategy = self.selector.select(&spec)?;
        tracing::debug!("Creating {} proxy for '{}'", strategy, name);

        self.proxied
            .lock()
            .map_err(|_| ContextError::lock("auto_proxy"))?
            .push(name.to_string());
        Ok(Instance::Proxy(Arc::new(ProxyObject::new(
            strategy,
            instance,
            definition.user_type(),
            spec.interfaces,
        ))))
    }
}
