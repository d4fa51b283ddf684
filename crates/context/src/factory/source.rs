use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::definitions::ImportOrigin;
use crate::errors::{ContextError, ContextResult};
use crate::factory::{Instance, ObjectFactory};
use crate::metadata::{FactoryMethod, SourceMode};

/// Runtime shape of a configuration source: its type and every factory method it can invoke
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub type_name: String,
    pub mode: SourceMode,
    /// Own methods first, then inherited ones not shadowed by name
    pub methods: Vec<Arc<FactoryMethod>>,
}

impl SourceSpec {
    pub fn new(type_name: impl Into<String>, mode: SourceMode) -> Self {
        Self {
            type_name: type_name.into(),
            mode,
            methods: Vec::new(),
        }
    }

    /// Add methods, skipping any whose name is already declared
    pub fn with_methods<'a>(mut self, methods: impl IntoIterator<Item = &'a Arc<FactoryMethod>>) -> Self {
        for method in methods {
            if self.method(&method.name).is_none() {
                self.methods.push(method.clone());
            }
        }
        self
    }

    pub fn method(&self, name: &str) -> Option<&Arc<FactoryMethod>> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Run a method body without a source instance; sibling calls are never routed
    pub fn invoke_static(&self, method: &str, factory: &ObjectFactory) -> ContextResult<Instance> {
        SourceCall::new(self, None, factory, method).call(method)
    }
}

/// Enhanced source: sibling method calls resolve through the factory by definition name
#[derive(Debug, Clone)]
pub struct EnhancedSpec {
    pub spec: SourceSpec,
    /// Factory-method name to the definition it produced
    pub bindings: HashMap<String, String>,
}

impl EnhancedSpec {
    pub fn new(spec: SourceSpec, bindings: HashMap<String, String>) -> Self {
        Self { spec, bindings }
    }
}

/// A live configuration source
#[derive(Debug)]
pub struct SourceInstance {
    name: String,
    spec: Arc<SourceSpec>,
    bindings: Option<HashMap<String, String>>,
    import_origin: OnceLock<ImportOrigin>,
}

impl SourceInstance {
    pub fn plain(name: impl Into<String>, spec: Arc<SourceSpec>) -> Self {
        Self {
            name: name.into(),
            spec,
            bindings: None,
            import_origin: OnceLock::new(),
        }
    }

    pub fn enhanced(name: impl Into<String>, enhanced: &EnhancedSpec) -> Self {
        Self {
            name: name.into(),
            spec: Arc::new(enhanced.spec.clone()),
            bindings: Some(enhanced.bindings.clone()),
            import_origin: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.spec.type_name
    }

    pub fn is_enhanced(&self) -> bool {
        self.bindings.is_some()
    }

    /// Run one of this source's factory-method bodies; sibling calls inside it may be routed
    pub fn invoke(&self, method: &str, factory: &ObjectFactory) -> ContextResult<Instance> {
        SourceCall::new(&self.spec, self.bindings.as_ref(), factory, method).call(method)
    }

    /// Record the source that imported this one; only the first call takes effect
    pub fn set_import_origin(&self, origin: ImportOrigin) -> bool {
        self.import_origin.set(origin).is_ok()
    }

    pub fn import_origin(&self) -> Option<&ImportOrigin> {
        self.import_origin.get()
    }
}

/// Handle passed to a factory-method body
///
/// Calling a sibling method through [`SourceCall::call`] on an enhanced source returns
/// the container-managed object for that method instead of running the body again.
#[derive(Clone, Copy)]
pub struct SourceCall<'a> {
    spec: &'a SourceSpec,
    bindings: Option<&'a HashMap<String, String>>,
    factory: &'a ObjectFactory,
    current: &'a str,
}

impl<'a> SourceCall<'a> {
    pub(crate) fn new(
        spec: &'a SourceSpec,
        bindings: Option<&'a HashMap<String, String>>,
        factory: &'a ObjectFactory,
        current: &'a str,
    ) -> Self {
        Self {
            spec,
            bindings,
            factory,
            current,
        }
    }

    pub fn factory(&self) -> &'a ObjectFactory {
        self.factory
    }

    /// Name of the method whose body is running
    pub fn method_name(&self) -> &'a str {
        self.current
    }

    pub fn source_type(&self) -> &'a str {
        &self.spec.type_name
    }

    pub fn call(&self, method: &str) -> ContextResult<Instance> {
        if method != self.current {
            if let Some(definition) = self.bindings.and_then(|b| b.get(method)) {
                tracing::trace!(
                    "Routing '{}::{}' through the factory as '{}'",
                    self.spec.type_name,
                    method,
                    definition
                );
                return self.factory.get(definition);
            }
        }

        let target = self.spec.method(method).ok_or_else(|| {
            ContextError::configuration(format!(
                "No factory method '{}' on configuration source '{}'",
                method, self.spec.type_name
            ))
        })?;
        let nested = SourceCall {
            current: target.name.as_str(),
            ..*self
        };
        (target.body)(&nested).map(Instance::Object)
    }

    /// Call a sibling method and downcast its result
    pub fn get<T: Send + Sync + 'static>(&self, method: &str) -> ContextResult<Arc<T>> {
        let instance = self.call(method)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| ContextError::unexpected_instance(method, std::any::type_name::<T>()))
    }
}
