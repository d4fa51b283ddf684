use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::definitions::{Definition, ObjectScope, Role, ScopedProxyMode};
use crate::errors::ContextResult;
use crate::factory::SourceCall;
use crate::metadata::Condition;

/// Structural nature of a type as far as proxying is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Concrete,
    Interface,
    /// A type generated at runtime to act as a proxy
    GeneratedProxy,
}

/// Whether factory methods of a configuration source are shared through the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Sibling factory-method calls are routed through the container; the source is enhanced
    Full,
    /// Factory methods are plain calls; the source is never enhanced
    Lite,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Full => "full",
            SourceMode::Lite => "lite",
        }
    }

    pub fn from_attribute(value: &Value) -> Option<Self> {
        match value.as_str() {
            Some("full") => Some(SourceMode::Full),
            Some("lite") => Some(SourceMode::Lite),
            _ => None,
        }
    }
}

pub type FactoryFn =
    Arc<dyn Fn(&SourceCall<'_>) -> ContextResult<Arc<dyn Any + Send + Sync>> + Send + Sync>;

/// A factory-method declaration on a configuration source
#[derive(Clone)]
pub struct FactoryMethod {
    pub name: String,
    pub return_type: String,
    /// Cannot be intercepted; illegal on full sources unless the method is static
    pub immutable: bool,
    /// Invoked without an instance of the declaring source
    pub is_static: bool,
    pub scope: ObjectScope,
    pub lazy: bool,
    pub role: Role,
    pub scoped_proxy: ScopedProxyMode,
    pub conditions: Vec<Condition>,
    pub attributes: HashMap<String, Value>,
    pub body: FactoryFn,
}

impl fmt::Debug for FactoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMethod")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("immutable", &self.immutable)
            .field("is_static", &self.is_static)
            .field("scope", &self.scope)
            .field("conditions", &self.conditions)
            .finish()
    }
}

impl FactoryMethod {
    pub fn new<T, F>(name: impl Into<String>, body: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&SourceCall<'_>) -> ContextResult<T> + Send + Sync + 'static,
    {
        let body: FactoryFn = Arc::new(
            move |call: &SourceCall<'_>| -> ContextResult<Arc<dyn Any + Send + Sync>> {
                let instance = body(call)?;
                Ok(Arc::new(instance))
            },
        );
        Self {
            name: name.into(),
            return_type: std::any::type_name::<T>().to_string(),
            immutable: false,
            is_static: false,
            scope: ObjectScope::Singleton,
            lazy: false,
            role: Role::Normal,
            scoped_proxy: ScopedProxyMode::Default,
            conditions: Vec::new(),
            attributes: HashMap::new(),
            body,
        }
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_scope(mut self, scope: ObjectScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_scoped_proxy(mut self, mode: ScopedProxyMode) -> Self {
        self.scoped_proxy = mode;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Declarations carried by a configuration source type
#[derive(Debug, Clone)]
pub struct SourceModel {
    pub mode: SourceMode,
    /// Explicitly declared components; an empty name is derived from the type
    pub components: Vec<Definition>,
    /// Base patterns handed to the candidate scanner
    pub scan_patterns: Vec<String>,
    /// Type names of imported configuration sources
    pub imports: Vec<String>,
    pub factory_methods: Vec<Arc<FactoryMethod>>,
    /// Type names of structural ancestors whose declarations are inherited
    pub ancestors: Vec<String>,
    pub conditions: Vec<Condition>,
}

impl SourceModel {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            mode,
            components: Vec::new(),
            scan_patterns: Vec::new(),
            imports: Vec::new(),
            factory_methods: Vec::new(),
            ancestors: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn full() -> Self {
        Self::new(SourceMode::Full)
    }

    pub fn lite() -> Self {
        Self::new(SourceMode::Lite)
    }

    pub fn with_component(mut self, component: Definition) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_scan(mut self, pattern: impl Into<String>) -> Self {
        self.scan_patterns.push(pattern.into());
        self
    }

    pub fn with_import(mut self, type_name: impl Into<String>) -> Self {
        self.imports.push(type_name.into());
        self
    }

    pub fn with_factory_method(mut self, method: FactoryMethod) -> Self {
        self.factory_methods.push(Arc::new(method));
        self
    }

    pub fn with_ancestor(mut self, type_name: impl Into<String>) -> Self {
        self.ancestors.push(type_name.into());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Structural metadata of a type, as a metadata reader exposes it
#[derive(Debug, Clone)]
pub struct TypeMetadata {
    pub name: String,
    pub kind: TypeKind,
    pub interfaces: Vec<String>,
    /// Cannot be subclassed or enhanced
    pub immutable: bool,
    pub order: Option<i32>,
    pub source: Option<Arc<SourceModel>>,
    pub attributes: HashMap<String, Value>,
}

impl TypeMetadata {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            interfaces: Vec::new(),
            immutable: false,
            order: None,
            source: None,
            attributes: HashMap::new(),
        }
    }

    pub fn concrete(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Concrete)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn generated_proxy(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::GeneratedProxy)
    }

    /// Concrete type carrying a configuration-source model
    pub fn source(name: impl Into<String>, model: SourceModel) -> Self {
        Self::concrete(name).with_source(model)
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_source(mut self, model: SourceModel) -> Self {
        self.source = Some(Arc::new(model));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_generated_proxy(&self) -> bool {
        self.kind == TypeKind::GeneratedProxy
    }
}
