use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::definitions::{ObjectScope, Role, ScopedProxyMode};
use crate::errors::ContextResult;
use crate::extensions::{
    Extension, ExtensionKind, FactoryPostProcessor, Interceptor, RegistryPostProcessor, Tier,
};
use crate::factory::{EnhancedSpec, ObjectFactory, SourceSpec};
use crate::metadata::FactoryMethod;

/// Separator between the user type name and the enhancement tag
pub const ENHANCED_TYPE_SEPARATOR: &str = "$$";

/// Tag appended to the type name of enhanced configuration sources
pub const ENHANCED_TYPE_TAG: &str = "$$Enhanced";

/// Strip any enhancement tag from a type name
pub fn user_type_name(type_name: &str) -> &str {
    match type_name.find(ENHANCED_TYPE_SEPARATOR) {
        Some(index) => &type_name[..index],
        None => type_name,
    }
}

pub type ObjectFn = Arc<dyn Fn(&ObjectFactory) -> ContextResult<Arc<dyn Any + Send + Sync>> + Send + Sync>;
pub type ExtensionFn = Arc<dyn Fn(&ObjectFactory) -> ContextResult<Extension> + Send + Sync>;
pub type InterceptorFn = Arc<dyn Fn(&ObjectFactory) -> ContextResult<Interceptor> + Send + Sync>;

/// How the factory obtains an instance for a definition
#[derive(Clone)]
pub enum Supplier {
    /// Plain application object
    Object(ObjectFn),
    /// Bootstrap extension of a declared capability
    Extension { kind: ExtensionKind, create: ExtensionFn },
    /// Object-creation interceptor
    Interceptor(InterceptorFn),
    /// Configuration source instantiated as-is
    Source(Arc<SourceSpec>),
    /// Configuration source whose sibling factory-method calls are routed through the factory
    EnhancedSource(Arc<EnhancedSpec>),
    /// Object produced by a factory method of a configuration source
    FactoryMethod {
        source: String,
        method: Arc<FactoryMethod>,
    },
}

impl fmt::Debug for Supplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Supplier::Object(_) => write!(f, "Object(<supplier_fn>)"),
            Supplier::Extension { kind, .. } => write!(f, "Extension({:?})", kind),
            Supplier::Interceptor(_) => write!(f, "Interceptor(<supplier_fn>)"),
            Supplier::Source(spec) => write!(f, "Source({})", spec.type_name),
            Supplier::EnhancedSource(spec) => write!(f, "EnhancedSource({})", spec.spec.type_name),
            Supplier::FactoryMethod { source, method } => {
                write!(f, "FactoryMethod({}::{})", source, method.name)
            }
        }
    }
}

/// What kind of instance a definition yields, known without instantiating it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Object,
    Extension(ExtensionKind),
    Interceptor,
    Source,
}

/// Declarative description of an object the container can build
#[derive(Clone)]
pub struct Definition {
    pub name: String,
    /// Declared type; enhanced sources carry an `$$Enhanced` tag
    pub type_name: String,
    pub attributes: HashMap<String, Value>,
    pub role: Role,
    pub order: Option<i32>,
    pub tier: Option<Tier>,
    /// Set once the expansion engine has parsed this definition as a configuration source
    pub parsed: bool,
    pub scope: ObjectScope,
    pub lazy: bool,
    pub scoped_proxy: ScopedProxyMode,
    pub supplier: Option<Supplier>,
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("role", &self.role)
            .field("order", &self.order)
            .field("tier", &self.tier)
            .field("parsed", &self.parsed)
            .field("scope", &self.scope)
            .field("supplier", &self.supplier)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl Definition {
    /// Create a definition with no instance supplier
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            attributes: HashMap::new(),
            role: Role::Normal,
            order: None,
            tier: None,
            parsed: false,
            scope: ObjectScope::Singleton,
            lazy: false,
            scoped_proxy: ScopedProxyMode::Default,
            supplier: None,
        }
    }

    /// Definition of a plain object built by `create`
    pub fn object<T, F>(name: impl Into<String>, create: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ObjectFactory) -> ContextResult<T> + Send + Sync + 'static,
    {
        let supplier: ObjectFn = Arc::new(
            move |factory: &ObjectFactory| -> ContextResult<Arc<dyn Any + Send + Sync>> {
                let instance = create(factory)?;
                Ok(Arc::new(instance))
            },
        );
        Self::new(name, std::any::type_name::<T>()).with_supplier(Supplier::Object(supplier))
    }

    /// Definition of a registry-mutating extension
    pub fn registry_post_processor<P, F>(name: impl Into<String>, create: F) -> Self
    where
        P: RegistryPostProcessor + 'static,
        F: Fn(&ObjectFactory) -> ContextResult<P> + Send + Sync + 'static,
    {
        let supplier: ExtensionFn = Arc::new(move |factory: &ObjectFactory| -> ContextResult<Extension> {
            Ok(Extension::RegistryMutating(Arc::new(create(factory)?)))
        });
        Self::new(name, std::any::type_name::<P>()).with_supplier(Supplier::Extension {
            kind: ExtensionKind::RegistryMutating,
            create: supplier,
        })
    }

    /// Definition of a factory-only extension
    pub fn factory_post_processor<P, F>(name: impl Into<String>, create: F) -> Self
    where
        P: FactoryPostProcessor + 'static,
        F: Fn(&ObjectFactory) -> ContextResult<P> + Send + Sync + 'static,
    {
        let supplier: ExtensionFn = Arc::new(move |factory: &ObjectFactory| -> ContextResult<Extension> {
            Ok(Extension::FactoryOnly(Arc::new(create(factory)?)))
        });
        Self::new(name, std::any::type_name::<P>()).with_supplier(Supplier::Extension {
            kind: ExtensionKind::FactoryOnly,
            create: supplier,
        })
    }

    /// Definition of an object-creation interceptor
    pub fn interceptor<F>(name: impl Into<String>, create: F) -> Self
    where
        F: Fn(&ObjectFactory) -> ContextResult<Interceptor> + Send + Sync + 'static,
    {
        let name = name.into();
        let type_name = format!("interceptor:{}", name);
        Self::new(name, type_name).with_supplier(Supplier::Interceptor(Arc::new(create)))
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_scope(mut self, scope: ObjectScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_scoped_proxy(mut self, mode: ScopedProxyMode) -> Self {
        self.scoped_proxy = mode;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_supplier(mut self, supplier: Supplier) -> Self {
        self.supplier = Some(supplier);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// True when the attribute is present and set to boolean `true`
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.attributes.get(key), Some(Value::Bool(true)))
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn is_infrastructure(&self) -> bool {
        self.role == Role::Infrastructure
    }

    /// Invocation tier; definitions without a hint are unordered
    pub fn effective_tier(&self) -> Tier {
        self.tier.unwrap_or(Tier::Unordered)
    }

    /// Declared type with any enhancement tag removed
    pub fn user_type(&self) -> &str {
        user_type_name(&self.type_name)
    }

    pub fn is_enhanced(&self) -> bool {
        matches!(self.supplier, Some(Supplier::EnhancedSource(_)))
    }

    /// Capability classification derived from the supplier, without instantiation
    pub fn capability(&self) -> Capability {
        match &self.supplier {
            Some(Supplier::Extension { kind, .. }) => Capability::Extension(*kind),
            Some(Supplier::Interceptor(_)) => Capability::Interceptor,
            Some(Supplier::Source(_)) | Some(Supplier::EnhancedSource(_)) => Capability::Source,
            _ => Capability::Object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Mailer;

    #[test]
    fn test_object_definition_records_type() {
        let definition = Definition::object("mailer", |_| Ok(Mailer))
            .with_order(5)
            .with_attribute("listener", true);

        assert!(definition.type_name.ends_with("Mailer"));
        assert_eq!(definition.capability(), Capability::Object);
        assert_eq!(definition.order, Some(5));
        assert!(definition.flag("listener"));
        assert_eq!(definition.effective_tier(), Tier::Unordered);
    }

    #[test]
    fn test_user_type_strips_enhancement_tag() {
        assert_eq!(user_type_name("app::AppConfig$$Enhanced"), "app::AppConfig");
        assert_eq!(user_type_name("app::AppConfig"), "app::AppConfig");

        let definition = Definition::new("appConfig", "app::AppConfig$$Enhanced");
        assert_eq!(definition.user_type(), "app::AppConfig");
    }
}
