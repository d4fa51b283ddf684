use std::any::Any;
use std::sync::Arc;

use crate::extensions::{Extension, Interceptor};
use crate::factory::SourceInstance;
use crate::proxy::ProxyObject;

/// Type-erased application object
pub type Object = Arc<dyn Any + Send + Sync>;

/// Anything the factory can hand out for a definition
#[derive(Clone)]
pub enum Instance {
    Object(Object),
    Extension(Extension),
    Interceptor(Interceptor),
    Source(Arc<SourceInstance>),
    Proxy(Arc<ProxyObject>),
}

impl Instance {
    pub fn object<T: Send + Sync + 'static>(value: T) -> Self {
        Instance::Object(Arc::new(value))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Instance::Object(_) => "object",
            Instance::Extension(_) => "extension",
            Instance::Interceptor(_) => "interceptor",
            Instance::Source(_) => "configuration source",
            Instance::Proxy(_) => "proxy",
        }
    }

    pub fn is_interceptor(&self) -> bool {
        matches!(self, Instance::Interceptor(_))
    }

    /// Type-erased view; proxies and sources are exposed as themselves
    pub fn as_object(&self) -> Option<Object> {
        match self {
            Instance::Object(object) => Some(object.clone()),
            Instance::Proxy(proxy) => Some(proxy.clone() as Object),
            Instance::Source(source) => Some(source.clone() as Object),
            Instance::Extension(_) | Instance::Interceptor(_) => None,
        }
    }

    /// Downcast to a concrete type, looking through proxies to their target
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        match self {
            Instance::Object(object) => object.clone().downcast::<T>().ok(),
            Instance::Proxy(proxy) => proxy.target().downcast::<T>(),
            Instance::Source(source) => (source.clone() as Object).downcast::<T>().ok(),
            Instance::Extension(_) | Instance::Interceptor(_) => None,
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instance::Object(_) => write!(f, "Object(<instance>)"),
            Instance::Extension(extension) => write!(f, "Extension({})", extension.name()),
            Instance::Interceptor(interceptor) => write!(f, "Interceptor({})", interceptor.name()),
            Instance::Source(source) => write!(f, "Source({})", source.name()),
            Instance::Proxy(proxy) => write!(f, "Proxy({:?})", proxy.strategy()),
        }
    }
}
