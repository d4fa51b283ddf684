pub mod definition;
pub mod imports;
pub mod registry;
pub mod scope;

pub use definition::{
    user_type_name, Capability, Definition, ExtensionFn, InterceptorFn, ObjectFn, Supplier,
    ENHANCED_TYPE_SEPARATOR, ENHANCED_TYPE_TAG,
};
pub use imports::{ImportOrigin, ImportRegistry, IMPORT_REGISTRY_NAME};
pub use registry::DefinitionRegistry;
pub use scope::{ObjectScope, Role, ScopedProxyMode};
