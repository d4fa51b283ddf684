pub mod interceptor;
pub mod ordering;
pub mod post_processor;

pub use interceptor::{CreationInterceptor, Interceptor, MergedDefinitionInterceptor};
pub use ordering::{sort_ranked, Ranked, Tier, HIGHEST_PRECEDENCE, LOWEST_PRECEDENCE};
pub use post_processor::{Extension, ExtensionKind, FactoryPostProcessor, RegistryPostProcessor};
