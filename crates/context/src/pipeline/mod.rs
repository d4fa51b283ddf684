//! Post-processor pipeline: phased extension invocation and interceptor registration

pub mod checks;
pub mod guard;
pub mod interceptors;
pub mod lookup;
pub mod post_processors;

pub use checks::{EligibilityChecker, ListenerDetector, LISTENER_ATTRIBUTE};
pub use guard::ProcessedGuard;
pub use interceptors::{register_interceptors, InterceptorRegistration};
pub use lookup::NameLookupCache;
pub use post_processors::{InvocationReport, PostProcessorPipeline};
