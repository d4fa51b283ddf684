//! Object creation: the singleton cache, in-creation tracking and the interceptor chain

pub mod instance;
pub mod object_factory;
pub mod source;

pub use instance::{Instance, Object};
pub use object_factory::{CreationGuard, ObjectFactory};
pub use source::{EnhancedSpec, SourceCall, SourceInstance, SourceSpec};
