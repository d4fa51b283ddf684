pub mod core;
pub mod problems;

pub use self::core::{ContextError, Phase};
pub use problems::{Problem, ProblemReporter, Severity};

/// Result alias used across the bootstrap
pub type ContextResult<T> = Result<T, ContextError>;
