//! Bootstrap orchestration
//!
//! [`BootstrapContext`] owns the registry and object factory for one startup,
//! runs the post-processor pipeline, registers creation interceptors and
//! optionally pre-instantiates singletons.

pub mod context;
pub mod stats;

pub use context::{BootstrapBuilder, BootstrapContext, AUTO_PROXY_NAME};
pub use stats::{BootstrapStats, PhasePercentages};
