//! Configuration expansion engine
//!
//! Configuration sources are parsed round by round into further definitions
//! (components, scanned candidates, imported sources and factory-method
//! products) until a round discovers no new source. Each source type is parsed
//! at most once per run, which keeps cyclic imports convergent.

pub mod candidates;
pub mod enhancer;
pub mod import_aware;
pub mod materializer;
pub mod parser;
pub mod processor;

pub use candidates::{
    check_candidate, default_name, sort_candidates, source_spec, SourceCandidate, SOURCE_MODE_ATTRIBUTE,
};
pub use enhancer::enhance_sources;
pub use import_aware::ImportAwareInterceptor;
pub use materializer::Materializer;
pub use parser::{factory_method_definition, DerivedDefinition, DerivedKind, ParsedSource, SourceParser};
pub use processor::{ConfigurationProcessor, ExpansionLog, ParsedEntry, CONFIGURATION_PROCESSOR_NAME};
