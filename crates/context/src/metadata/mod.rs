//! Structural metadata consumed by the expansion engine
//!
//! The reader, the scanner and the property resolver are narrow boundaries:
//! the catalog and prefix scanner here are in-memory implementations of them.

pub mod conditions;
pub mod model;
pub mod reader;
pub mod scanner;

pub use conditions::{Condition, ConditionEvaluator, ConditionPhase};
pub use model::{FactoryFn, FactoryMethod, SourceMode, SourceModel, TypeKind, TypeMetadata};
pub use reader::{MetadataReader, StructuralMetadata, TypeCatalog};
pub use scanner::{CandidateScanner, PrefixScanner};
