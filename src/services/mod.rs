//! Schema and build services.
//!
//! Services hold the loaded schema and ontology and implement validation,
//! hierarchy resolution and record-to-instruction mapping.

mod emitter;
mod hierarchy;
pub mod identifiers;
mod validation;

pub use emitter::{BuildSummary, GraphBatch, GraphEmitter};
pub use hierarchy::{
    EndpointMatch, HierarchyResolver, ResolveOptions, ResolvedSchema, ResolvedType,
};
pub use validation::{fail_on_errors, Severity, ValidationIssue, ValidationService};
