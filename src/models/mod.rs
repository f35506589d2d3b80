//! Domain models for the schema and the graph it describes.

mod instruction;
mod ontology;
mod record;
mod representation;
mod schema;

pub use instruction::{EdgeInstruction, NodeInstruction};
pub use ontology::{ontology_key, pascal_label, ElementKind, OntologyElement, OntologyModel};
pub use record::{InputEdge, InputNode, Properties};
pub use representation::Representation;
pub use schema::{EdgeType, Entity, NodeType, OneOrMany, PropertyType, Schema};
