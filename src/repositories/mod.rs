//! Document access: schema, ontology and input records.
//!
//! Repositories turn files into models; they hold no state of their own.

mod ontology;
mod ordered;
mod records;
mod schema;

pub use ontology::{embedded_ontology, load_ontology, parse_ontology, EMBEDDED_BIOLINK};
pub use ordered::OrderedEntries;
pub use records::{read_edges, read_json_lines, read_nodes};
pub use schema::{load_schema, parse_schema};
