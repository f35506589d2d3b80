//! Typed construction instructions handed to graph sinks.

use serde::Serialize;

use super::Properties;

/// Creates (or merges) one node in the target graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInstruction {
    /// Canonical identifier after preferred-id normalization.
    pub id: String,
    /// Name of the schema entity this node instantiates.
    pub entity: String,
    /// Storage labels, leaf first, followed by its ontology ancestors.
    pub labels: Vec<String>,
    pub properties: Properties,
}

impl NodeInstruction {
    /// The most specific label, used to group nodes per import file.
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.entity)
    }
}

/// Creates (or merges) one relationship in the target graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeInstruction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    /// Name of the schema entity this edge instantiates.
    pub entity: String,
    /// Relationship type, from `label_as_edge`.
    pub relationship: String,
    pub properties: Properties,
}
