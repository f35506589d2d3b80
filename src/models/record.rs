//! Raw input records produced by adapters.
//!
//! Records follow the tuple shape used by graph-building adapters:
//! nodes are `(id, label, properties)` and edges are
//! `(id, source, target, label, properties)`. Both accept a JSON object form
//! and a JSON array form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Property map attached to records and instructions.
pub type Properties = Map<String, JsonValue>;

/// A node as emitted by an input adapter, before schema mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRepr")]
pub struct InputNode {
    pub id: String,
    /// Source label, matched against `label_in_input`.
    pub label: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Properties,
    /// Alternative identifiers (CURIEs) considered for canonical id selection.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub xrefs: Vec<String>,
}

impl InputNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Properties::new(),
            xrefs: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_xref(mut self, xref: impl Into<String>) -> Self {
        self.xrefs.push(xref.into());
        self
    }
}

/// An edge as emitted by an input adapter, before schema mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EdgeRepr")]
pub struct InputEdge {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    pub label: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Properties,
}

impl InputEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeRepr {
    Triple(String, String, Properties),
    Pair(String, String),
    Object {
        id: String,
        label: String,
        #[serde(default)]
        properties: Properties,
        #[serde(default)]
        xrefs: Vec<String>,
    },
}

impl From<NodeRepr> for InputNode {
    fn from(repr: NodeRepr) -> Self {
        match repr {
            NodeRepr::Triple(id, label, properties) => Self {
                id,
                label,
                properties,
                xrefs: Vec::new(),
            },
            NodeRepr::Pair(id, label) => Self::new(id, label),
            NodeRepr::Object {
                id,
                label,
                properties,
                xrefs,
            } => Self {
                id,
                label,
                properties,
                xrefs,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EdgeRepr {
    Tuple(Option<String>, String, String, String, Properties),
    Object {
        #[serde(default)]
        id: Option<String>,
        source: String,
        target: String,
        label: String,
        #[serde(default)]
        properties: Properties,
    },
}

impl From<EdgeRepr> for InputEdge {
    fn from(repr: EdgeRepr) -> Self {
        match repr {
            EdgeRepr::Tuple(id, source, target, label, properties)
            | EdgeRepr::Object {
                id,
                source,
                target,
                label,
                properties,
            } => Self {
                id,
                source,
                target,
                label,
                properties,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_from_tuple() {
        let node: InputNode =
            serde_json::from_value(json!(["uniprot:P12345", "protein", {"length": 120}])).unwrap();
        assert_eq!(node.id, "uniprot:P12345");
        assert_eq!(node.label, "protein");
        assert_eq!(node.properties["length"], json!(120));
        assert!(node.xrefs.is_empty());
    }

    #[test]
    fn test_node_from_object_with_xrefs() {
        let node: InputNode = serde_json::from_value(json!({
            "id": "EFO:0000311",
            "label": "disease",
            "xrefs": ["MONDO:0004992"]
        }))
        .unwrap();
        assert_eq!(node.xrefs, vec!["MONDO:0004992"]);
        assert!(node.properties.is_empty());
    }

    #[test]
    fn test_edge_from_tuple_without_id() {
        let edge: InputEdge = serde_json::from_value(json!([
            null,
            "ncbigene:7157",
            "uniprot:P04637",
            "Encodes",
            {}
        ]))
        .unwrap();
        assert_eq!(edge.id, None);
        assert_eq!(edge.source, "ncbigene:7157");
        assert_eq!(edge.label, "Encodes");
    }

    #[test]
    fn test_edge_object_missing_target_is_rejected() {
        let result: Result<InputEdge, _> =
            serde_json::from_value(json!({"source": "a", "label": "Encodes"}));
        assert!(result.is_err());
    }
}
