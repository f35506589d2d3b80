//! Schema model: the declared node and edge types of the graph.

use std::collections::HashMap;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::Representation;

/// A field that may be written either as a scalar or as a list.
///
/// The variant records which form the author used, so a scalar stays a
/// scalar when the schema is serialized again. Numbers and booleans are read
/// as their text, so `label_in_input: 9606` is the label `"9606"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Views the values as a slice, in declaration order.
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Returns true if the field was written as a list.
    pub fn is_list(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }
}

impl OneOrMany<String> {
    pub fn contains(&self, value: &str) -> bool {
        self.iter().any(|v| v == value)
    }
}

/// A YAML scalar taken as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(text) => text,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for OneOrMany<String> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(Scalar),
            Many(Vec<Scalar>),
        }

        match Raw::deserialize(deserializer) {
            Ok(Raw::One(value)) => Ok(OneOrMany::One(value.into())),
            Ok(Raw::Many(values)) => Ok(OneOrMany::Many(
                values.into_iter().map(String::from).collect(),
            )),
            Err(_) => Err(D::Error::custom(
                "expected a scalar or a list of scalars",
            )),
        }
    }
}

impl<'a, T> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Declared type of a property, used for filtering and import headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyType {
    Str,
    Int,
    Float,
    Bool,
    StrArray,
    IntArray,
    FloatArray,
}

impl PropertyType {
    /// Type name understood by `neo4j-admin import` headers.
    pub fn import_type(&self) -> &'static str {
        match self {
            PropertyType::Str => "string",
            PropertyType::Int => "long",
            PropertyType::Float => "double",
            PropertyType::Bool => "boolean",
            PropertyType::StrArray => "string[]",
            PropertyType::IntArray => "long[]",
            PropertyType::FloatArray => "double[]",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            PropertyType::StrArray | PropertyType::IntArray | PropertyType::FloatArray
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Str => "str",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Bool => "bool",
            PropertyType::StrArray => "str[]",
            PropertyType::IntArray => "int[]",
            PropertyType::FloatArray => "float[]",
        }
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" | "string" => Ok(PropertyType::Str),
            "int" | "integer" | "long" => Ok(PropertyType::Int),
            "float" | "double" => Ok(PropertyType::Float),
            "bool" | "boolean" => Ok(PropertyType::Bool),
            "str[]" | "string[]" | "list" => Ok(PropertyType::StrArray),
            "int[]" | "integer[]" | "long[]" => Ok(PropertyType::IntArray),
            "float[]" | "double[]" => Ok(PropertyType::FloatArray),
            _ => Err(format!(
                "Invalid property type '{}'. Valid values: str, int, float, bool, str[], int[], float[]",
                s
            )),
        }
    }
}

impl TryFrom<String> for PropertyType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        value.as_str().to_string()
    }
}

fn serialize_properties<S: serde::Serializer>(
    properties: &Option<Vec<(String, PropertyType)>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match properties {
        Some(properties) => serializer.collect_map(properties.iter().map(|(k, v)| (k, v))),
        None => serializer.serialize_none(),
    }
}

/// A declared node type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeType {
    pub name: String,
    /// Namespaces in precedence order for canonical id selection.
    pub preferred_id: OneOrMany<String>,
    pub label_in_input: OneOrMany<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_a: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_properties"
    )]
    pub properties: Option<Vec<(String, PropertyType)>>,
}

/// A declared edge type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeType {
    pub name: String,
    pub source: OneOrMany<String>,
    pub target: OneOrMany<String>,
    pub label_as_edge: String,
    pub label_in_input: OneOrMany<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_a: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_properties"
    )]
    pub properties: Option<Vec<(String, PropertyType)>>,
}

/// A schema entry, tagged by its `represented_as` value when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "represented_as", rename_all = "lowercase")]
pub enum Entity {
    Node(NodeType),
    Edge(EdgeType),
}

impl Entity {
    pub fn name(&self) -> &str {
        match self {
            Entity::Node(node) => &node.name,
            Entity::Edge(edge) => &edge.name,
        }
    }

    pub fn representation(&self) -> Representation {
        match self {
            Entity::Node(_) => Representation::Node,
            Entity::Edge(_) => Representation::Edge,
        }
    }

    pub fn label_in_input(&self) -> &OneOrMany<String> {
        match self {
            Entity::Node(node) => &node.label_in_input,
            Entity::Edge(edge) => &edge.label_in_input,
        }
    }

    pub fn is_a(&self) -> Option<&str> {
        match self {
            Entity::Node(node) => node.is_a.as_deref(),
            Entity::Edge(edge) => edge.is_a.as_deref(),
        }
    }

    pub fn properties(&self) -> Option<&[(String, PropertyType)]> {
        match self {
            Entity::Node(node) => node.properties.as_deref(),
            Entity::Edge(edge) => edge.properties.as_deref(),
        }
    }

    pub fn as_node(&self) -> Option<&NodeType> {
        match self {
            Entity::Node(node) => Some(node),
            Entity::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeType> {
        match self {
            Entity::Edge(edge) => Some(edge),
            Entity::Node(_) => None,
        }
    }
}

/// The full set of declared entities, in document order.
///
/// Names are unique; construction goes through [`Schema::new`], which
/// rejects duplicates.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema, returning the first duplicated name on conflict.
    pub fn new(entities: Vec<Entity>) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(entities.len());
        for (position, entity) in entities.iter().enumerate() {
            if index.insert(entity.name().to_string(), position).is_some() {
                return Err(entity.name().to_string());
            }
        }
        Ok(Self { entities, index })
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    pub fn node(&self, name: &str) -> Option<&NodeType> {
        self.get(name).and_then(Entity::as_node)
    }

    pub fn edge(&self, name: &str) -> Option<&EdgeType> {
        self.get(name).and_then(Entity::as_edge)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeType> {
        self.entities.iter().filter_map(Entity::as_node)
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeType> {
        self.entities.iter().filter_map(Entity::as_edge)
    }

    /// Finds the node type an input label maps onto.
    ///
    /// When several node types claim the same label the first declared wins;
    /// validation reports such overlaps.
    pub fn node_for_input_label(&self, label: &str) -> Option<&NodeType> {
        self.nodes().find(|node| node.label_in_input.contains(label))
    }

    /// Finds the edge type an input label maps onto.
    pub fn edge_for_input_label(&self, label: &str) -> Option<&EdgeType> {
        self.edges().find(|edge| edge.label_in_input.contains(label))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
