//! Schema loader: parses the mapping document into a [`Schema`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use super::ordered::OrderedEntries;
use crate::error::AppError;
use crate::models::{EdgeType, Entity, NodeType, OneOrMany, PropertyType, Representation, Schema};

/// One entry as written in the document, before its kind is known.
#[derive(Debug, Default, Deserialize)]
struct RawEntry {
    represented_as: Option<String>,
    preferred_id: Option<OneOrMany<String>>,
    label_in_input: Option<OneOrMany<String>>,
    source: Option<OneOrMany<String>>,
    target: Option<OneOrMany<String>>,
    label_as_edge: Option<String>,
    is_a: Option<String>,
    properties: Option<OrderedEntries<PropertyType>>,
    #[serde(flatten)]
    extra: BTreeMap<String, YamlValue>,
}

/// Reads and parses a schema document from disk.
pub fn load_schema(path: &Path) -> Result<Schema, AppError> {
    let text = std::fs::read_to_string(path)?;
    let schema = parse_schema(&text)?;
    tracing::info!(
        "Loaded schema from {}: {} node type(s), {} edge type(s)",
        path.display(),
        schema.nodes().count(),
        schema.edges().count()
    );
    Ok(schema)
}

/// Parses a schema document.
///
/// Empty values are left to validation.
///
/// # Errors
///
/// - [`AppError::SchemaParse`] when the text is not a YAML mapping
/// - [`AppError::InvalidEntry`] when an entry has the wrong shape
/// - [`AppError::DuplicateEntity`] when a name is declared twice
/// - [`AppError::InvalidRepresentation`] for an unknown `represented_as`
/// - [`AppError::MissingField`] when a required field is absent
pub fn parse_schema(text: &str) -> Result<Schema, AppError> {
    if is_blank_document(text) {
        return Ok(Schema::default());
    }

    let entries: OrderedEntries<YamlValue> = serde_yaml::from_str(text)?;
    let entities = entries
        .into_inner()
        .into_iter()
        .map(|(name, value)| parse_entry(name, value))
        .collect::<Result<Vec<_>, _>>()?;

    Schema::new(entities).map_err(AppError::DuplicateEntity)
}

fn is_blank_document(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

fn parse_entry(name: String, value: YamlValue) -> Result<Entity, AppError> {
    let raw: RawEntry = if value.is_null() {
        RawEntry::default()
    } else {
        serde_yaml::from_value(value).map_err(|e| AppError::InvalidEntry {
            entity: name.clone(),
            message: e.to_string(),
        })?
    };

    for key in raw.extra.keys() {
        tracing::debug!("Ignoring unrecognized key '{}' on {}", key, name);
    }

    let represented_as = raw
        .represented_as
        .as_deref()
        .ok_or_else(|| missing(&name, "represented_as"))?;
    let representation: Representation =
        represented_as
            .parse()
            .map_err(|_| AppError::InvalidRepresentation {
                entity: name.clone(),
                value: represented_as.to_string(),
            })?;

    let properties = raw.properties.map(OrderedEntries::into_inner);

    match representation {
        Representation::Node => {
            if raw.source.is_some() || raw.target.is_some() || raw.label_as_edge.is_some() {
                tracing::warn!("Node type {} declares edge fields; they are ignored", name);
            }
            Ok(Entity::Node(NodeType {
                preferred_id: raw.preferred_id.ok_or_else(|| missing(&name, "preferred_id"))?,
                label_in_input: raw
                    .label_in_input
                    .ok_or_else(|| missing(&name, "label_in_input"))?,
                is_a: raw.is_a,
                properties,
                name,
            }))
        }
        Representation::Edge => {
            if raw.preferred_id.is_some() {
                tracing::debug!("Edge type {} declares preferred_id; it is ignored", name);
            }
            Ok(Entity::Edge(EdgeType {
                source: raw.source.ok_or_else(|| missing(&name, "source"))?,
                target: raw.target.ok_or_else(|| missing(&name, "target"))?,
                label_as_edge: raw
                    .label_as_edge
                    .ok_or_else(|| missing(&name, "label_as_edge"))?,
                label_in_input: raw
                    .label_in_input
                    .ok_or_else(|| missing(&name, "label_in_input"))?,
                is_a: raw.is_a,
                properties,
                name,
            }))
        }
    }
}

fn missing(entity: &str, field: &str) -> AppError {
    AppError::MissingField {
        entity: entity.to_string(),
        field: field.to_string(),
    }
}
