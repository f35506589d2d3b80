//! Ontology loader for Biolink model documents.
//!
//! Reads the `classes` and `slots` sections of a Biolink YAML file. Other
//! sections (types, enums, prefixes) are not needed for hierarchy walking
//! and are skipped.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Deserialize;

use super::ordered::OrderedEntries;
use crate::error::AppError;
use crate::models::{ElementKind, OntologyElement, OntologyModel};

/// Biolink subset bundled with the binary.
pub const EMBEDDED_BIOLINK: &str = include_str!("../../data/biolink_subset.yaml");

static EMBEDDED_MODEL: OnceCell<Arc<OntologyModel>> = OnceCell::new();

#[derive(Debug, Default, Deserialize)]
struct BiolinkDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    classes: OrderedEntries<Option<RawElement>>,
    #[serde(default)]
    slots: OrderedEntries<Option<RawElement>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawElement {
    is_a: Option<String>,
    #[serde(default)]
    mixin: bool,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default)]
    mixins: Vec<String>,
}

/// Loads the configured ontology, or the embedded subset when `path` is `None`.
pub fn load_ontology(path: Option<&Path>) -> Result<Arc<OntologyModel>, AppError> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let model = parse_ontology(&text)?;
            tracing::info!(
                "Loaded ontology from {}: {} classes, {} slots",
                path.display(),
                model.class_count(),
                model.slot_count()
            );
            Ok(Arc::new(model))
        }
        None => embedded_ontology(),
    }
}

/// Returns the embedded Biolink subset, parsing it on first use.
pub fn embedded_ontology() -> Result<Arc<OntologyModel>, AppError> {
    EMBEDDED_MODEL
        .get_or_try_init(|| parse_ontology(EMBEDDED_BIOLINK).map(Arc::new))
        .cloned()
}

/// Parses a Biolink-shaped YAML document.
pub fn parse_ontology(text: &str) -> Result<OntologyModel, AppError> {
    let document: BiolinkDocument = serde_yaml::from_str(text)?;
    if let Some(version) = &document.version {
        tracing::debug!("Parsing Biolink model version {}", version);
    }

    let classes = document
        .classes
        .into_inner()
        .into_iter()
        .map(|(name, raw)| to_element(&name, ElementKind::Class, raw.unwrap_or_default()));
    let slots = document
        .slots
        .into_inner()
        .into_iter()
        .map(|(name, raw)| to_element(&name, ElementKind::Slot, raw.unwrap_or_default()));

    Ok(OntologyModel::new(classes.chain(slots)))
}

fn to_element(name: &str, kind: ElementKind, raw: RawElement) -> OntologyElement {
    let mut element = OntologyElement::new(name, kind);
    if let Some(parent) = raw.is_a.as_deref() {
        element = element.with_parent(parent);
    }
    element.mixin = raw.mixin;
    element.is_abstract = raw.is_abstract;
    element.mixins = raw.mixins;
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_model_parses() {
        let model = embedded_ontology().unwrap();
        assert!(model.class_count() > 20);
        assert!(model.slot_count() > 5);

        let protein = model.get(ElementKind::Class, "protein").unwrap();
        assert_eq!(protein.is_a.as_deref(), Some("polypeptide"));
        assert_eq!(protein.mixins, vec!["gene product mixin"]);
    }

    #[test]
    fn test_ignores_unrelated_sections_and_fields() {
        let model = parse_ontology(
            r#"
id: https://w3id.org/biolink/biolink-model
prefixes:
  biolink: https://w3id.org/biolink/vocab/
types:
  string:
    uri: xsd:string
classes:
  named thing:
    is_a: entity
    description: a databased entity or concept/class
    slots: [id, name]
  entity:
    abstract: true
slots:
  related to:
    domain: named thing
"#,
        )
        .unwrap();

        assert_eq!(model.class_count(), 2);
        assert!(model.get(ElementKind::Class, "entity").unwrap().is_abstract);
        assert!(model.get(ElementKind::Slot, "related to").is_some());
    }

    #[test]
    fn test_embedded_drug_is_not_small_molecule() {
        let model = embedded_ontology().unwrap();
        assert!(model.is_descendant(ElementKind::Class, "drug", "chemical entity"));
        assert!(!model.is_descendant(ElementKind::Class, "small molecule", "drug"));
    }
}
