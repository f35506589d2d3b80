//! Hierarchy resolver: maps declared leaf types onto ontology label chains.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::SchemaConfig;
use crate::context::Context;
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{ElementKind, Entity, OntologyElement, OntologyModel, Representation, Schema};

/// A schema entity with its storage labels resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedType {
    pub name: String,
    pub representation: Representation,
    /// Leaf label first, then each ancestor up to the root. Mixins are
    /// appended when mixin labels are enabled.
    pub labels: Vec<String>,
    /// Mixin labels collected along the chain.
    pub mixins: Vec<String>,
    /// The ontology element the chain was anchored on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_class: Option<String>,
}

impl ResolvedType {
    pub fn leaf_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.name)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Resolved types for every entity of a schema, in document order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSchema {
    types: Vec<ResolvedType>,
    index: HashMap<String, usize>,
}

impl ResolvedSchema {
    pub fn get(&self, name: &str) -> Option<&ResolvedType> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// How an edge endpoint name matched the declared node types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointMatch {
    /// The name is a declared node type.
    Declared(String),
    /// The name is an ontology class; these declared node types descend from it.
    Ancestor(Vec<String>),
    /// The name is only a `label_in_input` of these node types.
    Alias(Vec<String>),
    Unresolved,
}

impl EndpointMatch {
    /// Node type names this match stands for.
    pub fn node_types(&self) -> Vec<String> {
        match self {
            EndpointMatch::Declared(name) => vec![name.clone()],
            EndpointMatch::Ancestor(names) | EndpointMatch::Alias(names) => names.clone(),
            EndpointMatch::Unresolved => Vec::new(),
        }
    }
}

/// Switches for label chain resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Fail on leaves that neither the ontology nor `is_a` explains.
    pub strict: bool,
    /// Append mixin labels to each label chain.
    pub include_mixins: bool,
}

impl From<&SchemaConfig> for ResolveOptions {
    fn from(config: &SchemaConfig) -> Self {
        Self {
            strict: config.strict_ontology,
            include_mixins: config.include_mixins,
        }
    }
}

/// Resolves schema entities against an ontology model.
#[derive(FromContext, Clone)]
pub struct HierarchyResolver {
    ontology: Arc<OntologyModel>,
    options: ResolveOptions,
}

impl HierarchyResolver {
    /// Creates a resolver outside of a [`Context`].
    ///
    /// # Arguments
    ///
    /// * `ontology` - the class and slot hierarchy to walk
    /// * `strict` - fail on leaves that neither the ontology nor `is_a` explains
    /// * `include_mixins` - append mixin labels to each label chain
    pub fn new(ontology: Arc<OntologyModel>, strict: bool, include_mixins: bool) -> Self {
        Self {
            ontology,
            options: ResolveOptions {
                strict,
                include_mixins,
            },
        }
    }

    pub fn ontology(&self) -> &OntologyModel {
        &self.ontology
    }

    /// Resolves every entity of the schema.
    pub fn resolve_all(&self, schema: &Schema) -> Result<ResolvedSchema, AppError> {
        let mut resolved = ResolvedSchema::default();
        for entity in schema.entities() {
            let resolved_type = self.resolve(schema, entity)?;
            tracing::debug!(
                "Resolved {} -> {}",
                resolved_type.name,
                resolved_type.labels.join(":")
            );
            resolved
                .index
                .insert(resolved_type.name.clone(), resolved.types.len());
            resolved.types.push(resolved_type);
        }
        Ok(resolved)
    }

    /// Resolves one entity.
    ///
    /// An explicit `is_a` wins over an ontology match of the name itself, and
    /// may point at an ontology element or at another declared entity.
    pub fn resolve(&self, schema: &Schema, entity: &Entity) -> Result<ResolvedType, AppError> {
        let mut visiting = HashSet::new();
        let (chain, anchor) = self.chain(schema, entity, &mut visiting)?;

        let mixins = anchor
            .as_deref()
            .map(|anchor| self.collect_mixins(Self::kind_of(entity), anchor))
            .transpose()?
            .unwrap_or_default();

        let mut labels = chain;
        if self.options.include_mixins {
            for mixin in &mixins {
                if !labels.contains(mixin) {
                    labels.push(mixin.clone());
                }
            }
        }

        Ok(ResolvedType {
            name: entity.name().to_string(),
            representation: entity.representation(),
            labels,
            mixins,
            ontology_class: anchor,
        })
    }

    /// Matches an edge endpoint name against declared node types.
    pub fn match_endpoint(
        &self,
        schema: &Schema,
        resolved: &ResolvedSchema,
        name: &str,
    ) -> EndpointMatch {
        if schema.node(name).is_some() {
            return EndpointMatch::Declared(name.to_string());
        }

        if let Some(class) = self.ontology.get(ElementKind::Class, name) {
            let label = class.label();
            let descendants: Vec<String> = schema
                .nodes()
                .filter(|node| resolved.get(&node.name).is_some_and(|r| r.has_label(&label)))
                .map(|node| node.name.clone())
                .collect();
            if !descendants.is_empty() {
                return EndpointMatch::Ancestor(descendants);
            }
        }

        let aliased: Vec<String> = schema
            .nodes()
            .filter(|node| node.label_in_input.contains(name))
            .map(|node| node.name.clone())
            .collect();
        if !aliased.is_empty() {
            return EndpointMatch::Alias(aliased);
        }

        EndpointMatch::Unresolved
    }

    fn kind_of(entity: &Entity) -> ElementKind {
        match entity.representation() {
            Representation::Node => ElementKind::Class,
            Representation::Edge => ElementKind::Slot,
        }
    }

    /// Looks up an ontology element, preferring the entity's own kind.
    fn lookup(&self, kind: ElementKind, name: &str) -> Option<&OntologyElement> {
        self.ontology.get(kind, name).or_else(|| {
            let other = match kind {
                ElementKind::Class => ElementKind::Slot,
                ElementKind::Slot => ElementKind::Class,
            };
            self.ontology.get(other, name)
        })
    }

    /// Returns the label chain and the ontology element it is anchored on.
    fn chain(
        &self,
        schema: &Schema,
        entity: &Entity,
        visiting: &mut HashSet<String>,
    ) -> Result<(Vec<String>, Option<String>), AppError> {
        let name = entity.name();
        if !visiting.insert(name.to_string()) {
            return Err(AppError::OntologyCycle(name.to_string()));
        }
        let kind = Self::kind_of(entity);

        if let Some(parent) = entity.is_a() {
            let mut labels = vec![name.to_string()];
            if let Some(parent_entity) = schema.get(parent) {
                let (parent_labels, anchor) = self.chain(schema, parent_entity, visiting)?;
                labels.extend(parent_labels);
                return Ok((labels, anchor));
            }
            if let Some(element) = self.lookup(kind, parent) {
                let anchor = element.name.clone();
                labels.extend(
                    self.ontology
                        .ancestors(element.kind, &anchor)?
                        .iter()
                        .map(|e| e.label()),
                );
                return Ok((labels, Some(anchor)));
            }
            return Err(AppError::UnknownOntologyClass(parent.to_string()));
        }

        if let Some(element) = self.lookup(kind, name) {
            let anchor = element.name.clone();
            let mut labels = vec![name.to_string()];
            labels.extend(
                self.ontology
                    .ancestors(element.kind, &anchor)?
                    .iter()
                    .skip(1)
                    .map(|e| e.label()),
            );
            return Ok((labels, Some(anchor)));
        }

        if self.options.strict {
            return Err(AppError::UnknownOntologyClass(name.to_string()));
        }
        tracing::warn!(
            "{} is not part of the ontology and declares no is_a; using it as a root label",
            name
        );
        Ok((vec![name.to_string()], None))
    }

    /// Mixins declared anywhere on the anchor's chain, as labels.
    fn collect_mixins(&self, kind: ElementKind, anchor: &str) -> Result<Vec<String>, AppError> {
        let kind = self
            .lookup(kind, anchor)
            .map(|element| element.kind)
            .unwrap_or(kind);
        let mut mixins: Vec<String> = Vec::new();
        for element in self.ontology.ancestors(kind, anchor)? {
            for mixin in &element.mixins {
                let label = crate::models::pascal_label(mixin);
                if !mixins.contains(&label) {
                    mixins.push(label);
                }
            }
        }
        Ok(mixins)
    }
}
