//! Graph emitter: maps input records onto typed construction instructions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::hierarchy::{EndpointMatch, HierarchyResolver, ResolvedSchema};
use super::identifiers::{canonical_id, lookup_key};
use crate::config::AliasPolicy;
use crate::error::AppError;
use crate::models::{
    EdgeInstruction, InputEdge, InputNode, NodeInstruction, Properties, PropertyType, Schema,
};

/// Counters reported after a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildSummary {
    /// Emitted nodes per leaf label.
    pub nodes: BTreeMap<String, usize>,
    /// Emitted edges per relationship type.
    pub edges: BTreeMap<String, usize>,
    pub duplicate_nodes: usize,
    /// Records whose id was already emitted under a different node type.
    pub conflicting_nodes: usize,
    pub duplicate_edges: usize,
    /// Skipped records per input label that no entity maps.
    pub unknown_labels: BTreeMap<String, usize>,
    pub rejected_edges: usize,
}

impl BuildSummary {
    pub fn total_nodes(&self) -> usize {
        self.nodes.values().sum()
    }

    pub fn total_edges(&self) -> usize {
        self.edges.values().sum()
    }
}

/// Instructions ready to hand to a sink.
#[derive(Debug, Clone, Default)]
pub struct GraphBatch {
    pub nodes: Vec<NodeInstruction>,
    pub edges: Vec<EdgeInstruction>,
    pub summary: BuildSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EdgeKey {
    Id(String),
    Triple(String, String, String),
}

/// Turns raw records into node and edge instructions.
///
/// Nodes must be fed before the edges that reference them; endpoint rewriting
/// and type checks only see nodes already emitted.
pub struct GraphEmitter {
    schema: Arc<Schema>,
    resolved: ResolvedSchema,
    /// Edge entity name to permitted (source, target) node types.
    endpoints: HashMap<String, (HashSet<String>, HashSet<String>)>,
    nodes: Vec<NodeInstruction>,
    node_index: HashMap<String, usize>,
    /// Record ids and xrefs (as lookup keys) to canonical ids.
    aliases: HashMap<String, String>,
    edges: Vec<EdgeInstruction>,
    edge_keys: HashSet<EdgeKey>,
    summary: BuildSummary,
}

impl GraphEmitter {
    /// Resolves the schema and computes permitted endpoint types.
    ///
    /// Alias endpoints are permitted unless the policy denies them.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnresolvedEndpoint`] when an edge names an endpoint
    /// that is neither a node type, an ancestor class of one, nor an input
    /// label alias. Resolution errors from [`HierarchyResolver::resolve_all`]
    /// are passed through.
    pub fn new(
        schema: Arc<Schema>,
        resolver: &HierarchyResolver,
        policy: AliasPolicy,
    ) -> Result<Self, AppError> {
        let resolved = resolver.resolve_all(&schema)?;

        let mut endpoints = HashMap::new();
        for edge in schema.edges() {
            let mut sides = [HashSet::new(), HashSet::new()];
            for ((set, names), side) in sides
                .iter_mut()
                .zip([&edge.source, &edge.target])
                .zip(["source", "target"])
            {
                for name in names {
                    match resolver.match_endpoint(&schema, &resolved, name) {
                        EndpointMatch::Unresolved => {
                            return Err(AppError::UnresolvedEndpoint {
                                edge: edge.name.clone(),
                                side: side.to_string(),
                                name: name.clone(),
                            });
                        }
                        EndpointMatch::Alias(_) if policy == AliasPolicy::Deny => {
                            tracing::warn!(
                                "{}: endpoint '{}' is an input label alias and aliases are denied",
                                edge.name,
                                name
                            );
                        }
                        found => set.extend(found.node_types()),
                    }
                }
            }
            let [sources, targets] = sides;
            endpoints.insert(edge.name.clone(), (sources, targets));
        }

        Ok(Self {
            schema,
            resolved,
            endpoints,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            aliases: HashMap::new(),
            edges: Vec::new(),
            edge_keys: HashSet::new(),
            summary: BuildSummary::default(),
        })
    }

    pub fn resolved(&self) -> &ResolvedSchema {
        &self.resolved
    }

    pub fn emit_nodes(&mut self, records: impl IntoIterator<Item = InputNode>) {
        for record in records {
            self.add_node(record);
        }
    }

    pub fn emit_edges(&mut self, records: impl IntoIterator<Item = InputEdge>) {
        for record in records {
            self.add_edge(record);
        }
    }

    /// Maps one node record. Returns the canonical id, or `None` when skipped.
    pub fn add_node(&mut self, record: InputNode) -> Option<String> {
        let Some(node_type) = self.schema.node_for_input_label(&record.label) else {
            self.skip_unknown(&record.label);
            return None;
        };

        let id = canonical_id(&node_type.preferred_id, &record.id, &record.xrefs);
        let properties = Self::filter_properties(
            record.properties,
            node_type.properties.as_deref(),
            &node_type.name,
        );

        if let Some(&position) = self.node_index.get(&id) {
            let existing = &mut self.nodes[position];
            if existing.entity != node_type.name {
                tracing::warn!(
                    "Node {} already emitted as {}; ignoring {} record",
                    id,
                    existing.entity,
                    node_type.name
                );
                self.summary.conflicting_nodes += 1;
                return None;
            }
            for alias in std::iter::once(&record.id).chain(&record.xrefs) {
                self.aliases.entry(lookup_key(alias)).or_insert_with(|| id.clone());
            }
            for (key, value) in properties {
                existing.properties.entry(key).or_insert(value);
            }
            self.summary.duplicate_nodes += 1;
            tracing::debug!("Merged duplicate node {}", id);
            return Some(id);
        }

        for alias in std::iter::once(&record.id).chain(&record.xrefs) {
            self.aliases.entry(lookup_key(alias)).or_insert_with(|| id.clone());
        }
        self.aliases.entry(lookup_key(&id)).or_insert_with(|| id.clone());

        let labels = self
            .resolved
            .get(&node_type.name)
            .map(|r| r.labels.clone())
            .unwrap_or_else(|| vec![node_type.name.clone()]);

        let instruction = NodeInstruction {
            id: id.clone(),
            entity: node_type.name.clone(),
            labels,
            properties,
        };
        *self
            .summary
            .nodes
            .entry(instruction.primary_label().to_string())
            .or_default() += 1;
        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(instruction);
        Some(id)
    }

    /// Maps one edge record. Returns true when an instruction was emitted.
    pub fn add_edge(&mut self, record: InputEdge) -> bool {
        let Some(edge_type) = self.schema.edge_for_input_label(&record.label) else {
            self.skip_unknown(&record.label);
            return false;
        };

        let source = self.canonical_endpoint(&record.source);
        let target = self.canonical_endpoint(&record.target);

        if let Some((sources, targets)) = self.endpoints.get(&edge_type.name) {
            for (side, id, permitted) in [("source", &source, sources), ("target", &target, targets)]
            {
                let Some(node) = self.node_index.get(id).map(|&i| &self.nodes[i]) else {
                    continue;
                };
                if !permitted.contains(&node.entity) {
                    tracing::debug!(
                        "Rejected {} edge {} -> {}: {} is a {}",
                        edge_type.name,
                        source,
                        target,
                        side,
                        node.entity
                    );
                    self.summary.rejected_edges += 1;
                    return false;
                }
            }
        }

        let relationship = edge_type.label_as_edge.clone();
        let key = match &record.id {
            Some(id) => EdgeKey::Id(id.clone()),
            None => EdgeKey::Triple(source.clone(), target.clone(), relationship.clone()),
        };
        if !self.edge_keys.insert(key) {
            self.summary.duplicate_edges += 1;
            return false;
        }

        let properties = Self::filter_properties(
            record.properties,
            edge_type.properties.as_deref(),
            &edge_type.name,
        );

        *self.summary.edges.entry(relationship.clone()).or_default() += 1;
        self.edges.push(EdgeInstruction {
            id: record.id,
            source,
            target,
            entity: edge_type.name.clone(),
            relationship,
            properties,
        });
        true
    }

    pub fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    pub fn finish(self) -> GraphBatch {
        tracing::info!(
            "Emitted {} node(s) and {} edge(s) ({} duplicate nodes, {} conflicting nodes, {} duplicate edges, {} rejected edges)",
            self.summary.total_nodes(),
            self.summary.total_edges(),
            self.summary.duplicate_nodes,
            self.summary.conflicting_nodes,
            self.summary.duplicate_edges,
            self.summary.rejected_edges
        );
        GraphBatch {
            nodes: self.nodes,
            edges: self.edges,
            summary: self.summary,
        }
    }

    fn canonical_endpoint(&self, id: &str) -> String {
        self.aliases
            .get(&lookup_key(id))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn skip_unknown(&mut self, label: &str) {
        let count = self
            .summary
            .unknown_labels
            .entry(label.to_string())
            .or_default();
        if *count == 0 {
            tracing::warn!("No schema entity maps input label '{}'; skipping", label);
        }
        *count += 1;
    }

    /// Keeps declared properties only (when declared) and flattens objects.
    fn filter_properties(
        properties: Properties,
        declared: Option<&[(String, PropertyType)]>,
        entity: &str,
    ) -> Properties {
        properties
            .into_iter()
            .filter(|(key, _)| match declared {
                Some(declared) => {
                    let keep = declared.iter().any(|(name, _)| name == key);
                    if !keep {
                        tracing::debug!("Dropping undeclared property {} on {}", key, entity);
                    }
                    keep
                }
                None => true,
            })
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key, Self::flatten(value)))
            .collect()
    }

    fn flatten(value: JsonValue) -> JsonValue {
        match value {
            JsonValue::Object(_) => JsonValue::String(value.to_string()),
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        JsonValue::Object(_) | JsonValue::Array(_) => {
                            JsonValue::String(item.to_string())
                        }
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{embedded_ontology, parse_schema};
    use serde_json::json;

    const DOC: &str = r#"
Protein:
  represented_as: node
  preferred_id: UniProtKB
  label_in_input: protein
Gene:
  represented_as: node
  preferred_id: NCBIGene
  label_in_input: gene
Disease:
  represented_as: node
  preferred_id: [MONDO, EFO]
  label_in_input: disease
  properties:
    name: str
SmallMolecule:
  represented_as: node
  preferred_id: DRUGBANK
  label_in_input: Drug
Interacts_With:
  represented_as: edge
  source: Protein
  target: Protein
  label_as_edge: Interacts_With
  label_in_input: IntAct
Encodes:
  represented_as: edge
  source: Gene
  target: Protein
  label_as_edge: Encodes
  label_in_input: Encodes
Targets:
  represented_as: edge
  source: Drug
  target: Protein
  label_as_edge: Targets
  label_in_input: drug_target
"#;

    fn emitter(policy: AliasPolicy) -> GraphEmitter {
        let schema = Arc::new(parse_schema(DOC).unwrap());
        let resolver = HierarchyResolver::new(embedded_ontology().unwrap(), false, false);
        GraphEmitter::new(schema, &resolver, policy).unwrap()
    }

    #[test]
    fn test_nodes_get_canonical_ids_and_labels() {
        let mut emitter = emitter(AliasPolicy::Warn);
        let id = emitter.add_node(InputNode::new("uniprot:P04637", "protein"));
        assert_eq!(id.as_deref(), Some("UniProtKB:P04637"));

        let batch = emitter.finish();
        assert_eq!(batch.nodes.len(), 1);
        assert_eq!(batch.nodes[0].labels[0], "Protein");
        assert!(batch.nodes[0].labels.contains(&"NamedThing".to_string()));
        assert_eq!(batch.summary.nodes["Protein"], 1);
    }

    #[test]
    fn test_unknown_labels_are_counted() {
        let mut emitter = emitter(AliasPolicy::Warn);
        assert!(emitter.add_node(InputNode::new("x:1", "cell line")).is_none());
        assert!(emitter.add_node(InputNode::new("x:2", "cell line")).is_none());
        assert!(!emitter.add_edge(InputEdge::new("a", "b", "coexpressed")));

        let summary = emitter.finish().summary;
        assert_eq!(summary.unknown_labels["cell line"], 2);
        assert_eq!(summary.unknown_labels["coexpressed"], 1);
        assert_eq!(summary.total_nodes(), 0);
    }

    #[test]
    fn test_duplicate_nodes_merge_first_value_wins() {
        let mut emitter = emitter(AliasPolicy::Warn);
        emitter.emit_nodes(vec![
            InputNode::new("EFO:0000311", "disease")
                .with_xref("MONDO:0004992")
                .with_property("name", "cancer"),
            InputNode::new("MONDO:0004992", "disease").with_property("name", "malignant neoplasm"),
            InputNode::new("MONDO:0004992", "disease").with_property("synonym", "tumor"),
        ]);

        let batch = emitter.finish();
        assert_eq!(batch.nodes.len(), 1);
        assert_eq!(batch.nodes[0].id, "MONDO:0004992");
        assert_eq!(batch.nodes[0].properties["name"], json!("cancer"));
        // undeclared properties are dropped
        assert!(batch.nodes[0].properties.get("synonym").is_none());
        assert_eq!(batch.summary.duplicate_nodes, 2);
    }

    #[test]
    fn test_edges_are_rewritten_and_deduplicated() {
        let mut emitter = emitter(AliasPolicy::Warn);
        emitter.emit_nodes(vec![
            InputNode::new("ncbigene:7157", "gene"),
            InputNode::new("uniprot:P04637", "protein"),
        ]);
        emitter.emit_edges(vec![
            InputEdge::new("ncbigene:7157", "uniprot:P04637", "Encodes"),
            InputEdge::new("NCBIGene:7157", "UniProtKB:P04637", "Encodes"),
        ]);

        let batch = emitter.finish();
        assert_eq!(batch.edges.len(), 1);
        assert_eq!(batch.edges[0].source, "NCBIGene:7157");
        assert_eq!(batch.edges[0].target, "UniProtKB:P04637");
        assert_eq!(batch.edges[0].relationship, "Encodes");
        assert_eq!(batch.summary.duplicate_edges, 1);
    }

    #[test]
    fn test_edge_with_wrong_endpoint_type_is_rejected() {
        let mut emitter = emitter(AliasPolicy::Warn);
        emitter.emit_nodes(vec![
            InputNode::new("ncbigene:7157", "gene"),
            InputNode::new("uniprot:P04637", "protein"),
        ]);
        // Interacts_With only joins proteins
        assert!(!emitter.add_edge(InputEdge::new("ncbigene:7157", "uniprot:P04637", "IntAct")));
        // endpoints that were never emitted are not checked
        assert!(emitter.add_edge(InputEdge::new("uniprot:Q9", "uniprot:P04637", "IntAct")));

        assert_eq!(emitter.summary().rejected_edges, 1);
    }

    #[test]
    fn test_alias_endpoints_follow_policy() {
        let nodes = vec![
            InputNode::new("DRUGBANK:DB00001", "Drug"),
            InputNode::new("uniprot:P00734", "protein"),
        ];
        let edge = InputEdge::new("DRUGBANK:DB00001", "uniprot:P00734", "drug_target");

        let mut warn = emitter(AliasPolicy::Warn);
        warn.emit_nodes(nodes.clone());
        assert!(warn.add_edge(edge.clone()));

        let mut deny = emitter(AliasPolicy::Deny);
        deny.emit_nodes(nodes);
        assert!(!deny.add_edge(edge));
        assert_eq!(deny.summary().rejected_edges, 1);
    }

    #[test]
    fn test_node_id_reused_across_types_is_skipped() {
        let mut emitter = emitter(AliasPolicy::Warn);
        let first = emitter.add_node(InputNode::new("X:1", "protein").with_property("a", 1));
        let second = emitter.add_node(InputNode::new("X:1", "gene").with_property("gene_only", 2));
        assert!(first.is_some());
        assert!(second.is_none());

        let batch = emitter.finish();
        assert_eq!(batch.nodes.len(), 1);
        assert_eq!(batch.nodes[0].entity, "Protein");
        assert_eq!(batch.nodes[0].properties["a"], json!(1));
        assert!(batch.nodes[0].properties.get("gene_only").is_none());
        assert_eq!(batch.summary.conflicting_nodes, 1);
        assert_eq!(batch.summary.duplicate_nodes, 0);
    }

    #[test]
    fn test_unresolved_endpoint_fails_construction() {
        let doc = format!(
            "{DOC}\nCatalyzes:\n  represented_as: edge\n  source: Protein\n  target: Enzyme\n  label_as_edge: Catalyzes\n  label_in_input: catalyzes\n"
        );
        let schema = Arc::new(parse_schema(&doc).unwrap());
        let resolver = HierarchyResolver::new(embedded_ontology().unwrap(), false, false);

        for policy in [AliasPolicy::Deny, AliasPolicy::Warn, AliasPolicy::Allow] {
            let err = GraphEmitter::new(schema.clone(), &resolver, policy)
                .err()
                .unwrap();
            match err {
                AppError::UnresolvedEndpoint { edge, side, name } => {
                    assert_eq!(edge, "Catalyzes");
                    assert_eq!(side, "target");
                    assert_eq!(name, "Enzyme");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_nested_properties_are_stringified() {
        let mut emitter = emitter(AliasPolicy::Warn);
        emitter.add_node(
            InputNode::new("uniprot:P1", "protein")
                .with_property("xref", json!({"db": "PDB"}))
                .with_property("names", json!(["a", "b"]))
                .with_property("empty", JsonValue::Null),
        );
        let batch = emitter.finish();
        let props = &batch.nodes[0].properties;
        assert_eq!(props["xref"], json!(r#"{"db":"PDB"}"#));
        assert_eq!(props["names"], json!(["a", "b"]));
        assert!(props.get("empty").is_none());
    }
}
