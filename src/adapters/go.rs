//! Gene Ontology adapter: GO terms, protein annotations, term relations and
//! InterPro2GO mappings into graph records.
//!
//! Inputs are plain files:
//! - annotations in GAF 2.x (`!` comment lines, 15+ tab-separated columns)
//! - terms as a TSV with `id`, `name` and `aspect` columns
//! - term relations as a TSV with `source`, `relation` and `target` columns
//! - the `interpro2go` mapping as published by InterPro
//!
//! Edge labels join the endpoint kinds with the GAF qualifier or relation,
//! e.g. `protein_located_in_cellular_component`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::str::FromStr;

use serde::Deserialize;

use super::uniprot::sanitize;
use crate::error::AppError;
use crate::models::{InputEdge, InputNode};

/// GAF column positions.
const GAF_DB: usize = 0;
const GAF_OBJECT_ID: usize = 1;
const GAF_QUALIFIER: usize = 3;
const GAF_GO_ID: usize = 4;
const GAF_REFERENCE: usize = 5;
const GAF_EVIDENCE: usize = 6;
const GAF_ASPECT: usize = 8;

/// The three GO namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoAspect {
    BiologicalProcess,
    MolecularFunction,
    CellularComponent,
}

impl GoAspect {
    /// Accepts the GAF aspect code (`P`, `F`, `C`) or the OBO namespace name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "P" | "biological_process" | "biological process" => Some(GoAspect::BiologicalProcess),
            "F" | "molecular_function" | "molecular function" => Some(GoAspect::MolecularFunction),
            "C" | "cellular_component" | "cellular component" => Some(GoAspect::CellularComponent),
            _ => None,
        }
    }

    pub fn node_type(&self) -> GoNodeType {
        match self {
            GoAspect::BiologicalProcess => GoNodeType::BiologicalProcess,
            GoAspect::MolecularFunction => GoNodeType::MolecularFunction,
            GoAspect::CellularComponent => GoNodeType::CellularComponent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoNodeType {
    Protein,
    Domain,
    BiologicalProcess,
    CellularComponent,
    MolecularFunction,
}

impl GoNodeType {
    pub fn all() -> &'static [GoNodeType] {
        &[
            GoNodeType::Protein,
            GoNodeType::Domain,
            GoNodeType::BiologicalProcess,
            GoNodeType::CellularComponent,
            GoNodeType::MolecularFunction,
        ]
    }

    /// Input label of the records this type produces.
    pub fn input_label(&self) -> &'static str {
        match self {
            GoNodeType::Protein => "protein",
            GoNodeType::Domain => "domain",
            GoNodeType::BiologicalProcess => "biological process",
            GoNodeType::CellularComponent => "cellular component",
            GoNodeType::MolecularFunction => "molecular function",
        }
    }

    /// Prefix of this type in edge labels.
    fn edge_label_part(&self) -> &'static str {
        match self {
            GoNodeType::Protein => "protein",
            GoNodeType::Domain => "protein_domain",
            GoNodeType::BiologicalProcess => "biological_process",
            GoNodeType::CellularComponent => "cellular_component",
            GoNodeType::MolecularFunction => "molecular_function",
        }
    }
}

impl fmt::Display for GoNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.input_label().replace(' ', "-"))
    }
}

impl FromStr for GoNodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoNodeType::all()
            .iter()
            .find(|t| t.to_string() == s || t.input_label() == s)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Invalid GO node type '{}'. Valid values: protein, domain, biological-process, cellular-component, molecular-function",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoEdgeType {
    ProteinToCellularComponent,
    ProteinToBiologicalProcess,
    ProteinToMolecularFunction,
    DomainToCellularComponent,
    DomainToBiologicalProcess,
    DomainToMolecularFunction,
    CellularComponentToCellularComponent,
    BiologicalProcessToBiologicalProcess,
    MolecularFunctionToMolecularFunction,
    BiologicalProcessToMolecularFunction,
}

impl GoEdgeType {
    pub fn all() -> &'static [GoEdgeType] {
        use GoEdgeType::*;
        &[
            ProteinToCellularComponent,
            ProteinToBiologicalProcess,
            ProteinToMolecularFunction,
            DomainToCellularComponent,
            DomainToBiologicalProcess,
            DomainToMolecularFunction,
            CellularComponentToCellularComponent,
            BiologicalProcessToBiologicalProcess,
            MolecularFunctionToMolecularFunction,
            BiologicalProcessToMolecularFunction,
        ]
    }

    /// Source and target node types.
    pub fn endpoints(&self) -> (GoNodeType, GoNodeType) {
        use GoNodeType::*;
        match self {
            GoEdgeType::ProteinToCellularComponent => (Protein, CellularComponent),
            GoEdgeType::ProteinToBiologicalProcess => (Protein, BiologicalProcess),
            GoEdgeType::ProteinToMolecularFunction => (Protein, MolecularFunction),
            GoEdgeType::DomainToCellularComponent => (Domain, CellularComponent),
            GoEdgeType::DomainToBiologicalProcess => (Domain, BiologicalProcess),
            GoEdgeType::DomainToMolecularFunction => (Domain, MolecularFunction),
            GoEdgeType::CellularComponentToCellularComponent => {
                (CellularComponent, CellularComponent)
            }
            GoEdgeType::BiologicalProcessToBiologicalProcess => {
                (BiologicalProcess, BiologicalProcess)
            }
            GoEdgeType::MolecularFunctionToMolecularFunction => {
                (MolecularFunction, MolecularFunction)
            }
            GoEdgeType::BiologicalProcessToMolecularFunction => {
                (BiologicalProcess, MolecularFunction)
            }
        }
    }

    /// GAF qualifiers or ontology relations this edge type carries.
    pub fn qualifiers(&self) -> &'static [&'static str] {
        match self {
            GoEdgeType::ProteinToCellularComponent => &["located_in", "is_active_in", "part_of"],
            GoEdgeType::ProteinToBiologicalProcess => &["involved_in"],
            GoEdgeType::ProteinToMolecularFunction => &["enables", "contributes_to"],
            GoEdgeType::DomainToCellularComponent => &["located_in"],
            GoEdgeType::DomainToBiologicalProcess => &["involved_in"],
            GoEdgeType::DomainToMolecularFunction => &["enables"],
            GoEdgeType::CellularComponentToCellularComponent => &["is_a", "part_of"],
            GoEdgeType::BiologicalProcessToBiologicalProcess
            | GoEdgeType::MolecularFunctionToMolecularFunction => &[
                "is_a",
                "positively_regulates",
                "negatively_regulates",
                "part_of",
            ],
            GoEdgeType::BiologicalProcessToMolecularFunction => {
                &["positively_regulates", "negatively_regulates"]
            }
        }
    }

    /// The edge type joining two node types, if any.
    pub fn between(source: GoNodeType, target: GoNodeType) -> Option<GoEdgeType> {
        GoEdgeType::all()
            .iter()
            .find(|t| t.endpoints() == (source, target))
            .copied()
    }

    /// Input label for one qualifier, e.g. `protein_enables_molecular_function`.
    pub fn input_label(&self, qualifier: &str) -> String {
        let (source, target) = self.endpoints();
        format!(
            "{}_{}_{}",
            source.edge_label_part(),
            qualifier.replace(' ', "_"),
            target.edge_label_part()
        )
    }
}

impl fmt::Display for GoEdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (source, target) = self.endpoints();
        write!(f, "{}-to-{}", source, target)
    }
}

impl FromStr for GoEdgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoEdgeType::all()
            .iter()
            .find(|t| t.to_string() == s)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Invalid GO edge type '{}'. Valid values look like protein-to-cellular-component or biological-process-to-molecular-function",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoTerm {
    pub id: String,
    pub name: Option<String>,
    pub aspect: GoAspect,
}

/// One GAF line.
#[derive(Debug, Clone, PartialEq)]
pub struct GoAnnotation {
    /// UniProtKB accession.
    pub protein: String,
    pub qualifier: String,
    pub go_id: String,
    pub aspect: GoAspect,
    pub reference: String,
    pub evidence_code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoRelation {
    pub source: String,
    pub relation: String,
    pub target: String,
}

/// An InterPro entry mapped to a GO term.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAnnotation {
    pub interpro: String,
    pub go_id: String,
}

/// Everything read from the GO inputs of one build.
#[derive(Debug, Clone, Default)]
pub struct GoData {
    pub terms: Vec<GoTerm>,
    pub annotations: Vec<GoAnnotation>,
    pub relations: Vec<GoRelation>,
    pub domains: Vec<DomainAnnotation>,
}

impl GoData {
    /// Aspect of every known term; the terms file wins over annotation lines.
    fn aspects(&self) -> HashMap<&str, GoAspect> {
        let mut aspects: HashMap<&str, GoAspect> = self
            .annotations
            .iter()
            .map(|a| (a.go_id.as_str(), a.aspect))
            .collect();
        aspects.extend(self.terms.iter().map(|t| (t.id.as_str(), t.aspect)));
        aspects
    }
}

#[derive(Deserialize)]
struct TermRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    aspect: String,
}

/// Builds records from GO data for the selected node and edge types.
#[derive(Debug, Clone)]
pub struct GoAdapter {
    node_types: Vec<GoNodeType>,
    edge_types: Vec<GoEdgeType>,
    removed_evidence: Vec<String>,
}

impl Default for GoAdapter {
    fn default() -> Self {
        Self {
            node_types: GoNodeType::all().to_vec(),
            edge_types: GoEdgeType::all().to_vec(),
            removed_evidence: vec!["IEA".to_string()],
        }
    }
}

impl GoAdapter {
    /// Creates an adapter for the selected types.
    ///
    /// # Arguments
    ///
    /// * `node_types` - must include both endpoint types of every selected edge type
    /// * `edge_types` - edge types to produce
    /// * `removed_evidence` - evidence codes whose protein annotations are dropped
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidConfig`] when an edge type's endpoint type is not selected.
    pub fn new(
        node_types: Vec<GoNodeType>,
        edge_types: Vec<GoEdgeType>,
        removed_evidence: Vec<String>,
    ) -> Result<Self, AppError> {
        for edge_type in &edge_types {
            let (source, target) = edge_type.endpoints();
            for needed in [source, target] {
                if !node_types.contains(&needed) {
                    return Err(AppError::InvalidConfig(format!(
                        "GO edge type {} needs node type {}",
                        edge_type, needed
                    )));
                }
            }
        }
        Ok(Self {
            node_types,
            edge_types,
            removed_evidence,
        })
    }

    /// Parses a GAF file. Rows from databases other than UniProtKB are skipped.
    pub fn read_annotations<R: Read>(reader: R) -> Result<Vec<GoAnnotation>, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'!'))
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut annotations = Vec::new();
        let mut skipped = 0;
        for row in reader.records() {
            let row = row?;
            let line = row.position().map_or(0, |p| p.line() as usize);
            if row.len() <= GAF_ASPECT {
                return Err(AppError::Record {
                    line,
                    message: format!("expected at least 9 GAF columns, found {}", row.len()),
                });
            }
            if &row[GAF_DB] != "UniProtKB" {
                skipped += 1;
                continue;
            }
            let aspect = GoAspect::parse(&row[GAF_ASPECT]).ok_or_else(|| AppError::Record {
                line,
                message: format!("unknown GO aspect '{}'", &row[GAF_ASPECT]),
            })?;
            annotations.push(GoAnnotation {
                protein: row[GAF_OBJECT_ID].trim().to_string(),
                qualifier: row[GAF_QUALIFIER].trim().to_string(),
                go_id: row[GAF_GO_ID].trim().to_string(),
                aspect,
                reference: row[GAF_REFERENCE].trim().to_string(),
                evidence_code: row[GAF_EVIDENCE].trim().to_string(),
            });
        }
        if skipped > 0 {
            tracing::debug!("Skipped {} GAF row(s) from other databases", skipped);
        }
        tracing::info!("Read {} GO annotation(s)", annotations.len());
        Ok(annotations)
    }

    /// Parses a terms TSV with `id`, `name` and `aspect` columns.
    pub fn read_terms<R: Read>(reader: R) -> Result<Vec<GoTerm>, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .from_reader(reader);

        let mut terms = Vec::new();
        for (index, row) in reader.deserialize::<TermRow>().enumerate() {
            let row = row?;
            let aspect = GoAspect::parse(&row.aspect).ok_or_else(|| AppError::Record {
                line: index + 2,
                message: format!("unknown GO aspect '{}'", row.aspect),
            })?;
            terms.push(GoTerm {
                id: row.id.trim().to_string(),
                name: row.name.map(|n| sanitize(&n)).filter(|n| !n.is_empty()),
                aspect,
            });
        }
        Ok(terms)
    }

    /// Parses a relations TSV with `source`, `relation` and `target` columns.
    pub fn read_relations<R: Read>(reader: R) -> Result<Vec<GoRelation>, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .from_reader(reader);
        let relations = reader
            .deserialize::<GoRelation>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relations)
    }

    /// Parses `interpro2go` lines such as
    /// `InterPro:IPR000003 Retinoid X receptor/HNF4 > GO:DNA binding ; GO:0003677`.
    pub fn read_interpro2go<R: Read>(reader: R) -> Result<Vec<DomainAnnotation>, AppError> {
        let mut domains = Vec::new();
        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('!') {
                continue;
            }
            let parsed = line.split_once(' ').zip(line.rsplit_once(" ; "));
            let Some(((entry, _), (_, go_id))) = parsed else {
                return Err(AppError::Record {
                    line: index + 1,
                    message: format!("malformed interpro2go line '{}'", line),
                });
            };
            domains.push(DomainAnnotation {
                interpro: entry.trim_start_matches("InterPro:").to_string(),
                go_id: go_id.trim().to_string(),
            });
        }
        Ok(domains)
    }

    /// GO term nodes of the selected aspects.
    ///
    /// Terms come from the terms file; without one, every annotated term is
    /// emitted without a name.
    pub fn nodes(&self, data: &GoData) -> Vec<InputNode> {
        let mut seen = HashSet::new();
        let terms: Vec<(&str, Option<&str>, GoAspect)> = if data.terms.is_empty() {
            data.annotations
                .iter()
                .map(|a| (a.go_id.as_str(), None, a.aspect))
                .collect()
        } else {
            data.terms
                .iter()
                .map(|t| (t.id.as_str(), t.name.as_deref(), t.aspect))
                .collect()
        };

        let mut nodes = Vec::new();
        for (id, name, aspect) in terms {
            let node_type = aspect.node_type();
            if !self.node_types.contains(&node_type) || !seen.insert(id) {
                continue;
            }
            let mut node = InputNode::new(id, node_type.input_label());
            if let Some(name) = name {
                node = node.with_property("name", name);
            }
            nodes.push(node);
        }
        tracing::info!("Prepared {} GO node record(s)", nodes.len());
        nodes
    }

    /// Protein-GO, GO-GO and domain-GO edges, in that order.
    pub fn edges(&self, data: &GoData) -> Vec<InputEdge> {
        let aspects = data.aspects();
        let known = |id: &str| data.terms.is_empty() || aspects.contains_key(id);

        let mut edges = Vec::new();
        let mut removed = 0;
        for annotation in &data.annotations {
            if self.removed_evidence.contains(&annotation.evidence_code) {
                removed += 1;
                continue;
            }
            let Some(edge_type) = self.selected(GoNodeType::Protein, annotation.aspect) else {
                continue;
            };
            if !edge_type.qualifiers().contains(&annotation.qualifier.as_str())
                || !known(&annotation.go_id)
            {
                continue;
            }
            edges.push(
                InputEdge::new(
                    format!("uniprot:{}", annotation.protein),
                    annotation.go_id.clone(),
                    edge_type.input_label(&annotation.qualifier),
                )
                .with_property("reference", annotation.reference.as_str())
                .with_property("evidence_code", annotation.evidence_code.as_str()),
            );
        }
        if removed > 0 {
            tracing::debug!(
                "Dropped {} annotation(s) with evidence in {:?}",
                removed,
                self.removed_evidence
            );
        }

        for relation in &data.relations {
            let (Some(&source), Some(&target)) = (
                aspects.get(relation.source.as_str()),
                aspects.get(relation.target.as_str()),
            ) else {
                continue;
            };
            let Some(edge_type) = GoEdgeType::between(source.node_type(), target.node_type())
                .filter(|t| self.edge_types.contains(t))
            else {
                continue;
            };
            if edge_type.qualifiers().contains(&relation.relation.as_str()) {
                edges.push(InputEdge::new(
                    relation.source.clone(),
                    relation.target.clone(),
                    edge_type.input_label(&relation.relation),
                ));
            }
        }

        for domain in &data.domains {
            let Some(&aspect) = aspects.get(domain.go_id.as_str()) else {
                continue;
            };
            let Some(edge_type) = self.selected(GoNodeType::Domain, aspect) else {
                continue;
            };
            // one relation per aspect: involved_in, enables, located_in
            let relation = edge_type.qualifiers()[0];
            edges.push(InputEdge::new(
                format!("interpro:{}", domain.interpro),
                domain.go_id.clone(),
                edge_type.input_label(relation),
            ));
        }

        tracing::info!("Prepared {} GO edge record(s)", edges.len());
        edges
    }

    fn selected(&self, source: GoNodeType, aspect: GoAspect) -> Option<GoEdgeType> {
        GoEdgeType::between(source, aspect.node_type()).filter(|t| self.edge_types.contains(t))
    }
}
