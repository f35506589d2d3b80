//! UniProt adapter: turns a UniProt TSV export into protein, gene and
//! organism records.
//!
//! Column headers are UniProt field keys (`id`, `length`, `organism-id`,
//! `protein names`, `database(GeneID)`, ...). Missing columns are fine; a
//! record only gets the properties its row carries.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde_json::{json, Value as JsonValue};

use crate::error::AppError;
use crate::models::{InputEdge, InputNode, Properties};

pub const SOURCE: &str = "uniprot";
pub const LICENCE: &str = "CC BY 4.0";
pub const VERSION: &str = "2022_04";

const PROTEIN_FIELDS: &[&str] = &[
    "secondary_ids",
    "length",
    "mass",
    "protein names",
    "proteome",
    "ec",
    "virus hosts",
    "organism-id",
];
const GENE_FIELDS: &[&str] = &["genes", "database(GeneID)", "database(KEGG)", "database(Ensembl)"];
const INTEGER_FIELDS: &[&str] = &["length", "mass", "organism-id"];
const SPLIT_FIELDS: &[&str] = &[
    "secondary_ids",
    "proteome",
    "genes",
    "ec",
    "database(GeneID)",
    "database(Ensembl)",
    "database(KEGG)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniprotNodeType {
    Protein,
    Gene,
    Organism,
}

impl UniprotNodeType {
    pub fn all() -> &'static [UniprotNodeType] {
        &[
            UniprotNodeType::Protein,
            UniprotNodeType::Gene,
            UniprotNodeType::Organism,
        ]
    }

    /// Input label of the records this type produces.
    pub fn input_label(&self) -> &'static str {
        match self {
            UniprotNodeType::Protein => "protein",
            UniprotNodeType::Gene => "gene",
            UniprotNodeType::Organism => "organism",
        }
    }
}

impl fmt::Display for UniprotNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.input_label())
    }
}

impl FromStr for UniprotNodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "protein" | "Protein" => Ok(UniprotNodeType::Protein),
            "gene" | "Gene" => Ok(UniprotNodeType::Gene),
            "organism" | "Organism" => Ok(UniprotNodeType::Organism),
            _ => Err(format!(
                "Invalid UniProt node type '{}'. Valid values: protein, gene, organism",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniprotEdgeType {
    /// Gene `Encodes` protein.
    GeneToProtein,
    /// Protein `Belongs_To` organism.
    ProteinToOrganism,
}

impl UniprotEdgeType {
    pub fn all() -> &'static [UniprotEdgeType] {
        &[UniprotEdgeType::GeneToProtein, UniprotEdgeType::ProteinToOrganism]
    }

    pub fn input_label(&self) -> &'static str {
        match self {
            UniprotEdgeType::GeneToProtein => "Encodes",
            UniprotEdgeType::ProteinToOrganism => "Belongs_To",
        }
    }
}

impl fmt::Display for UniprotEdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniprotEdgeType::GeneToProtein => f.write_str("gene-to-protein"),
            UniprotEdgeType::ProteinToOrganism => f.write_str("protein-to-organism"),
        }
    }
}

impl FromStr for UniprotEdgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gene-to-protein" | "Encodes" => Ok(UniprotEdgeType::GeneToProtein),
            "protein-to-organism" | "Belongs_To" => Ok(UniprotEdgeType::ProteinToOrganism),
            _ => Err(format!(
                "Invalid UniProt edge type '{}'. Valid values: gene-to-protein, protein-to-organism",
                s
            )),
        }
    }
}

/// One row of the export: accession plus raw column values.
#[derive(Debug, Clone, PartialEq)]
pub struct UniprotEntry {
    pub accession: String,
    pub fields: HashMap<String, String>,
}

impl UniprotEntry {
    /// Raw value of a column, `None` when missing or blank.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Builds records from UniProt entries for the selected node and edge types.
#[derive(Debug, Clone)]
pub struct UniprotAdapter {
    node_types: Vec<UniprotNodeType>,
    edge_types: Vec<UniprotEdgeType>,
}

impl Default for UniprotAdapter {
    fn default() -> Self {
        Self {
            node_types: UniprotNodeType::all().to_vec(),
            edge_types: UniprotEdgeType::all().to_vec(),
        }
    }
}

impl UniprotAdapter {
    pub fn new(node_types: Vec<UniprotNodeType>, edge_types: Vec<UniprotEdgeType>) -> Self {
        Self {
            node_types,
            edge_types,
        }
    }

    /// Reads a UniProt TSV export from disk.
    ///
    /// # Errors
    ///
    /// [`AppError::Io`] when the file cannot be opened, otherwise as [`Self::read`].
    pub fn read_path(path: &Path) -> Result<Vec<UniprotEntry>, AppError> {
        let file = std::fs::File::open(path)?;
        let entries = Self::read(file)?;
        tracing::info!("Read {} UniProt entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    /// Parses a tab-separated export with a header row.
    pub fn read<R: Read>(reader: R) -> Result<Vec<UniprotEntry>, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (index, row) in reader.deserialize::<HashMap<String, String>>().enumerate() {
            let mut fields = row?;
            let accession = fields
                .remove("id")
                .or_else(|| fields.remove("Entry"))
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .ok_or_else(|| AppError::Record {
                    line: index + 2,
                    message: "missing UniProt accession in column 'id'".to_string(),
                })?;
            entries.push(UniprotEntry { accession, fields });
        }
        Ok(entries)
    }

    /// Protein, gene and organism nodes, in entry order.
    pub fn nodes(&self, entries: &[UniprotEntry]) -> Vec<InputNode> {
        let mut nodes = Vec::new();
        for entry in entries {
            let protein_id = protein_curie(&entry.accession);
            let mut protein = Properties::new();
            let mut gene = Properties::new();
            let mut organism = Properties::new();

            for &key in PROTEIN_FIELDS {
                if let Some(value) = Self::field_value(entry, key) {
                    protein.insert(property_key(key), value);
                }
            }

            let gene_id = Self::gene_id(entry);
            if gene_id.is_some() {
                for &key in GENE_FIELDS.iter().filter(|k| **k != "database(GeneID)") {
                    if let Some(value) = Self::field_value(entry, key) {
                        gene.insert(gene_property_key(key), value);
                    }
                }
            }

            if let Some(name) = entry.raw("organism") {
                organism.insert("organism".to_string(), json!(sanitize(name)));
            }
            let organism_id = entry.raw("organism-id").map(|id| taxon_curie(&sanitize(id)));

            for properties in [&mut protein, &mut gene, &mut organism] {
                add_provenance(properties);
            }

            if self.node_types.contains(&UniprotNodeType::Protein) {
                nodes.push(Self::node(protein_id, UniprotNodeType::Protein, protein));
            }
            if let (Some(id), true) = (gene_id, self.node_types.contains(&UniprotNodeType::Gene)) {
                nodes.push(Self::node(id, UniprotNodeType::Gene, gene));
            }
            if let (Some(id), true) = (
                organism_id,
                self.node_types.contains(&UniprotNodeType::Organism),
            ) {
                nodes.push(Self::node(id, UniprotNodeType::Organism, organism));
            }
        }
        tracing::info!("Prepared {} UniProt node record(s)", nodes.len());
        nodes
    }

    /// `Encodes` (gene to protein) and `Belongs_To` (protein to organism) edges.
    pub fn edges(&self, entries: &[UniprotEntry]) -> Vec<InputEdge> {
        let mut edges = Vec::new();
        for entry in entries {
            let protein_id = protein_curie(&entry.accession);

            if self.edge_types.contains(&UniprotEdgeType::GeneToProtein) {
                if let Some(gene) = Self::gene_id(entry) {
                    edges.push(InputEdge::new(
                        gene,
                        protein_id.clone(),
                        UniprotEdgeType::GeneToProtein.input_label(),
                    ));
                }
            }

            if self.edge_types.contains(&UniprotEdgeType::ProteinToOrganism) {
                if let Some(taxon) = entry.raw("organism-id") {
                    edges.push(InputEdge::new(
                        protein_id.clone(),
                        taxon_curie(&sanitize(taxon)),
                        UniprotEdgeType::ProteinToOrganism.input_label(),
                    ));
                }
            }
        }
        tracing::info!("Prepared {} UniProt edge record(s)", edges.len());
        edges
    }

    /// Gene CURIE, only for entries naming both genes and a GeneID.
    fn gene_id(entry: &UniprotEntry) -> Option<String> {
        entry.raw("genes")?;
        split_field("database(GeneID)", entry.raw("database(GeneID)"))
            .and_then(|v| v.as_str().map(gene_curie))
    }

    fn node(id: String, kind: UniprotNodeType, properties: Properties) -> InputNode {
        InputNode {
            id,
            label: kind.input_label().to_string(),
            properties,
            xrefs: Vec::new(),
        }
    }

    /// Parsed value of one column, following the column's splitting rules.
    fn field_value(entry: &UniprotEntry, key: &str) -> Option<JsonValue> {
        let raw = entry.raw(key)?;
        if INTEGER_FIELDS.contains(&key) {
            let digits = sanitize(raw).replace(',', "");
            return match digits.parse::<i64>() {
                Ok(n) => Some(json!(n)),
                Err(_) => {
                    tracing::warn!("{}: '{}' is not an integer: {}", entry.accession, key, raw);
                    None
                }
            };
        }
        match key {
            "protein names" => Some(split_protein_names(raw)),
            "virus hosts" => split_virus_hosts(raw),
            k if SPLIT_FIELDS.contains(&k) => split_field(k, Some(raw)),
            _ => Some(json!(sanitize(raw))),
        }
    }
}

fn protein_curie(accession: &str) -> String {
    format!("uniprot:{}", accession)
}

fn gene_curie(id: &str) -> String {
    format!("ncbigene:{}", id)
}

fn taxon_curie(id: &str) -> String {
    format!("ncbitaxon:{}", id)
}

/// `organism-id` becomes `organism_id`, `protein names` becomes `protein_names`.
fn property_key(key: &str) -> String {
    key.replace([' ', '-'], "_")
}

/// `database(KEGG)` becomes `kegg`.
fn gene_property_key(key: &str) -> String {
    match key.split_once('(') {
        Some((_, rest)) => rest.trim_end_matches(')').to_lowercase(),
        None => property_key(key),
    }
}

fn add_provenance(properties: &mut Properties) {
    properties.insert("source".to_string(), json!(SOURCE));
    properties.insert("licence".to_string(), json!(LICENCE));
    properties.insert("version".to_string(), json!(VERSION));
}

/// Replaces characters that break admin-import files.
pub fn sanitize(value: &str) -> String {
    value.replace('|', ",").replace('\'', "^").trim().to_string()
}

fn collapse(mut values: Vec<String>) -> Option<JsonValue> {
    values.retain(|v| !v.is_empty());
    match values.len() {
        0 => None,
        1 => values.pop().map(JsonValue::String),
        _ => Some(json!(values)),
    }
}

/// Splits a multi-valued column.
///
/// `proteome` splits on commas and `genes` on spaces; everything else on
/// semicolons. KEGG entries keep the part after the colon and GeneID keeps
/// the first id. A single value collapses to a string.
pub fn split_field(key: &str, value: Option<&str>) -> Option<JsonValue> {
    let value = sanitize(value?);
    if value.is_empty() {
        return None;
    }

    let parts: Vec<String> = match key {
        "proteome" => value.split(',').map(|s| s.trim().to_string()).collect(),
        "genes" => value.split_whitespace().map(str::to_string).collect(),
        _ => {
            let parts = value.trim_matches(';').split(';').map(str::trim);
            match key {
                "database(KEGG)" => parts
                    .map(|p| p.split_once(':').map_or(p, |(_, id)| id).trim().to_string())
                    .collect(),
                "database(GeneID)" => parts.take(1).map(str::to_string).collect(),
                _ => parts.map(str::to_string).collect(),
            }
        }
    };
    collapse(parts)
}

/// Splits the `protein names` column into its names.
///
/// `"Acetate kinase (EC 2.7.2.1) (Acetokinase)"` gives
/// `["Acetate kinase", "Acetokinase"]`. EC numbers and fragment markers are
/// dropped, as is everything from `[Cleaved` or `[Includes` on.
pub fn split_protein_names(value: &str) -> JsonValue {
    let mut value = sanitize(value);
    if let Some(clip) = ["[Cleaved", "[Includes"]
        .iter()
        .filter_map(|marker| value.find(marker))
        .min()
    {
        value.truncate(clip);
    }
    let value = value.replace("(Fragment)", "");
    let value = value.trim();

    if !value.contains(" (") {
        return json!(value);
    }

    let names: Vec<String> = value
        .split(" (")
        .enumerate()
        .map(|(i, name)| (i, name.trim()))
        .filter(|(i, name)| !name.starts_with("Fragm") && !(*i > 0 && name.starts_with("EC")))
        .map(|(_, name)| name.trim_end_matches(')').trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    json!(names)
}

/// Extracts host taxon ids from the `virus hosts` column.
///
/// `"Pyrobaculum arsenaticum [TaxID: 121277]; Pyrobaculum oguniense [TaxID: 99007]"`
/// gives `["121277", "99007"]`.
pub fn split_virus_hosts(value: &str) -> Option<JsonValue> {
    let ids = value
        .split(';')
        .filter_map(|host| {
            let start = host.find('[')?;
            let end = host[start..].find(']')? + start;
            let (_, id) = host[start + 1..end].split_once(':')?;
            Some(id.trim().to_string())
        })
        .collect();
    collapse(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "id\tlength\tmass\torganism\torganism-id\tprotein names\tgenes\tdatabase(GeneID)\tdatabase(KEGG)\tec\n\
P04637\t393\t43,653\tHomo sapiens (Human)\t9606\tCellular tumor antigen p53 (Antigen NY-CO-13) (Phosphoprotein p53)\tTP53 P53\t7157;\thsa:7157;\t\n\
Q9XYZ1\t120\t13,000\tTest virus\t10000\tAcetate kinase (EC 2.7.2.1) (Acetokinase)\t\t\t\t2.7.2.1\n";

    fn entries() -> Vec<UniprotEntry> {
        UniprotAdapter::read(TSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_split_protein_names() {
        assert_eq!(
            split_protein_names("Acetate kinase (EC 2.7.2.1) (Acetokinase)"),
            json!(["Acetate kinase", "Acetokinase"])
        );
        assert_eq!(split_protein_names("Insulin (Fragment)"), json!("Insulin"));
        assert_eq!(
            split_protein_names("Genome polyprotein [Cleaved into: Capsid protein C (Core)]"),
            json!("Genome polyprotein")
        );
        assert_eq!(
            split_protein_names("Bifunctional protein (BP) [Includes: Kinase (EC 2.7.1.1)]"),
            json!(["Bifunctional protein", "BP"])
        );
    }

    #[test]
    fn test_split_virus_hosts() {
        assert_eq!(
            split_virus_hosts(
                "Pyrobaculum arsenaticum [TaxID: 121277]; Pyrobaculum oguniense [TaxID: 99007]"
            ),
            Some(json!(["121277", "99007"]))
        );
        assert_eq!(split_virus_hosts("Homo sapiens [TaxID: 9606]"), Some(json!("9606")));
        assert_eq!(split_virus_hosts("no host listed"), None);
    }

    #[test]
    fn test_split_field_rules() {
        assert_eq!(split_field("genes", Some("TP53 P53")), Some(json!(["TP53", "P53"])));
        assert_eq!(split_field("database(GeneID)", Some("7157;1234;")), Some(json!("7157")));
        assert_eq!(
            split_field("database(KEGG)", Some("hsa:7157; ptr:456;")),
            Some(json!(["7157", "456"]))
        );
        assert_eq!(
            split_field("proteome", Some("UP000005640: Chromosome 17")),
            Some(json!("UP000005640: Chromosome 17"))
        );
        assert_eq!(split_field("ec", Some("1.1.1.1|2.2.2.2")), Some(json!("1.1.1.1,2.2.2.2")));
        assert_eq!(split_field("ec", Some("  ")), None);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(" 5'-nucleotidase|x "), "5^-nucleotidase,x");
    }

    #[test]
    fn test_nodes_for_all_types() {
        let nodes = UniprotAdapter::default().nodes(&entries());
        let ids: Vec<_> = nodes.iter().map(|n| (n.id.as_str(), n.label.as_str())).collect();
        assert_eq!(
            ids,
            vec![
                ("uniprot:P04637", "protein"),
                ("ncbigene:7157", "gene"),
                ("ncbitaxon:9606", "organism"),
                ("uniprot:Q9XYZ1", "protein"),
                ("ncbitaxon:10000", "organism"),
            ]
        );

        let p53 = &nodes[0].properties;
        assert_eq!(p53["length"], json!(393));
        assert_eq!(p53["mass"], json!(43653));
        assert_eq!(p53["organism_id"], json!(9606));
        assert_eq!(
            p53["protein_names"],
            json!(["Cellular tumor antigen p53", "Antigen NY-CO-13", "Phosphoprotein p53"])
        );
        assert_eq!(p53["source"], json!("uniprot"));
        assert_eq!(p53["licence"], json!("CC BY 4.0"));
        assert!(p53.get("genes").is_none());

        let gene = &nodes[1].properties;
        assert_eq!(gene["genes"], json!(["TP53", "P53"]));
        assert_eq!(gene["kegg"], json!("7157"));
        assert_eq!(gene["version"], json!("2022_04"));

        assert_eq!(nodes[2].properties["organism"], json!("Homo sapiens (Human)"));
    }

    #[test]
    fn test_node_type_selection() {
        let adapter = UniprotAdapter::new(vec![UniprotNodeType::Gene], vec![]);
        let nodes = adapter.nodes(&entries());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].label, "gene");
        assert!(adapter.edges(&entries()).is_empty());
    }

    #[test]
    fn test_edges() {
        let edges = UniprotAdapter::default().edges(&entries());
        let triples: Vec<_> = edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.label.as_str()))
            .collect();
        assert_eq!(
            triples,
            vec![
                ("ncbigene:7157", "uniprot:P04637", "Encodes"),
                ("uniprot:P04637", "ncbitaxon:9606", "Belongs_To"),
                ("uniprot:Q9XYZ1", "ncbitaxon:10000", "Belongs_To"),
            ]
        );
        assert!(edges.iter().all(|e| e.id.is_none()));
    }

    #[test]
    fn test_gene_id_without_gene_name_yields_no_gene() {
        let tsv = "id\tgenes\tdatabase(GeneID)\n\
P00001\t\t4242;\n\
P00002\tABC1\t\n";
        let entries = UniprotAdapter::read(tsv.as_bytes()).unwrap();
        let adapter = UniprotAdapter::default();
        assert!(adapter.nodes(&entries).iter().all(|n| n.label != "gene"));
        assert!(adapter.edges(&entries).iter().all(|e| e.label != "Encodes"));
    }

    #[test]
    fn test_missing_accession_is_an_error() {
        let err = UniprotAdapter::read("id\tlength\n\t12\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Record { line: 2, .. }));
    }

    #[test]
    fn test_type_names() {
        assert_eq!("gene".parse::<UniprotNodeType>(), Ok(UniprotNodeType::Gene));
        assert_eq!(
            "protein-to-organism".parse::<UniprotEdgeType>(),
            Ok(UniprotEdgeType::ProteinToOrganism)
        );
        assert!("domain".parse::<UniprotNodeType>().is_err());
        assert_eq!(UniprotEdgeType::GeneToProtein.to_string(), "gene-to-protein");
    }
}
