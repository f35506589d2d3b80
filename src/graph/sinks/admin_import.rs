//! Offline sink producing `neo4j-admin import` files.
//!
//! Every label (or relationship type) gets one header file and one part file
//! per batch. `finish` writes `neo4j-admin-import-call.sh` next to them.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::config::OutputConfig;
use crate::error::AppError;
use crate::graph::traits::GraphSink;
use crate::models::{EdgeInstruction, NodeInstruction, Properties, PropertyType, Schema};

pub const IMPORT_CALL_FILE: &str = "neo4j-admin-import-call.sh";

/// Columns fixed by the first batch of a label, plus part bookkeeping.
#[derive(Debug, Clone)]
struct FileSet {
    columns: Vec<(String, PropertyType)>,
    parts: usize,
    rows: usize,
}

pub struct AdminImportWriter {
    dir: PathBuf,
    delimiter: u8,
    array_delimiter: char,
    quote: u8,
    database: String,
    import_binary: String,
    /// Declared property types per schema entity.
    declared: HashMap<String, Vec<(String, PropertyType)>>,
    node_files: BTreeMap<String, FileSet>,
    edge_files: BTreeMap<String, FileSet>,
}

impl AdminImportWriter {
    /// Creates a writer in `<output.dir>/<timestamp>`.
    pub fn timestamped(output: &OutputConfig, schema: &Schema) -> Result<Self, AppError> {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        Self::new(output.dir.join(stamp), output, schema)
    }

    /// Creates a writer in exactly `dir`, creating it if needed.
    ///
    /// # Arguments
    ///
    /// * `dir` - output directory; existing files with the same names are overwritten
    /// * `output` - delimiters, database name and import binary
    /// * `schema` - declared properties fix the header columns per entity
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidConfig`] for a delimiter that is not a single ASCII
    /// character, [`AppError::Io`] when the directory cannot be created.
    pub fn new(dir: PathBuf, output: &OutputConfig, schema: &Schema) -> Result<Self, AppError> {
        let (delimiter, array_delimiter, quote) = output.ascii_delimiters()?;
        fs::create_dir_all(&dir)?;
        tracing::info!("Writing import files to {}", dir.display());

        let declared = schema
            .entities()
            .filter_map(|e| e.properties().map(|p| (e.name().to_string(), p.to_vec())))
            .collect();

        Ok(Self {
            dir,
            delimiter,
            array_delimiter: array_delimiter as char,
            quote,
            database: output.database.clone(),
            import_binary: output.import_binary.clone(),
            declared,
            node_files: BTreeMap::new(),
            edge_files: BTreeMap::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.dir
    }

    /// The `neo4j-admin import` command for everything written so far.
    pub fn import_call(&self) -> String {
        let mut call = format!(
            "{} import --database={} --delimiter=\"{}\" --array-delimiter=\"{}\" --quote=\"{}\" \
             --force=true --skip-bad-relationships=true --skip-duplicate-nodes=true",
            self.import_binary,
            self.database,
            escape_char(self.delimiter as char),
            escape_char(self.array_delimiter),
            escape_char(self.quote as char),
        );
        for label in self.node_files.keys() {
            call.push_str(&format!(" --nodes=\"{}\"", self.file_glob(label)));
        }
        for relationship in self.edge_files.keys() {
            call.push_str(&format!(" --relationships=\"{}\"", self.file_glob(relationship)));
        }
        call
    }

    fn file_glob(&self, name: &str) -> String {
        format!(
            "{},{}",
            self.dir.join(header_file(name)).display(),
            self.dir.join(format!("{}-part.*", file_stem(name))).display()
        )
    }

    fn writer(&self, path: &Path) -> Result<csv::Writer<fs::File>, AppError> {
        Ok(csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(false)
            .from_path(path)?)
    }

    fn write_header(&self, name: &str, header: Vec<String>) -> Result<(), AppError> {
        let mut writer = self.writer(&self.dir.join(header_file(name)))?;
        writer.write_record(&header)?;
        writer.flush()?;
        Ok(())
    }

    fn columns_for(
        &self,
        entity: &str,
        rows: &[&Properties],
    ) -> Vec<(String, PropertyType)> {
        match self.declared.get(entity) {
            Some(declared) => declared.clone(),
            None => infer_columns(rows),
        }
    }

    fn render_properties(&self, columns: &[(String, PropertyType)], properties: &Properties) -> Vec<String> {
        columns
            .iter()
            .map(|(key, _)| {
                properties
                    .get(key)
                    .map(|value| render_value(value, self.array_delimiter))
                    .unwrap_or_default()
            })
            .collect()
    }
}

#[async_trait]
impl GraphSink for AdminImportWriter {
    async fn write_nodes(&mut self, nodes: &[NodeInstruction]) -> Result<usize, AppError> {
        let mut groups: BTreeMap<&str, Vec<&NodeInstruction>> = BTreeMap::new();
        for node in nodes {
            groups.entry(node.primary_label()).or_default().push(node);
        }

        for (label, group) in groups {
            let mut files = match self.node_files.get(label) {
                Some(files) => files.clone(),
                None => {
                    let props: Vec<&Properties> = group.iter().map(|n| &n.properties).collect();
                    let columns = self.columns_for(&group[0].entity, &props);
                    let mut header = vec!["id:ID".to_string()];
                    header.extend(columns.iter().map(column_header));
                    header.push(":LABEL".to_string());
                    self.write_header(label, header)?;
                    FileSet {
                        columns,
                        parts: 0,
                        rows: 0,
                    }
                }
            };

            let path = self.dir.join(part_file(label, files.parts));
            let mut writer = self.writer(&path)?;
            for node in &group {
                let mut record = vec![node.id.clone()];
                record.extend(self.render_properties(&files.columns, &node.properties));
                record.push(node.labels.join(&self.array_delimiter.to_string()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
            tracing::debug!("Wrote {} {} node(s) to {}", group.len(), label, path.display());

            files.parts += 1;
            files.rows += group.len();
            self.node_files.insert(label.to_string(), files);
        }
        Ok(nodes.len())
    }

    async fn write_edges(&mut self, edges: &[EdgeInstruction]) -> Result<usize, AppError> {
        let mut groups: BTreeMap<&str, Vec<&EdgeInstruction>> = BTreeMap::new();
        for edge in edges {
            groups.entry(edge.relationship.as_str()).or_default().push(edge);
        }

        for (relationship, group) in groups {
            let mut files = match self.edge_files.get(relationship) {
                Some(files) => files.clone(),
                None => {
                    let props: Vec<&Properties> = group.iter().map(|e| &e.properties).collect();
                    let columns = self.columns_for(&group[0].entity, &props);
                    let mut header = vec![":START_ID".to_string(), "id".to_string()];
                    header.extend(columns.iter().map(column_header));
                    header.push(":END_ID".to_string());
                    header.push(":TYPE".to_string());
                    self.write_header(relationship, header)?;
                    FileSet {
                        columns,
                        parts: 0,
                        rows: 0,
                    }
                }
            };

            let path = self.dir.join(part_file(relationship, files.parts));
            let mut writer = self.writer(&path)?;
            for edge in &group {
                let mut record = vec![edge.source.clone(), edge.id.clone().unwrap_or_default()];
                record.extend(self.render_properties(&files.columns, &edge.properties));
                record.push(edge.target.clone());
                record.push(edge.relationship.clone());
                writer.write_record(&record)?;
            }
            writer.flush()?;
            tracing::debug!(
                "Wrote {} {} edge(s) to {}",
                group.len(),
                relationship,
                path.display()
            );

            files.parts += 1;
            files.rows += group.len();
            self.edge_files.insert(relationship.to_string(), files);
        }
        Ok(edges.len())
    }

    async fn finish(&mut self) -> Result<(), AppError> {
        let path = self.dir.join(IMPORT_CALL_FILE);
        fs::write(&path, format!("#!/bin/bash\n{}\n", self.import_call()))?;

        let nodes: usize = self.node_files.values().map(|f| f.rows).sum();
        let edges: usize = self.edge_files.values().map(|f| f.rows).sum();
        tracing::info!(
            "Import files ready: {} node(s) in {} label(s), {} edge(s) in {} type(s); run {}",
            nodes,
            self.node_files.len(),
            edges,
            self.edge_files.len(),
            path.display()
        );
        Ok(())
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn header_file(name: &str) -> String {
    format!("{}-header.csv", file_stem(name))
}

fn part_file(name: &str, part: usize) -> String {
    format!("{}-part{:03}.csv", file_stem(name), part)
}

fn column_header((name, kind): &(String, PropertyType)) -> String {
    match kind {
        PropertyType::Str => name.clone(),
        other => format!("{}:{}", name, other.import_type()),
    }
}

fn escape_char(c: char) -> String {
    match c {
        '\t' => "\\t".to_string(),
        '"' => "\\\"".to_string(),
        other => other.to_string(),
    }
}

/// Column types from the first non-null value of each key, in key order.
fn infer_columns(rows: &[&Properties]) -> Vec<(String, PropertyType)> {
    let mut columns: BTreeMap<String, PropertyType> = BTreeMap::new();
    for properties in rows {
        for (key, value) in properties.iter() {
            if columns.contains_key(key) {
                continue;
            }
            if let Some(kind) = infer_type(value) {
                columns.insert(key.clone(), kind);
            }
        }
    }
    columns.into_iter().collect()
}

fn infer_type(value: &JsonValue) -> Option<PropertyType> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(_) => Some(PropertyType::Bool),
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => Some(PropertyType::Int),
        JsonValue::Number(_) => Some(PropertyType::Float),
        JsonValue::Array(items) => Some(match items.iter().find_map(infer_type) {
            Some(PropertyType::Int) => PropertyType::IntArray,
            Some(PropertyType::Float) => PropertyType::FloatArray,
            _ => PropertyType::StrArray,
        }),
        JsonValue::String(_) | JsonValue::Object(_) => Some(PropertyType::Str),
    }
}

fn render_value(value: &JsonValue, array_delimiter: char) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| render_value(item, array_delimiter))
            .collect::<Vec<_>>()
            .join(&array_delimiter.to_string()),
        other => other.to_string(),
    }
}
