//! Build command: records in, graph out.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;

use crate::adapters::{
    GoAdapter, GoData, GoEdgeType, GoNodeType, UniprotAdapter, UniprotEdgeType, UniprotNodeType,
};
use crate::error::AppError;
use crate::context::Context;
use crate::graph::backends::neo4j::Neo4jClient;
use crate::graph::sinks::{write_batch, AdminImportWriter, Neo4jWriter};
use crate::graph::GraphSink;
use crate::repositories::{read_edges, read_nodes};
use crate::services::{GraphEmitter, HierarchyResolver, ValidationService};
use crate::FromRef;

use super::print_json;

/// Map input records onto the schema and write the graph.
///
/// Without `--online` the graph is written as `neo4j-admin import` files.
#[derive(Parser)]
pub struct BuildCommand {
    /// JSON-lines node records (repeatable)
    #[arg(long)]
    pub nodes: Vec<PathBuf>,

    /// JSON-lines edge records (repeatable)
    #[arg(long)]
    pub edges: Vec<PathBuf>,

    /// UniProt TSV export
    #[arg(long)]
    pub uniprot: Option<PathBuf>,

    /// UniProt node types to produce
    #[arg(long, value_delimiter = ',', default_values = ["protein", "gene", "organism"])]
    pub uniprot_nodes: Vec<UniprotNodeType>,

    /// UniProt edge types to produce
    #[arg(long, value_delimiter = ',', default_values = ["gene-to-protein", "protein-to-organism"])]
    pub uniprot_edges: Vec<UniprotEdgeType>,

    /// Gene Ontology annotations in GAF format
    #[arg(long)]
    pub go_annotations: Option<PathBuf>,

    /// GO terms TSV with `id`, `name` and `aspect` columns
    #[arg(long)]
    pub go_terms: Option<PathBuf>,

    /// GO term relations TSV with `source`, `relation` and `target` columns
    #[arg(long)]
    pub go_relations: Option<PathBuf>,

    /// InterPro2GO mapping file
    #[arg(long)]
    pub interpro2go: Option<PathBuf>,

    /// GO node types to produce
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["protein", "domain", "biological-process", "cellular-component", "molecular-function"]
    )]
    pub go_nodes: Vec<GoNodeType>,

    /// GO edge types to produce (default: all)
    #[arg(long, value_delimiter = ',')]
    pub go_edges: Vec<GoEdgeType>,

    /// Write into a running Neo4j instead of import files
    #[arg(long)]
    pub online: bool,

    /// Exact output directory for import files (default: timestamped under `output.dir`)
    #[arg(long, conflicts_with = "online")]
    pub out: Option<PathBuf>,
}

impl BuildCommand {
    /// Validates the schema, maps every input, then writes the batch.
    ///
    /// # Errors
    ///
    /// Fails before reading any input when the schema has error-severity
    /// issues, and on unreadable inputs or sink failures.
    pub async fn run(&self, ctx: Context) -> Result<()> {
        ValidationService::from_ref(&ctx).check()?;
        let mut emitter = GraphEmitter::new(
            ctx.schema.clone(),
            &HierarchyResolver::from_ref(&ctx),
            ctx.endpoint_aliases,
        )?;

        let uniprot = match &self.uniprot {
            Some(path) => Some((
                UniprotAdapter::new(self.uniprot_nodes.clone(), self.uniprot_edges.clone()),
                UniprotAdapter::read_path(path)?,
            )),
            None => None,
        };
        let go = match self.go_data()? {
            Some(data) => {
                let edge_types = if self.go_edges.is_empty() {
                    GoEdgeType::all().to_vec()
                } else {
                    self.go_edges.clone()
                };
                let adapter = GoAdapter::new(
                    self.go_nodes.clone(),
                    edge_types,
                    ctx.config.go.removed_evidence.clone(),
                )?;
                Some((adapter, data))
            }
            None => None,
        };

        // every node before any edge so endpoints can be rewritten and type-checked
        if let Some((adapter, entries)) = &uniprot {
            emitter.emit_nodes(adapter.nodes(entries));
        }
        if let Some((adapter, data)) = &go {
            emitter.emit_nodes(adapter.nodes(data));
        }
        for path in &self.nodes {
            emitter.emit_nodes(read_nodes(path)?);
        }
        if let Some((adapter, entries)) = &uniprot {
            emitter.emit_edges(adapter.edges(entries));
        }
        if let Some((adapter, data)) = &go {
            emitter.emit_edges(adapter.edges(data));
        }
        for path in &self.edges {
            emitter.emit_edges(read_edges(path)?);
        }

        let batch = emitter.finish();
        tracing::info!(
            "Emitted {} node(s) and {} edge(s)",
            batch.summary.total_nodes(),
            batch.summary.total_edges()
        );

        let mut sink = self.sink(&ctx).await?;
        write_batch(sink.as_mut(), &batch).await?;
        print_json(&batch.summary)
    }

    /// Reads the GO inputs given on the command line, if any.
    fn go_data(&self) -> Result<Option<GoData>, AppError> {
        let inputs = [
            &self.go_terms,
            &self.go_annotations,
            &self.go_relations,
            &self.interpro2go,
        ];
        if inputs.iter().all(|path| path.is_none()) {
            return Ok(None);
        }

        let open = |path: &PathBuf| std::fs::File::open(path).map_err(AppError::from);
        let mut data = GoData::default();
        if let Some(path) = &self.go_terms {
            data.terms = GoAdapter::read_terms(open(path)?)?;
        }
        if let Some(path) = &self.go_annotations {
            data.annotations = GoAdapter::read_annotations(open(path)?)?;
        }
        if let Some(path) = &self.go_relations {
            data.relations = GoAdapter::read_relations(open(path)?)?;
        }
        if let Some(path) = &self.interpro2go {
            data.domains = GoAdapter::read_interpro2go(open(path)?)?;
        }
        Ok(Some(data))
    }

    async fn sink(&self, ctx: &Context) -> Result<Box<dyn GraphSink>> {
        if self.online {
            let neo4j = &ctx.config.neo4j;
            let client = Neo4jClient::connect(
                &neo4j.uri,
                &neo4j.user,
                neo4j.password.as_deref().unwrap_or(""),
            )
            .await?;
            return Ok(Box::new(Neo4jWriter::new(client, neo4j)));
        }

        let output = &ctx.config.output;
        let writer = match &self.out {
            Some(dir) => AdminImportWriter::new(dir.clone(), output, &ctx.schema)?,
            None => AdminImportWriter::timestamped(output, &ctx.schema)?,
        };
        Ok(Box::new(writer))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use clap::Parser;
    use tempfile::{NamedTempFile, TempDir};

    use crate::cli::{App, Command};
    use crate::error::AppError;

    const SCHEMA: &str = r#"
Protein:
  represented_as: node
  preferred_id: UniProtKB
  label_in_input: protein
Interacts_With:
  represented_as: edge
  source: Protein
  target: Protein
  label_as_edge: Interacts_With
  label_in_input: IntAct
"#;

    const NODES: &str = "[\"uniprot:P04637\", \"protein\", {}]\n[\"uniprot:P38398\", \"protein\", {}]\n";

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    async fn build(
        schema: &NamedTempFile,
        nodes: &NamedTempFile,
        out: &std::path::Path,
    ) -> color_eyre::Result<()> {
        let app = App::parse_from([
            "crossbar",
            "--schema",
            schema.path().to_str().unwrap(),
            "build",
            "--nodes",
            nodes.path().to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ]);
        assert!(matches!(app.command, Command::Build(_)));
        app.run().await
    }

    #[tokio::test]
    async fn test_build_writes_import_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("import");
        build(&temp_file(SCHEMA), &temp_file(NODES), &out).await.unwrap();
        assert!(out.join(crate::graph::sinks::IMPORT_CALL_FILE).exists());
    }

    #[tokio::test]
    async fn test_build_refuses_invalid_schema() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("import");
        let schema = temp_file(&SCHEMA.replace("target: Protein", "target: Enzyme"));

        let report = build(&schema, &temp_file(NODES), &out).await.unwrap_err();
        assert!(matches!(
            report.downcast_ref::<AppError>(),
            Some(AppError::Validation(1))
        ));
        // nothing is written once validation fails
        assert!(fs::metadata(&out).is_err());
    }
}
