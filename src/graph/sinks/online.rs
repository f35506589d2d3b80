//! Online sink writing straight into a running graph database.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::config::Neo4jConfig;
use crate::error::AppError;
use crate::graph::cypher::{
    constraint_statement, merge_edges_statement, merge_nodes_statement, WIPE_STATEMENT,
};
use crate::graph::query::QueryExt;
use crate::graph::traits::{GraphClient, GraphSink, Transaction};
use crate::models::{EdgeInstruction, NodeInstruction};

/// Writes instructions as batched `UNWIND $rows ... MERGE` statements.
///
/// Each batch runs in its own transaction. Constraints are created in
/// auto-commit mode before the first batch of a label.
pub struct Neo4jWriter<C: GraphClient> {
    client: C,
    batch_size: usize,
    wipe: bool,
    prepared: bool,
    constrained: HashSet<String>,
    /// Leaf label of every node written, for narrowing edge lookups.
    node_labels: HashMap<String, String>,
}

impl<C: GraphClient> Neo4jWriter<C> {
    pub fn new(client: C, config: &Neo4jConfig) -> Self {
        Self {
            client,
            batch_size: config.batch_size.max(1),
            wipe: config.wipe,
            prepared: false,
            constrained: HashSet::new(),
            node_labels: HashMap::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn prepare(&mut self) -> Result<(), AppError> {
        if self.prepared {
            return Ok(());
        }
        if self.wipe {
            tracing::warn!("Wiping the target database before writing");
            self.client.query(WIPE_STATEMENT).run().await?;
        }
        self.prepared = true;
        Ok(())
    }

    async fn ensure_constraint(&mut self, label: &str) -> Result<(), AppError> {
        if self.constrained.insert(label.to_string()) {
            self.client.query(&constraint_statement(label)).run().await?;
        }
        Ok(())
    }

    /// Runs one statement over `rows` in batches, one transaction each.
    async fn run_batches(&self, statement: &str, rows: Vec<JsonValue>) -> Result<(), AppError> {
        for chunk in rows.chunks(self.batch_size) {
            let txn = self.client.begin().await?;
            let result = txn
                .query(statement)
                .param("rows", JsonValue::Array(chunk.to_vec()))
                .run()
                .await;
            match result {
                Ok(()) => txn.commit().await?,
                Err(e) => {
                    if let Err(rollback) = txn.rollback().await {
                        tracing::warn!("Rollback failed: {}", rollback);
                    }
                    return Err(e);
                }
            }
            tracing::debug!("Committed batch of {} row(s)", chunk.len());
        }
        Ok(())
    }
}

#[async_trait]
impl<C: GraphClient> GraphSink for Neo4jWriter<C> {
    async fn write_nodes(&mut self, nodes: &[NodeInstruction]) -> Result<usize, AppError> {
        self.prepare().await?;

        let mut groups: BTreeMap<&[String], Vec<JsonValue>> = BTreeMap::new();
        for node in nodes {
            groups
                .entry(node.labels.as_slice())
                .or_default()
                .push(json!({"id": node.id, "properties": node.properties}));
            self.node_labels
                .insert(node.id.clone(), node.primary_label().to_string());
        }

        for (labels, rows) in groups {
            if let Some(leaf) = labels.first() {
                self.ensure_constraint(leaf).await?;
            }
            tracing::info!("Merging {} node(s) labelled {}", rows.len(), labels.join(":"));
            self.run_batches(&merge_nodes_statement(labels), rows).await?;
        }
        Ok(nodes.len())
    }

    async fn write_edges(&mut self, edges: &[EdgeInstruction]) -> Result<usize, AppError> {
        self.prepare().await?;

        let mut groups: BTreeMap<(&str, Option<&str>, Option<&str>), Vec<JsonValue>> =
            BTreeMap::new();
        for edge in edges {
            let mut properties = edge.properties.clone();
            if let Some(id) = &edge.id {
                properties.insert("id".to_string(), json!(id));
            }
            let key = (
                edge.relationship.as_str(),
                self.node_labels.get(&edge.source).map(String::as_str),
                self.node_labels.get(&edge.target).map(String::as_str),
            );
            groups.entry(key).or_default().push(json!({
                "source": edge.source,
                "target": edge.target,
                "properties": properties,
            }));
        }

        for ((relationship, source, target), rows) in groups {
            tracing::info!("Merging {} {} edge(s)", rows.len(), relationship);
            self.run_batches(&merge_edges_statement(relationship, source, target), rows)
                .await?;
        }
        Ok(edges.len())
    }

    async fn finish(&mut self) -> Result<(), AppError> {
        tracing::info!(
            "Online write complete: {} node(s) across {} label(s)",
            self.node_labels.len(),
            self.constrained.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::row::{Params, RowStream};
    use crate::graph::traits::CypherExecutor;
    use crate::models::Properties;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Auto(String),
        Tx(String, usize),
        Commit,
        Rollback,
    }

    #[derive(Clone, Default)]
    struct RecordingClient {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingClient {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct RecordingTx {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_on: Option<&'static str>,
    }

    fn row_count(params: &Params) -> usize {
        params
            .get("rows")
            .and_then(JsonValue::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    #[async_trait]
    impl CypherExecutor for RecordingClient {
        async fn execute_cypher(&self, _: &str, _: Params) -> Result<RowStream<'_>, AppError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn run_cypher(&self, cypher: &str, _: Params) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(Call::Auto(cypher.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl GraphClient for RecordingClient {
        type Tx<'a> = RecordingTx;

        async fn begin(&self) -> Result<Self::Tx<'_>, AppError> {
            Ok(RecordingTx {
                calls: self.calls.clone(),
                fail_on: self.fail_on,
            })
        }
    }

    #[async_trait]
    impl CypherExecutor for RecordingTx {
        async fn execute_cypher(&self, _: &str, _: Params) -> Result<RowStream<'_>, AppError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
            if self.fail_on.is_some_and(|needle| cypher.contains(needle)) {
                return Err(AppError::Query {
                    message: "constraint violation".to_string(),
                    cypher: cypher.to_string(),
                });
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Tx(cypher.to_string(), row_count(&params)));
            Ok(())
        }
    }

    #[async_trait]
    impl Transaction for RecordingTx {
        async fn commit(self) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(Call::Commit);
            Ok(())
        }

        async fn rollback(self) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(Call::Rollback);
            Ok(())
        }
    }

    fn node(id: &str, labels: &[&str]) -> NodeInstruction {
        NodeInstruction {
            id: id.to_string(),
            entity: labels[0].to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: Properties::new(),
        }
    }

    fn config(batch_size: usize, wipe: bool) -> Neo4jConfig {
        Neo4jConfig {
            batch_size,
            wipe,
            ..Neo4jConfig::default()
        }
    }

    #[tokio::test]
    async fn test_nodes_are_batched_per_label_set() {
        let client = RecordingClient::default();
        let mut writer = Neo4jWriter::new(client.clone(), &config(2, true));

        let nodes = vec![
            node("UniProtKB:P1", &["Protein", "Polypeptide"]),
            node("UniProtKB:P2", &["Protein", "Polypeptide"]),
            node("UniProtKB:P3", &["Protein", "Polypeptide"]),
        ];
        assert_eq!(writer.write_nodes(&nodes).await.unwrap(), 3);

        let merge = merge_nodes_statement(&["Protein", "Polypeptide"]);
        assert_eq!(
            client.calls(),
            vec![
                Call::Auto(WIPE_STATEMENT.to_string()),
                Call::Auto(constraint_statement("Protein")),
                Call::Tx(merge.clone(), 2),
                Call::Commit,
                Call::Tx(merge, 1),
                Call::Commit,
            ]
        );
    }

    #[tokio::test]
    async fn test_edges_use_known_endpoint_labels() {
        let client = RecordingClient::default();
        let mut writer = Neo4jWriter::new(client.clone(), &config(100, false));

        writer
            .write_nodes(&[node("NCBIGene:7157", &["Gene"]), node("UniProtKB:P04637", &["Protein"])])
            .await
            .unwrap();
        let edge = EdgeInstruction {
            id: Some("e1".to_string()),
            source: "NCBIGene:7157".to_string(),
            target: "UniProtKB:P04637".to_string(),
            entity: "Encodes".to_string(),
            relationship: "Encodes".to_string(),
            properties: Properties::new(),
        };
        writer.write_edges(&[edge]).await.unwrap();

        let expected = merge_edges_statement("Encodes", Some("Gene"), Some("Protein"));
        assert!(client.calls().contains(&Call::Tx(expected, 1)));
        // no wipe when disabled
        assert!(!client.calls().contains(&Call::Auto(WIPE_STATEMENT.to_string())));
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let client = RecordingClient {
            fail_on: Some("MERGE"),
            ..RecordingClient::default()
        };
        let mut writer = Neo4jWriter::new(client.clone(), &config(10, false));

        let err = writer
            .write_nodes(&[node("UniProtKB:P1", &["Protein"])])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Query { .. }));
        assert_eq!(client.calls().last(), Some(&Call::Rollback));
    }
}
