//! Integration tests for the Neo4j backend and online writer.
//!
//! These tests require a running Neo4j instance.
//! Run with: `cargo test --features integration --test neo4j_integration`

#![cfg(feature = "integration")]

use crossbar::config::Neo4jConfig;
use crossbar::graph::backends::neo4j::Neo4jClient;
use crossbar::graph::{CypherExecutor, GraphClient, GraphSink, Neo4jWriter, Params, QueryExt, Transaction};
use crossbar::models::{EdgeInstruction, NodeInstruction, Properties};
use serial_test::serial;

const TEST_URI: &str = "bolt://localhost:7687";
const TEST_USER: &str = "neo4j";
const TEST_PASSWORD: &str = "password";

async fn create_client() -> Neo4jClient {
    Neo4jClient::connect(TEST_URI, TEST_USER, TEST_PASSWORD)
        .await
        .expect("Failed to connect to test database")
}

/// Clean up test data before/after tests
async fn cleanup(client: &Neo4jClient) {
    let _ = client
        .run_cypher("MATCH (n:IntegrationTest) DETACH DELETE n", Params::new())
        .await;
}

fn node(id: &str, leaf: &str) -> NodeInstruction {
    let mut properties = Properties::new();
    properties.insert("source".to_string(), serde_json::json!("integration"));
    NodeInstruction {
        id: id.to_string(),
        entity: leaf.to_string(),
        labels: vec![leaf.to_string(), "IntegrationTest".to_string()],
        properties,
    }
}

// All tests run serially; they share one database
#[serial]
mod database_tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_cypher_empty_result() {
        let client = create_client().await;
        cleanup(&client).await;

        let rows = client
            .query("MATCH (n:IntegrationTest) RETURN n.id AS id")
            .fetch_all()
            .await
            .expect("Query failed");

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_writes() {
        let client = create_client().await;
        cleanup(&client).await;

        let txn = client.begin().await.expect("Failed to begin");
        txn.run_cypher("CREATE (:IntegrationTest {id: 'rolled-back'})", Params::new())
            .await
            .expect("Create failed");
        txn.rollback().await.expect("Rollback failed");

        let row = client
            .query("MATCH (n:IntegrationTest) RETURN count(n) AS count")
            .fetch_one()
            .await
            .expect("Count failed")
            .expect("No row");
        assert_eq!(row.get::<i64>("count").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writer_merges_nodes_and_edges() {
        let client = create_client().await;
        cleanup(&client).await;

        let config = Neo4jConfig {
            batch_size: 1,
            ..Neo4jConfig::default()
        };
        let mut writer = Neo4jWriter::new(client.clone(), &config);
        let nodes = [
            node("NCBIGene:7157", "Gene"),
            node("UniProtKB:P04637", "Protein"),
        ];
        writer.write_nodes(&nodes).await.expect("Node write failed");
        // merging again must not duplicate
        writer.write_nodes(&nodes).await.expect("Node rewrite failed");
        writer
            .write_edges(&[EdgeInstruction {
                id: None,
                source: "NCBIGene:7157".to_string(),
                target: "UniProtKB:P04637".to_string(),
                entity: "Encodes".to_string(),
                relationship: "Encodes".to_string(),
                properties: Properties::new(),
            }])
            .await
            .expect("Edge write failed");
        writer.finish().await.expect("Finish failed");

        let row = client
            .query(
                "MATCH (g:IntegrationTest {id: $gene})-[:Encodes]->(p:IntegrationTest) \
                 RETURN count(p) AS count",
            )
            .param("gene", "NCBIGene:7157")
            .fetch_one()
            .await
            .expect("Query failed")
            .expect("No row");
        assert_eq!(row.get::<i64>("count").unwrap(), 1);

        let row = client
            .query("MATCH (n:IntegrationTest) RETURN count(n) AS count")
            .fetch_one()
            .await
            .expect("Count failed")
            .expect("No row");
        assert_eq!(row.get::<i64>("count").unwrap(), 2);

        cleanup(&client).await;
    }
}
