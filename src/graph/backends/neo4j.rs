//! Neo4j backend over the Bolt protocol.
//!
//! ```ignore
//! use crossbar::graph::backends::neo4j::Neo4jClient;
//! use crossbar::graph::QueryExt;
//!
//! let client = Neo4jClient::connect("bolt://localhost:7687", "neo4j", "secret").await?;
//! client.query("MATCH (n) RETURN count(n) AS count").fetch_one().await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use neo4rs::{BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::{CypherExecutor, GraphClient, Transaction};

/// Neo4j graph client.
///
/// Cheap to clone; `neo4rs::Graph` pools its connections internally.
#[derive(Clone)]
pub struct Neo4jClient {
    graph: neo4rs::Graph,
}

impl Neo4jClient {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to Neo4j at {}", uri);
        let graph = neo4rs::Graph::new(uri, user, password).await?;
        Ok(Self { graph })
    }

    pub fn from_graph(graph: neo4rs::Graph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl CypherExecutor for Neo4jClient {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let stream = self
            .graph
            .execute(build_query(cypher, params))
            .await
            .map_err(|e| query_error(e, cypher))?;

        let rows = futures::stream::try_unfold(stream, |mut stream| async move {
            match stream.next().await? {
                Some(row) => Ok::<_, AppError>(Some((convert_row(&row)?, stream))),
                None => Ok(None),
            }
        });
        Ok(Box::pin(rows))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.graph
            .run(build_query(cypher, params))
            .await
            .map_err(|e| query_error(e, cypher))
    }
}

#[async_trait]
impl GraphClient for Neo4jClient {
    type Tx<'a> = Neo4jTransaction;

    async fn begin(&self) -> Result<Self::Tx<'_>, AppError> {
        let txn = self.graph.start_txn().await?;
        Ok(Neo4jTransaction {
            txn: Mutex::new(txn),
        })
    }
}

/// An explicit Neo4j transaction.
///
/// Dropping it without `commit` leaves the server to roll it back.
pub struct Neo4jTransaction {
    txn: Mutex<neo4rs::Txn>,
}

#[async_trait]
impl CypherExecutor for Neo4jTransaction {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let mut txn = self.txn.lock().await;
        let mut stream = txn
            .execute(build_query(cypher, params))
            .await
            .map_err(|e| query_error(e, cypher))?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next(txn.handle()).await? {
            rows.push(convert_row(&row));
        }
        Ok(Box::pin(futures::stream::iter(rows)))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.txn
            .lock()
            .await
            .run(build_query(cypher, params))
            .await
            .map_err(|e| query_error(e, cypher))
    }
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    async fn commit(self) -> Result<(), AppError> {
        self.txn.into_inner().commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        self.txn.into_inner().rollback().await?;
        Ok(())
    }
}

fn build_query(cypher: &str, params: Params) -> neo4rs::Query {
    params
        .into_iter()
        .fold(neo4rs::query(cypher), |query, (key, value)| {
            query.param(&key, to_bolt(value))
        })
}

fn query_error(err: neo4rs::Error, cypher: &str) -> AppError {
    AppError::Query {
        message: err.to_string(),
        cypher: cypher.to_string(),
    }
}

fn convert_row(row: &neo4rs::Row) -> Result<Row, AppError> {
    let data: HashMap<String, JsonValue> = row
        .to()
        .map_err(|e| AppError::Internal(format!("failed to read result row: {}", e)))?;
    Ok(Row::new(data))
}

/// Converts a JSON parameter into its Bolt representation.
pub fn to_bolt(value: JsonValue) -> BoltType {
    match value {
        JsonValue::Null => BoltType::Null(BoltNull),
        JsonValue::Bool(b) => BoltType::Boolean(BoltBoolean::new(b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or_default())),
        },
        JsonValue::String(s) => BoltType::String(BoltString::new(&s)),
        JsonValue::Array(items) => BoltType::List(BoltList {
            value: items.into_iter().map(to_bolt).collect(),
        }),
        JsonValue::Object(map) => BoltType::Map(BoltMap {
            value: map
                .into_iter()
                .map(|(k, v)| (BoltString::new(&k), to_bolt(v)))
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_bolt_scalars() {
        assert_eq!(to_bolt(json!(7)), BoltType::Integer(BoltInteger::new(7)));
        assert_eq!(to_bolt(json!(0.5)), BoltType::Float(BoltFloat::new(0.5)));
        assert_eq!(to_bolt(json!("x")), BoltType::String(BoltString::new("x")));
        assert_eq!(to_bolt(JsonValue::Null), BoltType::Null(BoltNull));
    }

    #[test]
    fn test_to_bolt_row_batch() {
        let bolt = to_bolt(json!([{"id": "UniProtKB:P04637", "properties": {"length": 393}}]));
        let BoltType::List(list) = bolt else {
            panic!("expected a list");
        };
        let BoltType::Map(row) = &list.value[0] else {
            panic!("expected a map");
        };
        assert_eq!(
            row.value.get(&BoltString::new("id")),
            Some(&BoltType::String(BoltString::new("UniProtKB:P04637")))
        );
    }
}
