//! Core traits for graph database access and output sinks.
//!
//! - [`CypherExecutor`] - runs Cypher statements
//! - [`Transaction`] - commit/rollback of a unit of work
//! - [`GraphClient`] - connection handle that can begin transactions
//! - [`GraphSink`] - destination for emitted node and edge instructions

use async_trait::async_trait;

use crate::error::AppError;
use crate::graph::row::{Params, RowStream};
use crate::models::{EdgeInstruction, NodeInstruction};

/// Executes Cypher statements against a graph database.
#[async_trait]
pub trait CypherExecutor: Send + Sync {
    /// Executes a statement and returns a stream of result rows.
    async fn execute_cypher(&self, cypher: &str, params: Params)
        -> Result<RowStream<'_>, AppError>;

    /// Executes a statement without returning results.
    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError>;
}

/// Transaction lifecycle management.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commits the transaction. Consumes it.
    async fn commit(self) -> Result<(), AppError>;

    /// Rolls back the transaction. Consumes it.
    async fn rollback(self) -> Result<(), AppError>;
}

/// A graph database client that can begin transactions.
///
/// The executor methods run in auto-commit mode; [`begin`](GraphClient::begin)
/// opens an explicit transaction.
#[async_trait]
pub trait GraphClient: CypherExecutor {
    type Tx<'a>: Transaction + CypherExecutor
    where
        Self: 'a;

    async fn begin(&self) -> Result<Self::Tx<'_>, AppError>;
}

/// Destination for emitted instructions.
///
/// Nodes are written before edges. `finish` flushes whatever the sink
/// buffers and must be called once at the end.
#[async_trait]
pub trait GraphSink: Send {
    /// Writes node instructions, returning how many were written.
    async fn write_nodes(&mut self, nodes: &[NodeInstruction]) -> Result<usize, AppError>;

    /// Writes edge instructions, returning how many were written.
    async fn write_edges(&mut self, edges: &[EdgeInstruction]) -> Result<usize, AppError>;

    async fn finish(&mut self) -> Result<(), AppError>;
}
