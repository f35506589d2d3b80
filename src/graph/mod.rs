//! Graph database access and output sinks.
//!
//! The abstraction is built on a small trait hierarchy:
//!
//! - [`CypherExecutor`] - execute Cypher statements
//! - [`Transaction`] - commit/rollback
//! - [`GraphClient`] - connection handle that begins transactions
//! - [`GraphSink`] - destination for node and edge instructions
//!
//! ```ignore
//! use crossbar::graph::{GraphSink, Neo4jWriter};
//! use crossbar::graph::backends::neo4j::Neo4jClient;
//!
//! let client = Neo4jClient::connect(&uri, &user, &password).await?;
//! let mut sink = Neo4jWriter::new(client, &config.neo4j);
//! sink.write_nodes(&batch.nodes).await?;
//! sink.write_edges(&batch.edges).await?;
//! sink.finish().await?;
//! ```

pub mod backends;
pub mod cypher;
mod query;
mod row;
pub mod sinks;
mod traits;

pub use query::{Query, QueryExt};
pub use row::{Params, Row, RowStream};
pub use sinks::{AdminImportWriter, Neo4jWriter};
pub use traits::{CypherExecutor, GraphClient, GraphSink, Transaction};
