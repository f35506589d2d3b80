//! Backend implementations of the graph client traits.
//!
//! Each backend implements [`CypherExecutor`](crate::graph::CypherExecutor),
//! [`Transaction`](crate::graph::Transaction) and
//! [`GraphClient`](crate::graph::GraphClient).

pub mod neo4j;
