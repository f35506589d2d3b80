//! Sinks that materialize emitted instructions.
//!
//! | Sink | Mode |
//! |------|------|
//! | [`AdminImportWriter`] | offline, `neo4j-admin import` files |
//! | [`Neo4jWriter`] | online, batched Cypher over any [`GraphClient`](crate::graph::GraphClient) |

mod admin_import;
mod online;

pub use admin_import::{AdminImportWriter, IMPORT_CALL_FILE};
pub use online::Neo4jWriter;

use crate::error::AppError;
use crate::graph::GraphSink;
use crate::services::GraphBatch;

/// Writes all nodes, then all edges, then finishes the sink.
pub async fn write_batch(sink: &mut dyn GraphSink, batch: &GraphBatch) -> Result<(), AppError> {
    let nodes = sink.write_nodes(&batch.nodes).await?;
    let edges = sink.write_edges(&batch.edges).await?;
    sink.finish().await?;
    tracing::info!("Wrote {} node(s) and {} edge(s)", nodes, edges);
    Ok(())
}
