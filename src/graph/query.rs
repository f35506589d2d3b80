//! Query builder for parameterized Cypher statements.

use futures::{StreamExt, TryStreamExt};
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::CypherExecutor;

/// A statement plus its parameters, bound to an executor.
///
/// Works against any [`CypherExecutor`]: a client in auto-commit mode or an
/// open transaction.
///
/// # Example
///
/// ```ignore
/// executor
///     .query("UNWIND $rows AS row MERGE (n:`Protein` {id: row.id})")
///     .param("rows", rows)
///     .run()
///     .await?;
/// ```
pub struct Query<'a, E: CypherExecutor + ?Sized> {
    executor: &'a E,
    cypher: String,
    params: Params,
}

impl<'a, E: CypherExecutor + ?Sized> Query<'a, E> {
    /// Creates a statement with no parameters.
    ///
    /// # Arguments
    ///
    /// * `executor` - client or transaction that runs the statement
    /// * `cypher` - statement text, referencing parameters as `$name`
    pub fn new(executor: &'a E, cypher: &str) -> Self {
        Self {
            executor,
            cypher: cypher.to_string(),
            params: Params::new(),
        }
    }

    /// Binds `$name` to a value. Binding the same name twice keeps the last value.
    ///
    /// # Arguments
    ///
    /// * `name` - parameter name without the `$`
    /// * `value` - anything convertible to JSON, such as a row batch array
    pub fn param(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Executes the statement and streams the result rows.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Query`] or [`AppError::Neo4j`] when the backend
    /// rejects the statement.
    pub async fn execute(self) -> Result<RowStream<'a>, AppError> {
        self.executor
            .execute_cypher(&self.cypher, self.params)
            .await
    }

    /// Collects every result row.
    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        self.execute().await?.try_collect().await
    }

    /// First result row, or `None` for an empty result.
    pub async fn fetch_one(self) -> Result<Option<Row>, AppError> {
        let mut stream = self.execute().await?;
        stream.next().await.transpose()
    }

    /// Executes the statement, discarding results.
    ///
    /// # Errors
    ///
    /// Same as [`Query::execute`].
    pub async fn run(self) -> Result<(), AppError> {
        self.executor.run_cypher(&self.cypher, self.params).await
    }
}

/// Adds `executor.query("...")` to every [`CypherExecutor`].
pub trait QueryExt: CypherExecutor {
    fn query(&self, cypher: &str) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self, cypher)
    }
}

impl<E: CypherExecutor> QueryExt for E {}
