//! Row and parameter types shared by executors.

use std::collections::HashMap;
use std::pin::Pin;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Parameters for Cypher statements, bound by name (`$rows`, `$id`).
pub type Params = HashMap<String, JsonValue>;

/// A stream of rows from a query result.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, AppError>> + Send + 'a>>;

/// A single result row, with column values as JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Gets a column, deserializing to the requested type.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        let value = self
            .data
            .get(key)
            .ok_or_else(|| AppError::Internal(format!("column not found: {}", key)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| AppError::Internal(format!("failed to deserialize '{}': {}", key, e)))
    }

    /// Like [`Row::get`], but a missing or null column is `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.data.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(_) => self.get(key).map(Some),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(data: HashMap<String, JsonValue>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, JsonValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>()
            .into()
    }

    #[test]
    fn test_row_get_count() {
        let row = row(&[("count", json!(42))]);
        let count: i64 = row.get("count").unwrap();
        assert_eq!(count, 42);
        assert!(row.get::<String>("count").is_err());
    }

    #[test]
    fn test_row_get_missing_key() {
        let row = Row::default();
        assert!(row.get::<String>("id").is_err());
        assert_eq!(row.get_opt::<String>("id").unwrap(), None);
    }

    #[test]
    fn test_row_get_opt_null() {
        let row = row(&[("name", JsonValue::Null), ("labels", json!(["Protein"]))]);
        assert_eq!(row.get_opt::<String>("name").unwrap(), None);
        assert_eq!(
            row.get_opt::<Vec<String>>("labels").unwrap(),
            Some(vec!["Protein".to_string()])
        );
    }
}
