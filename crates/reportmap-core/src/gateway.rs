//! Store gateway seam
//!
//! Mappers talk SQL-ish statements with positional `?` parameters through a
//! [`Gateway`]; the store crate supplies the SQLite implementation.

use std::collections::BTreeMap;

use crate::errors::{MapError, Result};
use crate::model::{EntityKind, Value};

/// One result row, column name to scalar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Required integer column
    ///
    /// # Errors
    ///
    /// `MalformedRow` when the column is absent or not an integer.
    pub fn integer(&self, entity: EntityKind, column: &str) -> Result<i64> {
        match self.columns.get(column) {
            Some(Value::Integer(i)) => Ok(*i),
            Some(other) => Err(malformed(entity, column, format!("expected integer, got '{}'", other))),
            None => Err(malformed(entity, column, "is missing".to_string())),
        }
    }

    /// Required text column
    ///
    /// # Errors
    ///
    /// `MalformedRow` when the column is absent or not text.
    pub fn text(&self, entity: EntityKind, column: &str) -> Result<String> {
        match self.columns.get(column) {
            Some(Value::Text(s)) => Ok(s.clone()),
            Some(other) => Err(malformed(entity, column, format!("expected text, got '{}'", other))),
            None => Err(malformed(entity, column, "is missing".to_string())),
        }
    }

    /// Text column that may be NULL
    ///
    /// # Errors
    ///
    /// `MalformedRow` when the column is absent or holds an integer.
    pub fn optional_text(&self, entity: EntityKind, column: &str) -> Result<Option<String>> {
        match self.columns.get(column) {
            Some(Value::Null) => Ok(None),
            _ => self.text(entity, column).map(Some),
        }
    }
}

fn malformed(entity: EntityKind, column: &str, reason: String) -> crate::errors::ExError {
    MapError::MalformedRow {
        entity,
        column: column.to_string(),
        reason,
    }
    .into()
}

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Key generated by the last insert on this connection
    pub last_insert_id: i64,
    /// Rows changed by the statement
    pub affected: usize,
}

/// Statement execution against a backing store
pub trait Gateway {
    /// # Errors
    ///
    /// `Persistence` on statement or connection failure.
    fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// # Errors
    ///
    /// `Persistence` on statement, constraint or connection failure.
    fn execute(&self, statement: &str, params: &[Value]) -> Result<ExecResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    #[test]
    fn test_typed_accessors() {
        let row = Row::new()
            .with("id", 3)
            .with("name", "user1")
            .with("note", Value::Null);
        assert_eq!(row.integer(EntityKind::User, "id").unwrap(), 3);
        assert_eq!(row.text(EntityKind::User, "name").unwrap(), "user1");
        assert_eq!(row.optional_text(EntityKind::User, "note").unwrap(), None);
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let row = Row::new().with("id", "three");
        let err = row.integer(EntityKind::Event, "id").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MalformedRow);
        assert!(err.message().contains("'id'"));

        let err = row.text(EntityKind::Event, "name").unwrap_err();
        assert!(err.message().contains("missing"));
    }
}
