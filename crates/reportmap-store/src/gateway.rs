//! SQLite gateway
//!
//! Statements use positional `?` parameters. Rows come back keyed by column
//! name; REAL and BLOB columns are surfaced as text since the mapped schemas
//! only hold integers and text. Bytes that are not UTF-8 fail the query.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};

use reportmap_core::{ExecResult, Gateway, MapError, Row, Value};

use crate::errors::{from_rusqlite, Result};

pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Direct access for setup and assertions
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(column: &str, value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Text(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::Text(text.to_string()),
            Err(e) => {
                return Err(MapError::Serialization {
                    message: format!("column '{}' is not valid UTF-8: {}", column, e),
                }
                .into())
            }
        },
    })
}

impl Gateway for SqliteGateway {
    fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::debug!(statement, params = params.len(), "sqlite query");
        let mut stmt = self.conn.prepare(statement).map_err(from_rusqlite)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(to_sql)))
            .map_err(from_rusqlite)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(from_rusqlite)? {
            let mut mapped = Row::new();
            for (idx, name) in names.iter().enumerate() {
                let value = from_sql(name, row.get_ref(idx).map_err(from_rusqlite)?)?;
                mapped.insert(name.as_str(), value);
            }
            out.push(mapped);
        }
        Ok(out)
    }

    fn execute(&self, statement: &str, params: &[Value]) -> Result<ExecResult> {
        tracing::debug!(statement, params = params.len(), "sqlite execute");
        let affected = self
            .conn
            .execute(statement, params_from_iter(params.iter().map(to_sql)))
            .map_err(from_rusqlite)?;
        Ok(ExecResult {
            last_insert_id: self.conn.last_insert_rowid(),
            affected,
        })
    }
}
