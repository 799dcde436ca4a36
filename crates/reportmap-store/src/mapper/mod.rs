//! Concrete data mappers over a [`Gateway`]
//!
//! Each mapper is a cheap clone of the shared [`MapperContext`]; mappers for
//! one session always share its watcher.

mod event;
mod report;
mod user;

use std::rc::Rc;

use reportmap_core::{DocumentCodec, Gateway, ObjectWatcher, Row, Value};

use crate::errors::Result;

pub use event::EventMapper;
pub use report::{ReportMapper, ReportsByEvent, ReportsByUser};
pub use user::UserMapper;

/// What every mapper and factory of a session shares
#[derive(Clone)]
pub struct MapperContext {
    pub gateway: Rc<dyn Gateway>,
    pub codec: Rc<dyn DocumentCodec>,
    pub watcher: ObjectWatcher,
}

impl MapperContext {
    pub fn new(gateway: Rc<dyn Gateway>, codec: Rc<dyn DocumentCodec>, watcher: ObjectWatcher) -> Self {
        Self {
            gateway,
            codec,
            watcher,
        }
    }

    /// First row of a keyed select, if any
    fn query_one(&self, statement: &str, id: i64) -> Result<Option<Row>> {
        Ok(self
            .gateway
            .query(statement, &[Value::Integer(id)])?
            .into_iter()
            .next())
    }
}

/// `UPDATE <table> SET "c1" = ?, ... WHERE id = ?`
fn update_statement(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns.iter().map(|c| format!("\"{}\" = ?", c)).collect();
    format!("UPDATE {} SET {} WHERE id = ?", table, assignments.join(", "))
}

/// `?, ?, ?` for `n` parameters
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_statement_quotes_columns() {
        assert_eq!(
            update_statement("event", &["name", "end"]),
            "UPDATE event SET \"name\" = ?, \"end\" = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }
}
