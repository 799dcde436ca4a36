//! Typed rows
//!
//! Gateway rows are validated here, once, before any factory sees them.

use reportmap_core::{EntityKind, EntityRow, ExError, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub id: i64,
    pub name: String,
    pub start: String,
    pub end: String,
    pub report: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub id: i64,
    pub code: String,
    /// Encoded document
    pub data: String,
    pub event: i64,
    pub user: i64,
}

impl TryFrom<&Row> for UserRow {
    type Error = ExError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        const KIND: EntityKind = EntityKind::User;
        Ok(Self {
            id: row.integer(KIND, "id")?,
            name: row.text(KIND, "name")?,
        })
    }
}

impl TryFrom<&Row> for EventRow {
    type Error = ExError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        const KIND: EntityKind = EntityKind::Event;
        Ok(Self {
            id: row.integer(KIND, "id")?,
            name: row.text(KIND, "name")?,
            start: row.text(KIND, "start")?,
            end: row.text(KIND, "end")?,
            report: row.text(KIND, "report")?,
        })
    }
}

impl TryFrom<&Row> for ReportRow {
    type Error = ExError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        const KIND: EntityKind = EntityKind::Report;
        Ok(Self {
            id: row.integer(KIND, "id")?,
            code: row.text(KIND, "code")?,
            data: row.text(KIND, "data")?,
            event: row.integer(KIND, "event")?,
            user: row.integer(KIND, "user")?,
        })
    }
}

impl EntityRow for UserRow {
    fn id(&self) -> i64 {
        self.id
    }
}

impl EntityRow for EventRow {
    fn id(&self) -> i64 {
        self.id
    }
}

impl EntityRow for ReportRow {
    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportmap_core::{ExErrorKind, Value};

    #[test]
    fn test_event_row_from_row() {
        let row = Row::new()
            .with("id", 1)
            .with("name", "daily 18.06")
            .with("start", "1806")
            .with("end", "1906")
            .with("report", "A00201");
        let event = EventRow::try_from(&row).unwrap();
        assert_eq!(event.end, "1906");
        assert_eq!(event.id(), 1);
    }

    #[test]
    fn test_report_row_rejects_null_reference() {
        let row = Row::new()
            .with("id", 4)
            .with("code", "J0200119")
            .with("data", "{}")
            .with("event", Value::Null)
            .with("user", 1);
        let err = ReportRow::try_from(&row).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MalformedRow);
        assert!(err.message().contains("'event'"));
    }
}
