use std::rc::Rc;

use super::entity::{DomainObject, EntityKind, UNSAVED_ID};
use super::value::Value;
use super::ReportCollection;

/// A reporting period, e.g. "daily 18.06" running from `start` to `end`
///
/// `report` names the report template filed against the event.
#[derive(Debug)]
pub struct Event {
    id: i64,
    name: String,
    start: String,
    end: String,
    report: String,
    reports: Option<Rc<ReportCollection>>,
}

impl Event {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        report: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            start: start.into(),
            end: end.into(),
            report: report.into(),
            reports: None,
        }
    }

    pub fn transient(
        name: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        report: impl Into<String>,
    ) -> Self {
        Self::new(UNSAVED_ID, name, start, end, report)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Report template id
    pub fn report_template(&self) -> &str {
        &self.report
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_period(&mut self, start: impl Into<String>, end: impl Into<String>) {
        self.start = start.into();
        self.end = end.into();
    }

    pub fn set_report_template(&mut self, report: impl Into<String>) {
        self.report = report.into();
    }

    pub fn reports(&self) -> Option<Rc<ReportCollection>> {
        self.reports.clone()
    }

    pub fn set_reports(&mut self, reports: Rc<ReportCollection>) {
        self.reports = Some(reports);
    }
}

impl DomainObject for Event {
    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => Value::Integer(self.id),
            "name" => Value::from(self.name.as_str()),
            "start" => Value::from(self.start.as_str()),
            "end" => Value::from(self.end.as_str()),
            "report" => Value::from(self.report.as_str()),
            _ => Value::Null,
        }
    }
}
