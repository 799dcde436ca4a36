use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use reportmap_core::deferred::LoadedByOwner;
use reportmap_core::{
    CollectionLoader, DeferredCollection, Document, DomainObject, ObjectWatcher, Relation, Report,
    ReportRef, Result, User, UserRef, Event, EventRef, Value,
};

/// In-memory report table: (id, code, event id, user id)
#[derive(Default)]
pub struct ReportTable {
    pub rows: RefCell<Vec<(i64, String, i64, i64)>>,
    pub fetches: Cell<usize>,
}

impl ReportTable {
    #[allow(dead_code)]
    pub fn add(&self, id: i64, code: &str, event: i64, user: i64) {
        self.rows
            .borrow_mut()
            .push((id, code.to_string(), event, user));
    }
}

/// Loader serving `user.reports` from a [`ReportTable`]
///
/// Events and users must already be mapped in the watcher.
pub struct ReportsByUser(pub Rc<ReportTable>);

impl CollectionLoader<Report> for ReportsByUser {
    fn load_many(&self, watcher: &ObjectWatcher, owner_ids: &[i64]) -> Result<LoadedByOwner<Report>> {
        self.0.fetches.set(self.0.fetches.get() + 1);
        let mut out: LoadedByOwner<Report> = HashMap::new();
        for (id, code, event_id, user_id) in self.0.rows.borrow().iter() {
            if !owner_ids.contains(user_id) {
                continue;
            }
            let report = match watcher.get_from_map::<Report>(*id) {
                Some(existing) => existing,
                None => {
                    let event = watcher.get_from_map::<Event>(*event_id).expect("event mapped");
                    let user = watcher.get_from_map::<User>(*user_id).expect("user mapped");
                    let report = Rc::new(RefCell::new(Report::new(
                        *id,
                        code.clone(),
                        sample_document(),
                        event,
                        user,
                    )));
                    watcher.add_to_map(&report)?;
                    report
                }
            };
            out.entry(*user_id).or_default().push(report);
        }
        Ok(out)
    }
}

/// Mapped user with a `user.reports` collection attached
#[allow(dead_code)]
pub fn mapped_user(watcher: &ObjectWatcher, table: &Rc<ReportTable>, id: i64) -> UserRef {
    let user = Rc::new(RefCell::new(User::new(id, format!("user{}", id))));
    let reports = DeferredCollection::<Report>::new(
        watcher,
        Relation::UserReports,
        id,
        Rc::new(ReportsByUser(table.clone())),
    );
    user.borrow_mut().set_reports(reports);
    watcher.add_to_map(&user).expect("map user");
    user
}

#[allow(dead_code)]
pub fn mapped_event(watcher: &ObjectWatcher, id: i64) -> EventRef {
    let event = Rc::new(RefCell::new(Event::new(id, "daily", "1806", "1906", "A00201")));
    watcher.add_to_map(&event).expect("map event");
    event
}

/// Small two-level document
#[allow(dead_code)]
pub fn sample_document() -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    let section = doc.add_composite(root, "1").expect("composite");
    doc.add_field(section, "1.1A", Value::Integer(10)).expect("field");
    doc.add_field(section, "1.1B", Value::from("ok")).expect("field");
    doc
}

#[allow(dead_code)]
pub fn report_ids(reports: &[ReportRef]) -> Vec<i64> {
    reports.iter().map(|r| r.borrow().id()).collect()
}
