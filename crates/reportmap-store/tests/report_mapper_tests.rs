// ReportMapper against a seeded SQLite store

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{counting_session, j0200119, CountingGateway};
use reportmap_core::{
    CollectionState, DocumentCodec, DomainObject, Event, ExErrorKind, Mapper, Report, ReportRef,
    User, Value,
};
use reportmap_store::{Session, YamlCodec};

fn new_report(session: &Session) -> ReportRef {
    let event = session.event_mapper().find(1).unwrap();
    let user = session.user_mapper().find(1).unwrap();
    Rc::new(RefCell::new(Report::transient("J0200119", j0200119(), event, user)))
}

fn stored_data(gateway: &CountingGateway, id: i64) -> reportmap_core::Document {
    let blob: String = gateway
        .connection()
        .query_row("SELECT data FROM report WHERE id = ?", [id], |row| row.get(0))
        .unwrap();
    YamlCodec::new().deserialize(&blob).unwrap()
}

fn field(doc: &reportmap_core::Document, key: &str) -> Value {
    let node = doc.find(key).expect("field present");
    doc.value(node).unwrap().cloned().expect("leaf")
}

#[test]
fn test_insert_writes_report_row() {
    let (session, gateway) = counting_session();
    let report = new_report(&session);

    let id = session.report_mapper().insert(&report).unwrap();

    let (code, event, user): (String, i64, i64) = gateway
        .connection()
        .query_row(
            "SELECT code, event, user FROM report WHERE id = ?",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!((code.as_str(), event, user), ("J0200119", 1, 1));
    assert_eq!(stored_data(&gateway, id).to_tree(), j0200119().to_tree());
}

#[test]
fn test_find_decodes_stored_document() {
    let (session, _gateway) = counting_session();
    let expected = new_report(&session);
    expected
        .borrow_mut()
        .data_mut()
        .set("1.1A", 50)
        .unwrap();
    let id = session.report_mapper().insert(&expected).unwrap();

    session.reset();
    let found = session.report_mapper().find(id).unwrap();

    assert!(!Rc::ptr_eq(&found, &expected));
    assert_eq!(
        found.borrow().data().to_tree(),
        expected.borrow().data().to_tree()
    );
    assert_eq!(field(found.borrow().data(), "1.1A"), Value::Integer(50));
}

#[test]
fn test_update_writes_only_changed_data() {
    let (session, gateway) = counting_session();
    let mapper = session.report_mapper();
    let report = new_report(&session);
    let id = mapper.insert(&report).unwrap();

    report.borrow_mut().data_mut().set("1.1A", 50).unwrap();
    gateway.clear();
    let written = mapper.update(&report).unwrap();

    assert_eq!(written, vec!["data"]);
    let executes = gateway.executes.borrow();
    assert_eq!(executes.len(), 1);
    assert_eq!(executes[0].0, "UPDATE report SET \"data\" = ? WHERE id = ?");
    drop(executes);
    assert_eq!(field(&stored_data(&gateway, id), "1.1A"), Value::Integer(50));
}

#[test]
fn test_update_clean_report_writes_nothing() {
    let (session, gateway) = counting_session();
    let mapper = session.report_mapper();
    let report = new_report(&session);
    mapper.insert(&report).unwrap();
    gateway.clear();

    assert!(mapper.update(&report).unwrap().is_empty());
    assert!(gateway.executes.borrow().is_empty());
}

#[test]
fn test_found_report_has_collections_on_event_and_user() {
    let (session, _gateway) = counting_session();
    let id = session.report_mapper().insert(&new_report(&session)).unwrap();
    session.reset();

    let report = session.report_mapper().find(id).unwrap();
    let event = report.borrow().event();
    let user = report.borrow().user();

    let event_reports = event.borrow().reports().expect("event.reports");
    let user_reports = user.borrow().reports().expect("user.reports");
    assert_eq!(event_reports.state(), CollectionState::Unloaded);
    assert_eq!(user_reports.state(), CollectionState::Unloaded);
}

#[test]
fn test_deferred_collection_shared_by_same_event() {
    let (session, _gateway) = counting_session();
    let foo = session.event_mapper().find(1).unwrap();
    let bar = session.event_mapper().find(1).unwrap();
    session.report_mapper().queue_insert(&new_report(&session));
    session.perform_operations().unwrap();

    let reports1 = foo.borrow().reports().unwrap();
    let reports2 = bar.borrow().reports().unwrap();
    reports1.notify_access().unwrap();
    reports2.notify_access().unwrap();

    assert_eq!(session.watcher().pending_labels(), vec!["load:event.reports#1"]);
    assert_eq!(reports1.len().unwrap(), 1);
    assert_eq!(reports1.len().unwrap(), reports2.len().unwrap());
}

#[test]
fn test_inserted_report_reachable_from_event_and_user() {
    let (session, _gateway) = counting_session();
    let report = new_report(&session);
    let id = session.report_mapper().insert(&report).unwrap();

    let found = session.report_mapper().find(id).unwrap();
    assert!(Rc::ptr_eq(&found, &report));

    let event_reports = found.borrow().event().borrow().reports().unwrap();
    let user_reports = found.borrow().user().borrow().reports().unwrap();
    assert!(event_reports.contains(&report).unwrap());
    assert!(user_reports.contains(&report).unwrap());
}

#[test]
fn test_insert_appends_to_loaded_collection() {
    let (session, gateway) = counting_session();
    let event = session.event_mapper().find(1).unwrap();
    let reports = event.borrow().reports().unwrap();
    assert!(reports.is_empty().unwrap());
    let loads = gateway.report_queries();

    let report = new_report(&session);
    session.report_mapper().insert(&report).unwrap();

    assert_eq!(reports.loaded_items().map(|items| items.len()), Some(1));
    assert_eq!(gateway.report_queries(), loads, "no reload after insert");
}

#[test]
fn test_delete_removes_from_loaded_collections() {
    let (session, _gateway) = counting_session();
    let report = new_report(&session);
    session.report_mapper().insert(&report).unwrap();
    let event = session.event_mapper().find(1).unwrap();
    let user = session.user_mapper().find(1).unwrap();
    let event_reports = event.borrow().reports().unwrap();
    let user_reports = user.borrow().reports().unwrap();
    assert!(event_reports.contains(&report).unwrap());
    assert!(user_reports.contains(&report).unwrap());

    session.report_mapper().delete(&report).unwrap();

    assert_eq!(event_reports.state(), CollectionState::Loaded);
    assert_eq!(event_reports.loaded_items().map(|items| items.len()), Some(0));
    assert!(!event_reports.contains(&report).unwrap());
    assert!(!user_reports.contains(&report).unwrap());
}

#[test]
fn test_moving_report_updates_loaded_collections() {
    let (session, gateway) = counting_session();
    let report = new_report(&session);
    session.report_mapper().insert(&report).unwrap();
    let first = session.event_mapper().find(1).unwrap();
    let second = session.event_mapper().find(2).unwrap();
    let first_reports = first.borrow().reports().unwrap();
    let second_reports = second.borrow().reports().unwrap();
    assert!(first_reports.contains(&report).unwrap());
    assert!(second_reports.is_empty().unwrap());
    let loads = gateway.report_queries();

    report.borrow_mut().set_event(second.clone());
    assert_eq!(session.report_mapper().update(&report).unwrap(), vec!["event"]);

    assert!(!first_reports.contains(&report).unwrap());
    assert!(second_reports.contains(&report).unwrap());
    assert_eq!(gateway.report_queries(), loads, "no reload after move");
    let stored: i64 = gateway
        .connection()
        .query_row("SELECT event FROM report WHERE id = ?", [report.borrow().id()], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 2);
}

#[test]
fn test_insert_with_unsaved_event_is_rejected() {
    let (session, gateway) = counting_session();
    let event = Rc::new(RefCell::new(Event::transient("draft", "0107", "0207", "A00201")));
    let user = session.user_mapper().find(1).unwrap();
    let report = Rc::new(RefCell::new(Report::transient("J0200119", j0200119(), event, user)));

    let err = session.report_mapper().insert(&report).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert!(report.borrow().is_transient());
    assert!(gateway.executes.borrow().is_empty());
}

#[test]
fn test_insert_with_unknown_user_is_persistence_error() {
    let (session, _gateway) = counting_session();
    let event = session.event_mapper().find(1).unwrap();
    let ghost = Rc::new(RefCell::new(User::new(7, "user7")));
    let report = Rc::new(RefCell::new(Report::transient("J0200119", j0200119(), event, ghost)));

    let err = session.report_mapper().insert(&report).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Persistence);
    assert!(report.borrow().is_transient());
}

#[test]
fn test_find_by_events_groups_in_one_query() {
    let (session, gateway) = counting_session();
    let mapper = session.report_mapper();
    let user = session.user_mapper().find(1).unwrap();
    for event_id in [1, 2, 2] {
        let event = session.event_mapper().find(event_id).unwrap();
        let report = Rc::new(RefCell::new(Report::transient(
            "J0200119",
            j0200119(),
            event,
            user.clone(),
        )));
        mapper.insert(&report).unwrap();
    }
    gateway.clear();

    let grouped = mapper.find_by_events(&[1, 2, 3]).unwrap();

    assert_eq!(gateway.report_queries(), 1);
    assert_eq!(grouped.get(&1).map(Vec::len), Some(1));
    assert_eq!(grouped.get(&2).map(Vec::len), Some(2));
    assert!(grouped.get(&3).is_none());
}
