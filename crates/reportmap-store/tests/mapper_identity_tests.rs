// Identity map behaviour of the SQLite-backed mappers

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::counting_session;
use reportmap_core::{CollectionState, DomainObject, Event, ExErrorKind, Mapper, User};

#[test]
fn test_find_twice_returns_same_instance() {
    let (session, gateway) = counting_session();
    let users = session.user_mapper();

    let first = users.find(1).unwrap();
    let second = users.find(1).unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(first.borrow().name(), "user1");
    let user_queries = gateway
        .queries
        .borrow()
        .iter()
        .filter(|q| q.contains("FROM user"))
        .count();
    assert_eq!(user_queries, 1, "second find is served from the map");
}

#[test]
fn test_mappers_share_the_session_map() {
    let (session, _gateway) = counting_session();

    let a = session.event_mapper().find(1).unwrap();
    let b = session.event_mapper().find(1).unwrap();

    assert!(Rc::ptr_eq(&a, &b));
}

#[test]
fn test_insert_then_find_returns_inserted_instance() {
    let (session, _gateway) = counting_session();
    let users = session.user_mapper();
    let user = Rc::new(RefCell::new(User::transient("user2")));

    let id = users.insert(&user).unwrap();

    assert_eq!(id, 2);
    assert_eq!(user.borrow().id(), 2);
    assert!(Rc::ptr_eq(&users.find(id).unwrap(), &user));
}

#[test]
fn test_inserted_event_gets_reports_collection() {
    let (session, _gateway) = counting_session();
    let event = Rc::new(RefCell::new(Event::transient(
        "weekly", "1806", "2506", "A00202",
    )));

    session.event_mapper().insert(&event).unwrap();

    let reports = event.borrow().reports().expect("collection attached");
    assert_eq!(reports.state(), CollectionState::Unloaded);
    assert!(reports.is_empty().unwrap());
}

#[test]
fn test_insert_persisted_object_is_rejected() {
    let (session, _gateway) = counting_session();
    let users = session.user_mapper();
    let user = users.find(1).unwrap();

    let err = users.insert(&user).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_find_missing_row_is_not_found() {
    let (session, _gateway) = counting_session();

    let err = session.user_mapper().find(99).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_reset_forces_fresh_construction() {
    let (session, gateway) = counting_session();
    let users = session.user_mapper();
    let before = users.find(1).unwrap();

    session.reset();
    let after = users.find(1).unwrap();

    assert!(!Rc::ptr_eq(&before, &after));
    assert_eq!(before.borrow().name(), after.borrow().name());
    let user_queries = gateway
        .queries
        .borrow()
        .iter()
        .filter(|q| q.contains("FROM user"))
        .count();
    assert_eq!(user_queries, 2);
}

#[test]
fn test_find_all_uses_map_for_known_rows() {
    let (session, _gateway) = counting_session();
    let events = session.event_mapper();
    let first = events.find(1).unwrap();

    let all = events.find_all().unwrap();

    assert_eq!(all.len(), 2);
    assert!(Rc::ptr_eq(&all[0], &first));
    assert_eq!(all[1].borrow().name(), "daily 19.06");
}

#[test]
fn test_delete_forgets_instance() {
    let (session, _gateway) = counting_session();
    let events = session.event_mapper();
    let event = events.find(2).unwrap();

    events.delete(&event).unwrap();

    assert!(!session.watcher().contains(Event::KIND, 2));
    assert_eq!(events.find(2).unwrap_err().kind(), ExErrorKind::NotFound);
}
