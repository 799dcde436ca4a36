//! Session Demonstration
//!
//! Walks one in-memory session through the mapping patterns.
#![allow(clippy::unwrap_used, clippy::expect_used)]
//!
//! Key concepts illustrated:
//! 1. Identity map (one instance per row per session)
//! 2. Unit of work (queued writes applied in order)
//! 3. Deferred collections resolved in one batch

use std::cell::RefCell;
use std::rc::Rc;

use reportmap_core::{DocumentCodec, DomainObject, Event, Mapper, Report, User};
use reportmap_store::{Session, YamlCodec};

const FORM: &str = "
1:
  1.1A: 10
  1.1B: tonnes
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== ReportMap Session Demo ===\n");
    let session = Session::in_memory()?;

    // ===== Part 1: Unit of Work =====
    println!("## Part 1: Queued writes\n");

    let user = Rc::new(RefCell::new(User::transient("user1")));
    let events: Vec<_> = ["daily 18.06", "daily 19.06"]
        .iter()
        .map(|name| Rc::new(RefCell::new(Event::transient(*name, "1806", "1906", "A00201"))))
        .collect();

    session.user_mapper().queue_insert(&user);
    for event in &events {
        session.event_mapper().queue_insert(event);
    }
    println!("Queued: {:?}", session.watcher().pending_labels());

    let summary = session.perform_operations()?;
    println!("✓ Applied {:?}\n", summary.applied);

    // ===== Part 2: Identity Map =====
    println!("## Part 2: Identity map\n");

    let found = session.user_mapper().find(user.borrow().id())?;
    println!("find(user#{}) is the inserted instance: {}\n", found.borrow().id(), Rc::ptr_eq(&found, &user));

    // ===== Part 3: Deferred collections =====
    println!("## Part 3: Batched collection loads\n");

    let codec = YamlCodec::new();
    for event in &events {
        let mut data = codec.parse(FORM)?;
        data.set("1.1A", event.borrow().id() * 10)?;
        let report = Report::transient("J0200119", data, event.clone(), user.clone());
        session.report_mapper().insert(&Rc::new(RefCell::new(report)))?;
    }

    for event in &events {
        if let Some(reports) = event.borrow().reports() {
            reports.notify_access()?;
        }
    }
    let summary = session.perform_operations()?;
    println!("✓ {} collections loaded in {} batch(es)", summary.applied.len(), summary.load_batches);

    for event in &events {
        let event = event.borrow();
        if let Some(reports) = event.reports() {
            println!("  {} -> {} report(s)", event.name(), reports.len()?);
        }
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
