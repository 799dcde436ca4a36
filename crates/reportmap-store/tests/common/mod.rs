//! Shared fixtures for store integration tests

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use reportmap_core::{Document, ExecResult, Gateway, Result, Row, Value};
use reportmap_store::{db, Session, SqliteGateway, StoreConfig, YamlCodec};
use rusqlite::Connection;

/// Gateway that records every statement it forwards
#[allow(dead_code)]
pub struct CountingGateway {
    inner: SqliteGateway,
    pub queries: RefCell<Vec<String>>,
    pub executes: RefCell<Vec<(String, Vec<Value>)>>,
}

impl CountingGateway {
    #[allow(dead_code)]
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: SqliteGateway::new(conn),
            queries: RefCell::new(Vec::new()),
            executes: RefCell::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn connection(&self) -> &Connection {
        self.inner.connection()
    }

    /// Queries against the report table seen so far
    #[allow(dead_code)]
    pub fn report_queries(&self) -> usize {
        self.queries
            .borrow()
            .iter()
            .filter(|q| q.contains("FROM report"))
            .count()
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.queries.borrow_mut().clear();
        self.executes.borrow_mut().clear();
    }
}

impl Gateway for CountingGateway {
    fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.queries.borrow_mut().push(statement.to_string());
        self.inner.query(statement, params)
    }

    fn execute(&self, statement: &str, params: &[Value]) -> Result<ExecResult> {
        self.executes
            .borrow_mut()
            .push((statement.to_string(), params.to_vec()));
        self.inner.execute(statement, params)
    }
}

/// Migrated connection holding user#1 "user1", event#1 and event#2
#[allow(dead_code)]
pub fn seeded_connection(config: &StoreConfig) -> Connection {
    let conn = db::open_configured(config).expect("open store");
    seed(&conn);
    conn
}

#[allow(dead_code)]
pub fn seed(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO user (name) VALUES ('user1');
         INSERT INTO event (name, start, \"end\", report) VALUES ('daily 18.06', '1806', '1906', 'A00201');
         INSERT INTO event (name, start, \"end\", report) VALUES ('daily 19.06', '1906', '2006', 'A00201');",
    )
    .expect("seed rows");
}

/// Session over a seeded in-memory store, with statement recording
#[allow(dead_code)]
pub fn counting_session() -> (Session, Rc<CountingGateway>) {
    let gateway = Rc::new(CountingGateway::new(seeded_connection(
        &StoreConfig::default(),
    )));
    let session = Session::new(gateway.clone(), Rc::new(YamlCodec::new()));
    (session, gateway)
}

/// Config for a file-backed store inside `dir`
#[allow(dead_code)]
pub fn file_config(dir: &Path) -> StoreConfig {
    StoreConfig::default().with_db_path(dir.join("reports.db"))
}

#[allow(dead_code)]
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// The J0200119 report form
#[allow(dead_code)]
pub fn j0200119() -> Document {
    YamlCodec::new()
        .read_file(&fixture_path("J0200119.yml"))
        .expect("parse fixture")
}
