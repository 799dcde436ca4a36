use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use reportmap_core::deferred::LoadedByOwner;
use reportmap_core::{
    CollectionLoader, DocumentCodec, DomainObject, DomainObjectFactory, EntityKind, Event, Gateway,
    IdentityObject, MapError, Mapper, ObjectWatcher, Report, ReportCollection, User, Value,
};

use super::{placeholders, update_statement, MapperContext};
use crate::errors::Result;
use crate::factory::ReportObjectFactory;
use crate::rows::ReportRow;

const SELECT: &str = "SELECT id, code, data, event, user FROM report";

#[derive(Clone)]
pub struct ReportMapper {
    ctx: MapperContext,
}

impl ReportMapper {
    pub fn new(ctx: MapperContext) -> Self {
        Self { ctx }
    }

    fn factory(&self) -> ReportObjectFactory {
        ReportObjectFactory::new(self.ctx.clone())
    }

    /// Reports of each given event, in one query
    ///
    /// # Errors
    ///
    /// Store, row-validation and decoding failures.
    pub fn find_by_events(&self, event_ids: &[i64]) -> Result<LoadedByOwner<Report>> {
        self.find_by("event", |row| row.event, event_ids)
    }

    /// Reports of each given user, in one query
    ///
    /// # Errors
    ///
    /// Store, row-validation and decoding failures.
    pub fn find_by_users(&self, user_ids: &[i64]) -> Result<LoadedByOwner<Report>> {
        self.find_by("user", |row| row.user, user_ids)
    }

    fn find_by(
        &self,
        column: &str,
        owner: fn(&ReportRow) -> i64,
        owner_ids: &[i64],
    ) -> Result<LoadedByOwner<Report>> {
        let mut out: LoadedByOwner<Report> = HashMap::new();
        if owner_ids.is_empty() {
            return Ok(out);
        }
        let statement = format!(
            "{} WHERE \"{}\" IN ({}) ORDER BY id",
            SELECT,
            column,
            placeholders(owner_ids.len())
        );
        let params: Vec<Value> = owner_ids.iter().map(|id| Value::Integer(*id)).collect();

        let factory = self.factory();
        for row in self.ctx.gateway.query(&statement, &params)? {
            let row = ReportRow::try_from(&row)?;
            let report = factory.create_object(&row)?;
            out.entry(owner(&row)).or_default().push(report);
        }
        Ok(out)
    }

    /// Loaded-or-not `reports` collection of a mapped Event/User
    fn owner_reports(&self, owner: EntityKind, id: i64) -> Option<Rc<ReportCollection>> {
        let reports = match owner {
            EntityKind::Event => {
                let event = self.ctx.watcher.get_from_map::<Event>(id)?;
                let reports = event.borrow().reports();
                reports
            }
            EntityKind::User => {
                let user = self.ctx.watcher.get_from_map::<User>(id)?;
                let reports = user.borrow().reports();
                reports
            }
            EntityKind::Report => None,
        };
        reports
    }

    fn column(&self, report: &Report, name: &str) -> Result<Value> {
        Ok(match name {
            "code" => Value::from(report.code()),
            "data" => Value::Text(self.ctx.codec.serialize(report.data())?),
            "event" => Value::Integer(reference_id(report.event_id(), EntityKind::Event)?),
            "user" => Value::Integer(reference_id(report.user_id(), EntityKind::User)?),
            other => {
                return Err(MapError::UnknownField {
                    entity: Report::KIND,
                    field: other.to_string(),
                }
                .into())
            }
        })
    }
}

/// Key of a referenced Event/User, which must already be persisted
fn reference_id(id: Option<i64>, entity: EntityKind) -> Result<i64> {
    match id {
        Some(id) if id != reportmap_core::UNSAVED_ID => Ok(id),
        Some(_) => Err(MapError::Unsaved { entity }.into()),
        None => Err(MapError::Internal {
            message: format!("referenced {} is mutably borrowed", entity),
        }
        .into()),
    }
}

impl Mapper<Report> for ReportMapper {
    fn watcher(&self) -> &ObjectWatcher {
        &self.ctx.watcher
    }

    fn do_find(&self, id: i64) -> Result<Option<Rc<RefCell<Report>>>> {
        let Some(row) = self.ctx.query_one(&format!("{} WHERE id = ?", SELECT), id)? else {
            return Ok(None);
        };
        let row = ReportRow::try_from(&row)?;
        self.factory().create_object(&row).map(Some)
    }

    fn do_insert(&self, obj: &Report) -> Result<i64> {
        let params = ["code", "data", "event", "user"]
            .iter()
            .map(|c| self.column(obj, c))
            .collect::<Result<Vec<_>>>()?;
        let result = self.ctx.gateway.execute(
            "INSERT INTO report (code, data, event, user) VALUES (?, ?, ?, ?)",
            &params,
        )?;
        Ok(result.last_insert_id)
    }

    fn do_update(&self, obj: &Report, columns: &[&'static str]) -> Result<usize> {
        let mut params = columns
            .iter()
            .map(|c| self.column(obj, c))
            .collect::<Result<Vec<_>>>()?;
        params.push(Value::Integer(obj.id()));
        Ok(self
            .ctx
            .gateway
            .execute(&update_statement("report", columns), &params)?
            .affected)
    }

    fn do_delete(&self, id: i64) -> Result<usize> {
        Ok(self
            .ctx
            .gateway
            .execute("DELETE FROM report WHERE id = ?", &[Value::Integer(id)])?
            .affected)
    }

    fn after_insert(&self, obj: &Rc<RefCell<Report>>) {
        let (event, user) = {
            let report = obj.borrow();
            (report.event(), report.user())
        };
        let collections = [event.borrow().reports(), user.borrow().reports()];
        for reports in collections.into_iter().flatten() {
            if reports.add_if_loaded(obj) {
                tracing::debug!(
                    relation = %reports.relation(),
                    owner_id = reports.owner_id(),
                    "inserted report appended to loaded collection"
                );
            }
        }
    }

    fn after_update(&self, obj: &Rc<RefCell<Report>>, columns: &[&'static str], before: Option<&IdentityObject>) {
        for (column, owner) in [("event", EntityKind::Event), ("user", EntityKind::User)] {
            if !columns.contains(&column) {
                continue;
            }
            let old_id = before.and_then(|b| b.get(column)).and_then(Value::as_integer);
            if let Some(reports) = old_id.and_then(|id| self.owner_reports(owner, id)) {
                if reports.remove_if_loaded(obj) {
                    tracing::debug!(
                        relation = %reports.relation(),
                        owner_id = reports.owner_id(),
                        "moved report removed from loaded collection"
                    );
                }
            }
            let new_reports = match owner {
                EntityKind::Event => obj.borrow().event().borrow().reports(),
                _ => obj.borrow().user().borrow().reports(),
            };
            if let Some(reports) = new_reports {
                if reports.add_if_loaded(obj) {
                    tracing::debug!(
                        relation = %reports.relation(),
                        owner_id = reports.owner_id(),
                        "moved report appended to loaded collection"
                    );
                }
            }
        }
    }

    fn after_delete(&self, obj: &Rc<RefCell<Report>>) {
        let (event, user) = {
            let report = obj.borrow();
            (report.event(), report.user())
        };
        let collections = [event.borrow().reports(), user.borrow().reports()];
        for reports in collections.into_iter().flatten() {
            if reports.remove_if_loaded(obj) {
                tracing::debug!(
                    relation = %reports.relation(),
                    owner_id = reports.owner_id(),
                    "deleted report removed from loaded collection"
                );
            }
        }
    }
}

/// Serves `event.reports` collections
pub struct ReportsByEvent {
    gateway: Rc<dyn Gateway>,
    codec: Rc<dyn DocumentCodec>,
}

impl ReportsByEvent {
    pub fn new(gateway: Rc<dyn Gateway>, codec: Rc<dyn DocumentCodec>) -> Self {
        Self { gateway, codec }
    }
}

impl CollectionLoader<Report> for ReportsByEvent {
    fn load_many(&self, watcher: &ObjectWatcher, owner_ids: &[i64]) -> Result<LoadedByOwner<Report>> {
        ReportMapper::new(MapperContext::new(
            self.gateway.clone(),
            self.codec.clone(),
            watcher.clone(),
        ))
        .find_by_events(owner_ids)
    }
}

/// Serves `user.reports` collections
pub struct ReportsByUser {
    gateway: Rc<dyn Gateway>,
    codec: Rc<dyn DocumentCodec>,
}

impl ReportsByUser {
    pub fn new(gateway: Rc<dyn Gateway>, codec: Rc<dyn DocumentCodec>) -> Self {
        Self { gateway, codec }
    }
}

impl CollectionLoader<Report> for ReportsByUser {
    fn load_many(&self, watcher: &ObjectWatcher, owner_ids: &[i64]) -> Result<LoadedByOwner<Report>> {
        ReportMapper::new(MapperContext::new(
            self.gateway.clone(),
            self.codec.clone(),
            watcher.clone(),
        ))
        .find_by_users(owner_ids)
    }
}
