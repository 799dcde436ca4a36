use std::cell::RefCell;
use std::rc::Rc;

use reportmap_core::{DomainObject, DomainObjectFactory, Event, MapError, Mapper, ObjectWatcher, Value};

use super::{update_statement, MapperContext};
use crate::errors::Result;
use crate::factory::EventObjectFactory;
use crate::rows::EventRow;

const SELECT: &str = "SELECT id, name, start, \"end\", report FROM event";

#[derive(Clone)]
pub struct EventMapper {
    ctx: MapperContext,
}

impl EventMapper {
    pub fn new(ctx: MapperContext) -> Self {
        Self { ctx }
    }

    fn factory(&self) -> EventObjectFactory {
        EventObjectFactory::new(self.ctx.clone())
    }

    /// Every event, ordered by key
    ///
    /// # Errors
    ///
    /// Store and row-validation failures.
    pub fn find_all(&self) -> Result<Vec<Rc<RefCell<Event>>>> {
        let factory = self.factory();
        self.ctx
            .gateway
            .query(&format!("{} ORDER BY id", SELECT), &[])?
            .iter()
            .map(|row| factory.create_object(&EventRow::try_from(row)?))
            .collect()
    }
}

fn column(event: &Event, name: &str) -> Result<Value> {
    Ok(match name {
        "name" => Value::from(event.name()),
        "start" => Value::from(event.start()),
        "end" => Value::from(event.end()),
        "report" => Value::from(event.report_template()),
        other => {
            return Err(MapError::UnknownField {
                entity: Event::KIND,
                field: other.to_string(),
            }
            .into())
        }
    })
}

impl Mapper<Event> for EventMapper {
    fn watcher(&self) -> &ObjectWatcher {
        &self.ctx.watcher
    }

    fn do_find(&self, id: i64) -> Result<Option<Rc<RefCell<Event>>>> {
        let Some(row) = self.ctx.query_one(&format!("{} WHERE id = ?", SELECT), id)? else {
            return Ok(None);
        };
        let row = EventRow::try_from(&row)?;
        self.factory().create_object(&row).map(Some)
    }

    fn do_insert(&self, obj: &Event) -> Result<i64> {
        let result = self.ctx.gateway.execute(
            "INSERT INTO event (name, start, \"end\", report) VALUES (?, ?, ?, ?)",
            &[
                Value::from(obj.name()),
                Value::from(obj.start()),
                Value::from(obj.end()),
                Value::from(obj.report_template()),
            ],
        )?;
        Ok(result.last_insert_id)
    }

    fn do_update(&self, obj: &Event, columns: &[&'static str]) -> Result<usize> {
        let mut params = columns
            .iter()
            .map(|c| column(obj, c))
            .collect::<Result<Vec<_>>>()?;
        params.push(Value::Integer(obj.id()));
        Ok(self
            .ctx
            .gateway
            .execute(&update_statement("event", columns), &params)?
            .affected)
    }

    fn do_delete(&self, id: i64) -> Result<usize> {
        Ok(self
            .ctx
            .gateway
            .execute("DELETE FROM event WHERE id = ?", &[Value::Integer(id)])?
            .affected)
    }

    fn after_insert(&self, obj: &Rc<RefCell<Event>>) {
        self.factory().attach_reports(obj);
    }
}
