use std::cell::RefCell;
use std::rc::Rc;

use reportmap_core::{DomainObject, DomainObjectFactory, Mapper, MapError, ObjectWatcher, User, Value};

use super::{update_statement, MapperContext};
use crate::errors::Result;
use crate::factory::UserObjectFactory;
use crate::rows::UserRow;

const SELECT: &str = "SELECT id, name FROM user";

#[derive(Clone)]
pub struct UserMapper {
    ctx: MapperContext,
}

impl UserMapper {
    pub fn new(ctx: MapperContext) -> Self {
        Self { ctx }
    }

    fn factory(&self) -> UserObjectFactory {
        UserObjectFactory::new(self.ctx.clone())
    }

    /// Every user, ordered by key
    ///
    /// # Errors
    ///
    /// Store and row-validation failures.
    pub fn find_all(&self) -> Result<Vec<Rc<RefCell<User>>>> {
        let factory = self.factory();
        self.ctx
            .gateway
            .query(&format!("{} ORDER BY id", SELECT), &[])?
            .iter()
            .map(|row| factory.create_object(&UserRow::try_from(row)?))
            .collect()
    }
}

fn column(user: &User, name: &str) -> Result<Value> {
    match name {
        "name" => Ok(Value::from(user.name())),
        other => Err(MapError::UnknownField {
            entity: User::KIND,
            field: other.to_string(),
        }
        .into()),
    }
}

impl Mapper<User> for UserMapper {
    fn watcher(&self) -> &ObjectWatcher {
        &self.ctx.watcher
    }

    fn do_find(&self, id: i64) -> Result<Option<Rc<RefCell<User>>>> {
        let Some(row) = self.ctx.query_one(&format!("{} WHERE id = ?", SELECT), id)? else {
            return Ok(None);
        };
        let row = UserRow::try_from(&row)?;
        self.factory().create_object(&row).map(Some)
    }

    fn do_insert(&self, obj: &User) -> Result<i64> {
        let result = self
            .ctx
            .gateway
            .execute("INSERT INTO user (name) VALUES (?)", &[Value::from(obj.name())])?;
        Ok(result.last_insert_id)
    }

    fn do_update(&self, obj: &User, columns: &[&'static str]) -> Result<usize> {
        let mut params = columns
            .iter()
            .map(|c| column(obj, c))
            .collect::<Result<Vec<_>>>()?;
        params.push(Value::Integer(obj.id()));
        Ok(self
            .ctx
            .gateway
            .execute(&update_statement("user", columns), &params)?
            .affected)
    }

    fn do_delete(&self, id: i64) -> Result<usize> {
        Ok(self
            .ctx
            .gateway
            .execute("DELETE FROM user WHERE id = ?", &[Value::Integer(id)])?
            .affected)
    }

    fn after_insert(&self, obj: &Rc<RefCell<User>>) {
        self.factory().attach_reports(obj);
    }
}
