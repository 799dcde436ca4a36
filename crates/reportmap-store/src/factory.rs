//! Object factories for store rows
//!
//! Users and Events come out with a deferred `reports` collection attached;
//! Reports resolve their Event and User through the session's mappers, so a
//! shared reference is the identity-mapped instance.

use std::cell::RefCell;
use std::rc::Rc;

use reportmap_core::{
    DeferredCollection, DomainObject, DomainObjectFactory, Event, Mapper, ObjectWatcher, Relation, Report, User,
};

use crate::errors::Result;
use crate::mapper::{EventMapper, MapperContext, ReportsByEvent, ReportsByUser, UserMapper};
use crate::rows::{EventRow, ReportRow, UserRow};

pub struct UserObjectFactory {
    ctx: MapperContext,
}

impl UserObjectFactory {
    pub fn new(ctx: MapperContext) -> Self {
        Self { ctx }
    }

    /// Give a persisted user its `reports` collection if it has none
    pub fn attach_reports(&self, user: &Rc<RefCell<User>>) {
        let mut user = user.borrow_mut();
        if user.reports().is_none() && !user.is_transient() {
            let loader = ReportsByUser::new(self.ctx.gateway.clone(), self.ctx.codec.clone());
            let owner_id = user.id();
            user.set_reports(DeferredCollection::<Report>::new(
                &self.ctx.watcher,
                Relation::UserReports,
                owner_id,
                Rc::new(loader),
            ));
        }
    }
}

impl DomainObjectFactory for UserObjectFactory {
    type Object = User;
    type Row = UserRow;

    fn watcher(&self) -> &ObjectWatcher {
        &self.ctx.watcher
    }

    fn do_create_object(&self, row: &UserRow) -> Result<User> {
        Ok(User::new(row.id, row.name.clone()))
    }

    fn after_create(&self, obj: &Rc<RefCell<User>>) {
        self.attach_reports(obj);
    }
}

pub struct EventObjectFactory {
    ctx: MapperContext,
}

impl EventObjectFactory {
    pub fn new(ctx: MapperContext) -> Self {
        Self { ctx }
    }

    /// Give a persisted event its `reports` collection if it has none
    pub fn attach_reports(&self, event: &Rc<RefCell<Event>>) {
        let mut event = event.borrow_mut();
        if event.reports().is_none() && !event.is_transient() {
            let loader = ReportsByEvent::new(self.ctx.gateway.clone(), self.ctx.codec.clone());
            let owner_id = event.id();
            event.set_reports(DeferredCollection::<Report>::new(
                &self.ctx.watcher,
                Relation::EventReports,
                owner_id,
                Rc::new(loader),
            ));
        }
    }
}

impl DomainObjectFactory for EventObjectFactory {
    type Object = Event;
    type Row = EventRow;

    fn watcher(&self) -> &ObjectWatcher {
        &self.ctx.watcher
    }

    fn do_create_object(&self, row: &EventRow) -> Result<Event> {
        Ok(Event::new(
            row.id,
            row.name.clone(),
            row.start.clone(),
            row.end.clone(),
            row.report.clone(),
        ))
    }

    fn after_create(&self, obj: &Rc<RefCell<Event>>) {
        self.attach_reports(obj);
    }
}

pub struct ReportObjectFactory {
    ctx: MapperContext,
}

impl ReportObjectFactory {
    pub fn new(ctx: MapperContext) -> Self {
        Self { ctx }
    }
}

impl DomainObjectFactory for ReportObjectFactory {
    type Object = Report;
    type Row = ReportRow;

    fn watcher(&self) -> &ObjectWatcher {
        &self.ctx.watcher
    }

    fn do_create_object(&self, row: &ReportRow) -> Result<Report> {
        let event = EventMapper::new(self.ctx.clone()).find(row.event)?;
        let user = UserMapper::new(self.ctx.clone()).find(row.user)?;
        let data = self.ctx.codec.deserialize(&row.data)?;
        Ok(Report::new(row.id, row.code.clone(), data, event, user))
    }
}
