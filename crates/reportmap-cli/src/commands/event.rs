//! Event commands

use std::cell::RefCell;
use std::rc::Rc;

use clap::{Args, Subcommand};
use reportmap_core::{DomainObject, Event, Mapper};
use reportmap_store::with_session;

use super::report::report_line;
use super::{CliResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommand,
}

#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Register a reporting event
    Add(AddArgs),
    /// List the reports filed against an event
    Reports {
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,

    /// Period start, e.g. 1806
    #[arg(long)]
    pub start: String,

    /// Period end, e.g. 1906
    #[arg(long)]
    pub end: String,

    /// Report template the event expects
    #[arg(long)]
    pub report: String,
}

pub fn execute(global: &GlobalArgs, args: EventArgs) -> CliResult<()> {
    let config = global.store_config()?;
    match args.command {
        EventCommand::Add(add) => {
            let event = Rc::new(RefCell::new(Event::transient(
                add.name, add.start, add.end, add.report,
            )));
            with_session(&config, |session| {
                session.event_mapper().queue_insert(&event);
                Ok(())
            })?;
            let event = event.borrow();
            println!(
                "event#{} {} {}-{} ({})",
                event.id(),
                event.name(),
                event.start(),
                event.end(),
                event.report_template()
            );
        }
        EventCommand::Reports { id } => {
            let lines = with_session(&config, |session| {
                let event = session.event_mapper().find(id)?;
                let collection = event.borrow().reports();
                let items = match collection {
                    Some(reports) => reports.items()?,
                    None => Vec::new(),
                };
                Ok(items.iter().map(|r| report_line(&r.borrow())).collect::<Vec<_>>())
            })?;
            for line in lines {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
