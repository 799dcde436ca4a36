//! User commands
//!
//! Usage: reportmap user add <NAME> | reportmap user reports <ID>

use std::cell::RefCell;
use std::rc::Rc;

use clap::{Args, Subcommand};
use reportmap_core::{DomainObject, Mapper, User};
use reportmap_store::with_session;

use super::report::report_line;
use super::{CliResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Register a user
    Add {
        name: String,
    },
    /// List the reports filed by a user
    Reports {
        id: i64,
    },
}

pub fn execute(global: &GlobalArgs, args: UserArgs) -> CliResult<()> {
    let config = global.store_config()?;
    match args.command {
        UserCommand::Add { name } => {
            let user = Rc::new(RefCell::new(User::transient(name)));
            with_session(&config, |session| {
                session.user_mapper().queue_insert(&user);
                Ok(())
            })?;
            let user = user.borrow();
            println!("user#{} {}", user.id(), user.name());
        }
        UserCommand::Reports { id } => {
            let reports = with_session(&config, |session| {
                let user = session.user_mapper().find(id)?;
                let collection = user.borrow().reports();
                let items = match collection {
                    Some(reports) => reports.items()?,
                    None => Vec::new(),
                };
                Ok(items.iter().map(|r| report_line(&r.borrow())).collect::<Vec<_>>())
            })?;
            for line in reports {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
