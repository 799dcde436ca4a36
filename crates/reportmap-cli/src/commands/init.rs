//! Store initialization
//!
//! Usage: reportmap init [--db PATH]

use reportmap_store::{db, migrations};

use super::{CliResult, GlobalArgs};

pub fn execute(global: &GlobalArgs) -> CliResult<()> {
    let config = global.store_config()?;
    let conn = db::open_configured(&config)?;
    let applied = migrations::applied_migrations(&conn)?;

    let path = config
        .db_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    println!("Initialized store at {}", path);
    println!("Migrations: {}", applied.join(", "));
    Ok(())
}
