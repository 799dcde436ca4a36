//! Report commands
//!
//! Usage:
//!   reportmap report add --event <ID> --user <ID> --data <FILE> [--code CODE] [--set PATH=VALUE]...
//!   reportmap report show <ID>

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Args, Subcommand};
use reportmap_core::{DomainObject, Mapper, Report};
use reportmap_store::{with_session, YamlCodec};

use super::{document_fields, parse_value, CliResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// File a report from a YAML form
    Add(AddArgs),
    /// Print a report and its fields
    Show { id: i64 },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub event: i64,

    #[arg(long)]
    pub user: i64,

    /// YAML form holding the report data
    #[arg(long)]
    pub data: PathBuf,

    /// Report code (defaults to the form's file stem)
    #[arg(long)]
    pub code: Option<String>,

    /// Override a field before storing, e.g. --set 1.1A=50
    #[arg(long = "set", value_parser = parse_assignment)]
    pub sets: Vec<(String, String)>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((path, value)) if !path.is_empty() => Ok((path.to_string(), value.to_string())),
        _ => Err(format!("expected PATH=VALUE, got '{}'", raw)),
    }
}

/// One-line summary used by the listing commands
pub fn report_line(report: &Report) -> String {
    format!(
        "report#{} {} event#{} user#{}",
        report.id(),
        report.code(),
        report.event().borrow().id(),
        report.user().borrow().id()
    )
}

pub fn execute(global: &GlobalArgs, args: ReportArgs) -> CliResult<()> {
    match args.command {
        ReportCommand::Add(add) => execute_add(global, add),
        ReportCommand::Show { id } => execute_show(global, id),
    }
}

fn execute_add(global: &GlobalArgs, args: AddArgs) -> CliResult<()> {
    let config = global.store_config()?;
    let mut data = YamlCodec::new().read_file(&args.data)?;
    for (path, raw) in &args.sets {
        data.set(path, parse_value(raw))?;
    }
    let code = match args.code {
        Some(code) => code,
        None => args
            .data
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or("cannot derive a report code from the data path; pass --code")?,
    };

    let line = with_session(&config, |session| {
        let event = session.event_mapper().find(args.event)?;
        let user = session.user_mapper().find(args.user)?;
        let report = Rc::new(RefCell::new(Report::transient(code, data, event, user)));
        session.report_mapper().insert(&report)?;
        let line = report_line(&report.borrow());
        Ok(line)
    })?;
    println!("{}", line);
    Ok(())
}

fn execute_show(global: &GlobalArgs, id: i64) -> CliResult<()> {
    let config = global.store_config()?;
    let (header, fields) = with_session(&config, |session| {
        let report = session.report_mapper().find(id)?;
        let report = report.borrow();
        let event = report.event();
        let user = report.user();
        let header = format!(
            "report#{} {}\nevent: {} ({}-{})\nuser: {}",
            report.id(),
            report.code(),
            event.borrow().name(),
            event.borrow().start(),
            event.borrow().end(),
            user.borrow().name()
        );
        let data = report.data().clone();
        Ok((header, data))
    })?;

    println!("{}", header);
    for (path, value) in document_fields(&fields)? {
        println!("  {} = {}", path, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("1.1A=50"),
            Ok(("1.1A".to_string(), "50".to_string()))
        );
        assert_eq!(
            parse_assignment("2/notes/0=a=b"),
            Ok(("2/notes/0".to_string(), "a=b".to_string()))
        );
        assert!(parse_assignment("=5").is_err());
        assert!(parse_assignment("novalue").is_err());
    }
}
