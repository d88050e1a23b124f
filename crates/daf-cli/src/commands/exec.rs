//! Execution commands
//!
//! Every subcommand shares one set of arguments and differs only in which
//! facade operation shapes the result.

use super::param::parse_param;
use clap::Args;
use daf_core::config::{timeout_from_file, EnvSettings};
use daf_core::envelope::{
    STATUS_BAD_REQUEST, STATUS_GATEWAY_TIMEOUT, STATUS_INTERNAL_ERROR, STATUS_NOT_FOUND,
};
use daf_core::model::Parameter;
use daf_core::trace::LogTraceSink;
use daf_core::{ApiResult, DiagnosticTracer, ExErrorKind, Result, TimeoutSetting};
use daf_core_types::RequestContext;
use daf_store::{Command, Connection, SqlFacade};
use serde_json::{json, Value as JsonValue};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Identity,
    Table,
    Reader,
    View,
    Scalar,
    NonQuery,
    TryNonQuery,
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// SQLite database file
    #[arg(long)]
    pub db: PathBuf,

    /// SQL text to execute
    #[arg(long, conflicts_with = "proc", required_unless_present = "proc")]
    pub sql: Option<String>,

    /// Stored procedure to execute
    #[arg(long, requires = "proc_sql")]
    pub proc: Option<String>,

    /// Statement registered under the --proc name
    #[arg(long, requires = "proc")]
    pub proc_sql: Option<String>,

    /// Input parameter (repeatable)
    #[arg(long = "param", value_name = "NAME:TYPE=VALUE", value_parser = parse_param)]
    pub params: Vec<Parameter>,

    /// TOML settings file providing ConnectionString.TimeOut
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Context label for traces; also names the table
    #[arg(long)]
    pub label: Option<String>,

    /// Trace the executed command to the log
    #[arg(long)]
    pub trace: bool,

    /// Sort expression applied to view results, e.g. "amount DESC"
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long, requires = "per_page")]
    pub page: Option<u32>,

    #[arg(long, requires = "page")]
    pub per_page: Option<u32>,
}

pub fn execute(
    operation: Operation,
    args: ExecArgs,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let timeout = match &args.config {
        Some(path) => timeout_from_file(path)?,
        None => TimeoutSetting::from_source(EnvSettings::new()),
    };

    let mut facade = SqlFacade::new(timeout);
    if args.trace {
        let context = RequestContext::new().with_caller("daf-cli");
        let tracer = DiagnosticTracer::new(Arc::new(LogTraceSink)).with_context(context);
        facade = facade.with_tracer(tracer);
    }

    let mut cmd = build_command(&args)?;
    let mut envelope = ApiResult::new();

    match run(operation, &facade, &mut cmd, &args) {
        Ok(Outcome::Data(data)) => {
            envelope.data = data;
            if let (Some(page), Some(per_page)) = (args.page, args.per_page) {
                envelope.paginate(page, per_page);
            }
        }
        Ok(Outcome::Captured(message)) => {
            envelope.status_code = STATUS_INTERNAL_ERROR;
            envelope.status_message = message;
        }
        Err(e) => {
            envelope.status_code = status_for(e.kind());
            envelope.status_message = e.to_string();
            print_envelope(&mut envelope)?;
            return Err(e.into());
        }
    }

    print_envelope(&mut envelope)?;
    Ok(())
}

enum Outcome {
    Data(Vec<JsonValue>),
    /// Backend failure text returned by the capturing operation
    Captured(String),
}

fn build_command(args: &ExecArgs) -> std::result::Result<Command, Box<dyn std::error::Error>> {
    let connection = Connection::file(&args.db);
    let mut cmd = match (&args.sql, &args.proc, &args.proc_sql) {
        (Some(sql), _, _) => Command::new(sql.clone(), connection),
        (None, Some(name), Some(sql)) => {
            connection.register_procedure(name, sql.clone());
            Command::procedure(name.clone(), connection)
        }
        _ => return Err("Must specify either --sql or --proc with --proc-sql".into()),
    };
    if let Some(label) = &args.label {
        cmd = cmd.with_trace_label(label.clone());
    }
    for param in &args.params {
        cmd.add_parameter(param.clone());
    }
    Ok(cmd)
}

fn run(
    operation: Operation,
    facade: &SqlFacade,
    cmd: &mut Command,
    args: &ExecArgs,
) -> Result<Outcome> {
    let data = match operation {
        Operation::Identity => vec![json!({ "identity": facade.execute_identity(cmd)? })],
        Operation::Table => {
            let label = args.label.as_deref().unwrap_or(daf_store::VIEW_TABLE_NAME);
            let table = facade.execute_table(cmd, label)?;
            table
                .rows()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<JsonValue>, _>>()?
        }
        Operation::Reader => {
            let mut reader = facade.execute_reader(cmd)?;
            let mut rows = Vec::new();
            let mut failure = None;
            reader.read(|row| match serde_json::to_value(row) {
                Ok(value) => {
                    rows.push(value);
                    ControlFlow::Continue(())
                }
                Err(e) => {
                    failure = Some(e);
                    ControlFlow::Break(())
                }
            })?;
            reader.close()?;
            if let Some(e) = failure {
                return Err(e.into());
            }
            rows
        }
        Operation::View => {
            let mut view = facade.execute_view(cmd)?;
            if let Some(sort) = &args.sort {
                view.set_sort(sort)?;
            }
            view.rows()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<JsonValue>, _>>()?
        }
        Operation::Scalar => vec![json!({ "value": facade.execute_scalar_text(cmd)? })],
        Operation::NonQuery => vec![json!({ "rows_affected": facade.execute_non_query(cmd)? })],
        Operation::TryNonQuery => {
            let message = facade.execute_non_query_capturing_error(cmd)?;
            if !message.is_empty() {
                return Ok(Outcome::Captured(message));
            }
            Vec::new()
        }
    };
    Ok(Outcome::Data(data))
}

fn status_for(kind: ExErrorKind) -> u16 {
    match kind {
        ExErrorKind::InvalidInput
        | ExErrorKind::TypeMismatch
        | ExErrorKind::ParameterMismatch
        | ExErrorKind::Configuration => STATUS_BAD_REQUEST,
        ExErrorKind::UnknownProcedure => STATUS_NOT_FOUND,
        ExErrorKind::Timeout => STATUS_GATEWAY_TIMEOUT,
        _ => STATUS_INTERNAL_ERROR,
    }
}

fn print_envelope(envelope: &mut ApiResult) -> Result<()> {
    envelope.stop_timer();
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}
