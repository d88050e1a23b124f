//! Command execution facade
//!
//! Every operation follows the same path: resolve the timeout, open the
//! connection if needed, bind and run one statement, then close and release
//! the connection on every exit path. Only [`SqlFacade::execute_reader`]
//! leaves the connection open, handing it to the returned reader.
//!
//! ## Logging Ownership
//!
//! The facade owns lifecycle logging (`log_op_start!`, `log_op_end!`,
//! `log_op_error!`). Connection and reader internals log at `debug` only.

use crate::command::Command;
use crate::connection::{Connection, ConnectionState};
use crate::errors::{from_rusqlite, invalid_state, Result};
use crate::reader::DataReader;
use crate::statement::{apply_bindings, arm_timeout, columns_of, resolve_bindings, row_values};
use daf_core::errors::{ExError, ExErrorKind};
use daf_core::model::{DataTable, DataView, Parameter, Value};
use daf_core::trace::{normalize_command_text, DiagnosticTracer};
use daf_core::{log_op_end, log_op_error, log_op_start, TimeoutSetting};
use std::cell::Cell;
use std::time::Instant;

/// Name of the table backing a view
pub const VIEW_TABLE_NAME: &str = "Table";

/// Closes then releases a connection when dropped, unless disarmed
struct SessionGuard {
    connection: Connection,
    armed: Cell<bool>,
}

impl SessionGuard {
    fn new(connection: Connection) -> Self {
        Self {
            connection,
            armed: Cell::new(true),
        }
    }

    /// Hand the open connection to someone else
    fn disarm(&self) -> Connection {
        self.armed.set(false);
        self.connection.clone()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.armed.get() {
            return;
        }
        if self.connection.state() == ConnectionState::Open {
            if let Err(e) = self.connection.close() {
                tracing::warn!(
                    data_source = %self.connection.data_source(),
                    err.code = e.code(),
                    err.message = e.message(),
                    "connection close failed"
                );
            }
        }
        self.connection.release();
    }
}

/// Everything a backend call needs while the session is borrowed
struct ExecContext<'a> {
    handle: &'a rusqlite::Connection,
    sql: &'a str,
    params: &'a [Parameter],
    guard: &'a SessionGuard,
}

impl<'a> ExecContext<'a> {
    /// Prepare the statement and bind the command's input parameters
    fn prepare(&self) -> Result<rusqlite::Statement<'a>> {
        let mut stmt = self.handle.prepare(self.sql).map_err(from_rusqlite)?;
        let bindings = resolve_bindings(&stmt, self.params)?;
        apply_bindings(&mut stmt, &bindings)?;
        Ok(stmt)
    }

    /// First column of the first row, if any
    fn first_value(&self) -> Result<Option<Value>> {
        let mut stmt = self.prepare()?;
        if stmt.column_count() == 0 {
            let mut rows = stmt.raw_query();
            while rows.next().map_err(from_rusqlite)?.is_some() {}
            return Ok(None);
        }
        let mut rows = stmt.raw_query();
        match rows.next().map_err(from_rusqlite)? {
            Some(row) => Ok(row_values(row, 1)?.into_iter().next()),
            None => Ok(None),
        }
    }
}

/// Executes commands with guaranteed connection release
///
/// The timeout setting is resolved fresh on every call and written into the
/// command before it runs.
#[derive(Debug, Clone, Default)]
pub struct SqlFacade {
    timeout: TimeoutSetting,
    tracer: Option<DiagnosticTracer>,
}

impl SqlFacade {
    pub fn new(timeout: TimeoutSetting) -> Self {
        Self {
            timeout,
            tracer: None,
        }
    }

    /// Trace every executed command through `tracer`
    pub fn with_tracer(mut self, tracer: DiagnosticTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn timeout_setting(&self) -> &TimeoutSetting {
        &self.timeout
    }

    /// Run the command and return the generated identity
    ///
    /// The identity is the first column of the first row (e.g. from
    /// `INSERT ... RETURNING id`). `None` when there is no row or the value
    /// is NULL.
    ///
    /// # Errors
    ///
    /// - `TypeMismatch` if the value is not an integer
    /// - any error the backend call raises
    pub fn execute_identity(&self, cmd: &mut Command) -> Result<Option<i64>> {
        self.run("execute_identity", cmd, |ctx| {
            match ctx.first_value()? {
                None | Some(Value::Null) => Ok(None),
                Some(value) => identity_of(&value).map(Some),
            }
        })
    }

    /// Run the command and materialize its full result set as a table named `label`
    ///
    /// # Errors
    ///
    /// Any error the backend call raises.
    pub fn execute_table(&self, cmd: &mut Command, label: &str) -> Result<DataTable> {
        self.run("execute_table", cmd, |ctx| {
            let mut stmt = ctx.prepare()?;
            let mut table = DataTable::new(label, columns_of(&stmt));
            let width = table.columns().len();
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next().map_err(from_rusqlite)? {
                table.push_row(row_values(row, width)?);
            }
            Ok(table)
        })
    }

    /// Run the command and return a forward-only reader over its rows
    ///
    /// The statement runs to completion before this returns, so its side
    /// effects and backend failures happen here. The connection stays open
    /// and belongs to the reader; close or drop the reader to release it.
    ///
    /// # Errors
    ///
    /// Any error the backend call raises. The connection is closed when
    /// creation fails.
    pub fn execute_reader(&self, cmd: &mut Command) -> Result<DataReader> {
        self.run("execute_reader", cmd, |ctx| {
            let mut stmt = ctx.prepare()?;
            let columns = columns_of(&stmt);
            let mut buffered = Vec::new();
            {
                let mut rows = stmt.raw_query();
                while let Some(row) = rows.next().map_err(from_rusqlite)? {
                    buffered.push(row_values(row, columns.len())?);
                }
            }
            drop(stmt);
            Ok(DataReader::new(ctx.guard.disarm(), columns, buffered))
        })
    }

    /// Run the command into a table named [`VIEW_TABLE_NAME`] and wrap it in a view
    ///
    /// # Errors
    ///
    /// Any error the backend call raises.
    pub fn execute_view(&self, cmd: &mut Command) -> Result<DataView> {
        self.execute_table(cmd, VIEW_TABLE_NAME).map(DataView::new)
    }

    /// Run the command and return the first column of the first row as text
    ///
    /// Empty text when there is no row or the value is NULL.
    ///
    /// # Errors
    ///
    /// Any error the backend call raises.
    pub fn execute_scalar_text(&self, cmd: &mut Command) -> Result<String> {
        self.run("execute_scalar_text", cmd, |ctx| {
            Ok(ctx.first_value()?.map(|v| v.to_text()).unwrap_or_default())
        })
    }

    /// Run the command and return the number of rows it changed
    ///
    /// Read-only statements report 0.
    ///
    /// # Errors
    ///
    /// Any error the backend call raises.
    pub fn execute_non_query(&self, cmd: &mut Command) -> Result<u64> {
        self.run("execute_non_query", cmd, |ctx| {
            let mut stmt = ctx.prepare()?;
            {
                let mut rows = stmt.raw_query();
                while rows.next().map_err(from_rusqlite)?.is_some() {}
            }
            if stmt.readonly() {
                Ok(0)
            } else {
                Ok(ctx.handle.changes() as u64)
            }
        })
    }

    /// Run the command, returning backend failures as their message text
    ///
    /// Empty text on success. Anything the backend reports is captured,
    /// including unknown procedures and parameters the statement does not
    /// match.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if an open reader owns the connection
    /// - `InvalidInput` if a parameter value contradicts its declared type
    pub fn execute_non_query_capturing_error(&self, cmd: &mut Command) -> Result<String> {
        match self.execute_non_query(cmd) {
            Ok(_) => Ok(String::new()),
            Err(e) if e.is_backend() => Ok(e.message().to_string()),
            Err(e) => Err(e),
        }
    }

    fn run<T>(
        &self,
        op: &'static str,
        cmd: &mut Command,
        step: impl FnOnce(&ExecContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let connection = cmd.connection().clone();
        log_op_start!(
            op,
            command = %normalize_command_text(cmd.command_text()),
            data_source = %connection.data_source()
        );
        let start = Instant::now();

        let timeout_secs = self.timeout.resolve();
        cmd.set_timeout(timeout_secs);

        let result = execute(&connection, cmd, step).map_err(|e| self.contextualize(op, cmd, e));

        let label = cmd.trace_label().unwrap_or(op).to_string();
        self.trace(cmd, &connection, &label);

        match result {
            Ok(value) => {
                log_op_end!(
                    op,
                    duration_ms = start.elapsed().as_millis() as u64,
                    timeout_secs = timeout_secs
                );
                Ok(value)
            }
            Err(e) => {
                log_op_error!(op, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
                Err(e)
            }
        }
    }

    fn contextualize(&self, op: &str, cmd: &Command, err: ExError) -> ExError {
        let err = if err.kind() == ExErrorKind::Timeout {
            let message = format!(
                "command timeout of {} seconds expired ({})",
                cmd.timeout(),
                err.message()
            );
            err.with_message(message)
        } else {
            err
        };
        let err = err
            .with_op(op)
            .with_command(normalize_command_text(cmd.command_text()));
        match &self.tracer {
            Some(tracer) => err.with_request_id(tracer.request_id().clone()),
            None => err,
        }
    }

    fn trace(&self, cmd: &Command, connection: &Connection, label: &str) {
        if let Some(tracer) = &self.tracer {
            tracer.trace(
                cmd.command_text(),
                cmd.parameters(),
                &connection.database(),
                &connection.data_source(),
                label,
            );
        }
    }
}

/// Open if needed, then run one backend call under a session guard
fn execute<T>(
    connection: &Connection,
    cmd: &Command,
    step: impl FnOnce(&ExecContext<'_>) -> Result<T>,
) -> Result<T> {
    if connection.is_leased() {
        return Err(invalid_state("execute", "connection is owned by an open reader"));
    }
    if connection.state() == ConnectionState::Closed {
        connection.open()?;
    }
    let guard = SessionGuard::new(connection.clone());

    let sql = cmd.resolve_sql()?;
    connection.with_handle(|handle| {
        arm_timeout(handle, cmd.timeout())?;
        step(&ExecContext {
            handle,
            sql: &sql,
            params: cmd.parameters(),
            guard: &guard,
        })
    })
}

fn identity_of(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => Ok(*r as i64),
        Value::Text(s) => s.trim().parse::<i64>().map_err(|_| identity_mismatch(value)),
        _ => Err(identity_mismatch(value)),
    }
}

fn identity_mismatch(value: &Value) -> ExError {
    ExError::new(ExErrorKind::TypeMismatch)
        .with_op("execute_identity")
        .with_message(format!("identity value {} is not an integer", value))
}
