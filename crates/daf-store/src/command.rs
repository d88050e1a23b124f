//! Prepared commands bound to a connection

use crate::connection::Connection;
use crate::errors::{unknown_procedure, Result};
use daf_core::config::DEFAULT_TIMEOUT_SECS;
use daf_core::model::Parameter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Parameterized SQL text
    Text,
    /// Name of a statement registered on the connection
    StoredProcedure,
}

/// A parameterized statement bound to a connection
///
/// The caller owns the command; the facade borrows it for one execution and
/// overwrites its timeout with the resolved setting.
#[derive(Debug, Clone)]
pub struct Command {
    text: String,
    kind: CommandKind,
    parameters: Vec<Parameter>,
    timeout_secs: u32,
    trace_label: Option<String>,
    connection: Connection,
}

impl Command {
    /// A SQL text command
    pub fn new(sql: impl Into<String>, connection: Connection) -> Self {
        Self::with_kind(sql.into(), CommandKind::Text, connection)
    }

    /// A stored-procedure command, resolved through the connection's registry
    pub fn procedure(name: impl Into<String>, connection: Connection) -> Self {
        Self::with_kind(name.into(), CommandKind::StoredProcedure, connection)
    }

    fn with_kind(text: String, kind: CommandKind, connection: Connection) -> Self {
        Self {
            text,
            kind,
            parameters: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            trace_label: None,
            connection,
        }
    }

    pub fn with_param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Label describing the calling context in diagnostic traces
    pub fn with_trace_label(mut self, label: impl Into<String>) -> Self {
        self.trace_label = Some(label.into());
        self
    }

    pub fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    pub fn command_text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name() == name)
    }

    pub fn trace_label(&self) -> Option<&str> {
        self.trace_label.as_deref()
    }

    /// Command timeout in seconds; 0 means no limit
    pub fn timeout(&self) -> u32 {
        self.timeout_secs
    }

    pub fn set_timeout(&mut self, secs: u32) {
        self.timeout_secs = secs;
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// SQL to prepare for this command
    ///
    /// # Errors
    ///
    /// `UnknownProcedure` if a stored-procedure name is not registered on the
    /// connection.
    pub fn resolve_sql(&self) -> Result<String> {
        match self.kind {
            CommandKind::Text => Ok(self.text.clone()),
            CommandKind::StoredProcedure => self
                .connection
                .procedure(&self.text)
                .ok_or_else(|| unknown_procedure(&self.text)),
        }
    }
}
