//! Diagnostic tracer for executed commands
//!
//! Renders one human-readable line per executed command and hands it to a
//! [`TraceSink`]. Tracing is fire-and-forget: sink errors and panics are
//! logged and swallowed, never reaching the operation that traced.

use crate::errors::{ExError, Result};
use crate::model::{ParamDirection, Parameter};
use daf_core_types::{RequestContext, RequestId};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// Destination for rendered trace lines
pub trait TraceSink: Send + Sync {
    /// Record one trace line for a request
    fn write(&self, request_id: &RequestId, line: &str) -> Result<()>;
}

/// Sink that discards every line
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn write(&self, _: &RequestId, _: &str) -> Result<()> {
        Ok(())
    }
}

/// Sink that emits each line as a debug event
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn write(&self, request_id: &RequestId, line: &str) -> Result<()> {
        tracing::debug!(request_id = %request_id, trace = line, "command trace");
        Ok(())
    }
}

/// Request-scoped key-value store keeping the latest line per request
#[derive(Default)]
pub struct MemoryTraceSink {
    lines: Mutex<HashMap<RequestId, String>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest line recorded for a request
    pub fn latest(&self, request_id: &RequestId) -> Option<String> {
        self.lines.lock().ok()?.get(request_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceSink for MemoryTraceSink {
    fn write(&self, request_id: &RequestId, line: &str) -> Result<()> {
        let mut lines = self.lines.lock().map_err(|_| {
            ExError::new(crate::errors::ExErrorKind::Internal)
                .with_op("trace_write")
                .with_message("trace store lock poisoned")
        })?;
        lines.insert(request_id.clone(), line.to_string());
        Ok(())
    }
}

/// Renders and records trace lines for one request
#[derive(Clone)]
pub struct DiagnosticTracer {
    sink: Arc<dyn TraceSink>,
    context: RequestContext,
}

impl DiagnosticTracer {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            sink,
            context: RequestContext::new(),
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn request_id(&self) -> &RequestId {
        &self.context.request_id
    }

    /// Build the trace line for an executed command
    ///
    /// `EXECUTE <text> <params> <database> <server> <label>`, where params
    /// are the comma-separated `name=value` pairs of every parameter that is
    /// not the return value.
    pub fn describe(
        text: &str,
        params: &[Parameter],
        database: &str,
        server: &str,
        label: &str,
    ) -> String {
        let rendered: Vec<String> = params
            .iter()
            .filter(|p| p.direction() != ParamDirection::ReturnValue)
            .map(Parameter::render_trace)
            .collect();
        format!(
            "EXECUTE {} {} {} {} {}",
            normalize_command_text(text),
            rendered.join(", "),
            database,
            server,
            label
        )
    }

    /// Describe the command and hand the line to the sink
    pub fn trace(
        &self,
        text: &str,
        params: &[Parameter],
        database: &str,
        server: &str,
        label: &str,
    ) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let line = Self::describe(text, params, database, server, label);
            self.sink.write(&self.context.request_id, &line)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                request_id = %self.context.request_id,
                caller = self.context.caller.as_deref().unwrap_or(""),
                err.code = e.code(),
                "trace sink failed; line dropped"
            ),
            Err(_) => tracing::warn!(
                request_id = %self.context.request_id,
                caller = self.context.caller.as_deref().unwrap_or(""),
                "trace sink panicked; line dropped"
            ),
        }
    }
}

impl std::fmt::Debug for DiagnosticTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticTracer")
            .field("request_id", &self.context.request_id)
            .finish()
    }
}

/// Strip the `dbo.[` owner prefix and closing brackets from a command text
///
/// Only the `dbo.[` sequence and `]` are removed; an opening bracket without
/// the owner prefix is left alone.
pub fn normalize_command_text(text: &str) -> String {
    text.replace("dbo.[", "").replace(']', "")
}
