use daf_core_types::RequestId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and the CLI's JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Client-side
    InvalidInput,
    InvalidState,
    TypeMismatch,

    // Backend
    Backend,
    ConstraintViolation,
    Timeout,
    UnknownProcedure,
    ParameterMismatch,

    // Ambient
    Configuration,
    Io,
    Serialization,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidState => "ERR_INVALID_STATE",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::Backend => "ERR_BACKEND",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::UnknownProcedure => "ERR_UNKNOWN_PROCEDURE",
            ExErrorKind::ParameterMismatch => "ERR_PARAMETER_MISMATCH",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether the backend reported this failure while executing a command
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Backend
                | ExErrorKind::ConstraintViolation
                | ExErrorKind::Timeout
                | ExErrorKind::UnknownProcedure
                | ExErrorKind::ParameterMismatch
        )
    }
}

/// Canonical structured error type
///
/// Classification fields support programmatic handling; the context fields
/// (operation, command text, backend code) support debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    command: Option<String>,
    backend_code: Option<i32>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            command: None,
            backend_code: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the text of the command being executed
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Add the driver's extended result code
    pub fn with_backend_code(mut self, code: i32) -> Self {
        self.backend_code = Some(code);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Whether this error was reported by the backend during execution
    pub fn is_backend(&self) -> bool {
        self.kind.is_backend()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the command text context, if any
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Get the backend result code, if any
    pub fn backend_code(&self) -> Option<i32> {
        self.backend_code
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(command) = &self.command {
            write!(f, " (command: {})", command)?;
        }
        if let Some(code) = self.backend_code {
            write!(f, " (backend_code: {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Failures loading an external settings file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("Cannot read settings file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Settings file is not valid TOML
    #[error("Malformed settings file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        match &err {
            ConfigError::Unreadable { .. } => ExError::new(ExErrorKind::Io)
                .with_op("load_settings")
                .with_message(err.to_string()),
            ConfigError::Malformed { .. } => ExError::new(ExErrorKind::Configuration)
                .with_op("load_settings")
                .with_message(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}
