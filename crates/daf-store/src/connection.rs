//! Database connection management
//!
//! A [`Connection`] is a cheap, cloneable handle to one SQLite session. Every
//! clone sees the same state, so a caller can keep a clone to observe a
//! connection that a command or reader currently owns. The handle is
//! single-threaded (`!Send`) by construction.

use crate::errors::{from_rusqlite, invalid_state, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where a session connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSource {
    File(PathBuf),
    /// Private in-memory database; its contents vanish when the connection closes
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

struct Session {
    source: ConnectionSource,
    handle: Option<rusqlite::Connection>,
    procedures: HashMap<String, String>,
    /// Set while an open reader owns the session
    leased: Cell<bool>,
}

#[derive(Clone)]
pub struct Connection {
    session: Rc<RefCell<Session>>,
}

impl Connection {
    /// A closed connection to the given source
    pub fn new(source: ConnectionSource) -> Self {
        Self {
            session: Rc::new(RefCell::new(Session {
                source,
                handle: None,
                procedures: HashMap::new(),
                leased: Cell::new(false),
            })),
        }
    }

    /// A closed connection to a database file
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self::new(ConnectionSource::File(path.as_ref().to_path_buf()))
    }

    /// A closed connection to a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(ConnectionSource::Memory)
    }

    pub fn state(&self) -> ConnectionState {
        match self.session.try_borrow() {
            Ok(session) if session.handle.is_none() => ConnectionState::Closed,
            _ => ConnectionState::Open,
        }
    }

    /// Whether an open reader currently owns this connection
    pub fn is_leased(&self) -> bool {
        self.session.try_borrow().map_or(true, |s| s.leased.get())
    }

    pub(crate) fn lease(&self) {
        if let Ok(session) = self.session.try_borrow() {
            session.leased.set(true);
        }
    }

    pub fn source(&self) -> ConnectionSource {
        self.session.borrow().source.clone()
    }

    /// Database name: the file stem, or `main` for in-memory databases
    pub fn database(&self) -> String {
        match &self.session.borrow().source {
            ConnectionSource::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "main".to_string()),
            ConnectionSource::Memory => "main".to_string(),
        }
    }

    /// Data source: the database path, or `:memory:`
    pub fn data_source(&self) -> String {
        match &self.session.borrow().source {
            ConnectionSource::File(path) => path.display().to_string(),
            ConnectionSource::Memory => ":memory:".to_string(),
        }
    }

    /// Register a named statement callable as a stored procedure
    ///
    /// Names are stored without the `dbo.` owner and bracket quoting, so
    /// `dbo.[InsertOrder]`, `[InsertOrder]` and `InsertOrder` refer to the same
    /// procedure.
    pub fn register_procedure(&self, name: &str, sql: impl Into<String>) {
        self.session
            .borrow_mut()
            .procedures
            .insert(procedure_key(name).to_string(), sql.into());
    }

    pub(crate) fn procedure(&self, name: &str) -> Option<String> {
        self.session
            .borrow()
            .procedures
            .get(procedure_key(name))
            .cloned()
    }

    /// Open the session
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the connection is already open or in use
    /// - `Backend` if SQLite cannot open the source
    pub fn open(&self) -> Result<()> {
        let mut session = self
            .session
            .try_borrow_mut()
            .map_err(|_| invalid_state("open", "connection is in use"))?;
        if session.handle.is_some() {
            return Err(invalid_state("open", "connection is already open"));
        }

        let handle = match &session.source {
            ConnectionSource::File(path) => rusqlite::Connection::open(path),
            ConnectionSource::Memory => rusqlite::Connection::open_in_memory(),
        }
        .map_err(from_rusqlite)?;
        configure(&handle)?;

        session.handle = Some(handle);
        tracing::debug!(data_source = %display_source(&session.source), "connection opened");
        Ok(())
    }

    /// Close the session; closing a closed connection is a no-op
    ///
    /// The connection is `Closed` afterwards even if SQLite reports an error
    /// while finalizing.
    pub fn close(&self) -> Result<()> {
        let handle = self
            .session
            .try_borrow_mut()
            .map_err(|_| invalid_state("close", "connection is in use"))?
            .handle
            .take();
        match handle {
            None => Ok(()),
            Some(handle) => handle.close().map_err(|(_, e)| from_rusqlite(e)),
        }
    }

    /// Drop whatever backend resources remain (session handle, statement cache)
    pub fn release(&self) {
        if let Ok(mut session) = self.session.try_borrow_mut() {
            session.leased.set(false);
            if session.handle.take().is_some() {
                tracing::debug!("connection released while open");
            }
        }
    }

    /// Run `f` against the open session
    pub(crate) fn with_handle<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> Result<T>,
    ) -> Result<T> {
        let session = self
            .session
            .try_borrow()
            .map_err(|_| invalid_state("execute", "connection is in use"))?;
        let handle = session
            .handle
            .as_ref()
            .ok_or_else(|| invalid_state("execute", "connection is not open"))?;
        f(handle)
    }
}

/// Per-session settings applied on every open
fn configure(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .map_err(from_rusqlite)?;
    Ok(())
}

fn display_source(source: &ConnectionSource) -> String {
    match source {
        ConnectionSource::File(path) => path.display().to_string(),
        ConnectionSource::Memory => ":memory:".to_string(),
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("data_source", &self.data_source())
            .field("state", &self.state())
            .finish()
    }
}

fn procedure_key(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix("dbo.").unwrap_or(name);
    name.strip_prefix('[')
        .and_then(|n| n.strip_suffix(']'))
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daf_core::ExErrorKind;

    #[test]
    fn test_open_close_cycle() {
        let conn = Connection::in_memory();
        assert_eq!(conn.state(), ConnectionState::Closed);

        conn.open().unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);

        conn.close().unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);

        conn.open().unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);
        conn.release();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_double_open_is_invalid_state() {
        let conn = Connection::in_memory();
        conn.open().unwrap();
        assert_eq!(conn.open().unwrap_err().kind(), ExErrorKind::InvalidState);
    }

    #[test]
    fn test_clones_share_state() {
        let conn = Connection::in_memory();
        let observer = conn.clone();
        conn.open().unwrap();
        assert_eq!(observer.state(), ConnectionState::Open);
        observer.close().unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_identity() {
        let conn = Connection::file("/var/data/orders.db");
        assert_eq!(conn.database(), "orders");
        assert_eq!(conn.data_source(), "/var/data/orders.db");

        let mem = Connection::in_memory();
        assert_eq!(mem.database(), "main");
        assert_eq!(mem.data_source(), ":memory:");
    }

    #[test]
    fn test_procedure_names_are_normalized() {
        let conn = Connection::in_memory();
        conn.register_procedure("dbo.[GetOrders]", "SELECT 1");
        assert_eq!(conn.procedure("GetOrders").as_deref(), Some("SELECT 1"));
        assert_eq!(conn.procedure("[GetOrders]").as_deref(), Some("SELECT 1"));
        assert!(conn.procedure("Other").is_none());
    }

    #[test]
    fn test_release_ends_lease() {
        let conn = Connection::in_memory();
        conn.open().unwrap();
        conn.lease();
        assert!(conn.is_leased());
        conn.release();
        assert!(!conn.is_leased());
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_with_handle_requires_open() {
        let conn = Connection::in_memory();
        let err = conn.with_handle(|_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidState);
    }
}
