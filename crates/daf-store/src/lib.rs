//! DAF Store - command execution over SQLite
//!
//! Provides:
//! - `Connection`: an open/closed handle to one SQLite session
//! - `Command`: a parameterized statement or named procedure bound to a connection
//! - `SqlFacade`: the seven execution operations with guaranteed connection release
//! - `DataReader`: forward-only stream that owns its open connection

pub mod command;
pub mod connection;
pub mod errors;
pub mod facade;
pub mod reader;
mod statement;

// Re-export key types
pub use command::{Command, CommandKind};
pub use connection::{Connection, ConnectionSource, ConnectionState};
pub use errors::Result;
pub use facade::{SqlFacade, VIEW_TABLE_NAME};
pub use reader::DataReader;
