//! Forward-only result streams
//!
//! A [`DataReader`] owns the open connection its command ran on, along with
//! the rows the statement produced. Rows are handed out by
//! [`DataReader::read`] exactly once; closing the reader, or dropping it,
//! closes and releases the connection.

use crate::connection::{Connection, ConnectionState};
use crate::errors::{invalid_state, Result};
use daf_core::model::{DataColumn, RowRef, Value};
use std::ops::ControlFlow;

pub struct DataReader {
    connection: Connection,
    columns: Vec<DataColumn>,
    rows: Vec<Vec<Value>>,
    consumed: bool,
    closed: bool,
}

impl DataReader {
    pub(crate) fn new(
        connection: Connection,
        columns: Vec<DataColumn>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        connection.lease();
        Self {
            connection,
            columns,
            rows,
            consumed: false,
            closed: false,
        }
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The connection this reader holds open
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Hand every row to `visit` until it breaks or the rows run out
    ///
    /// Returns the number of rows delivered. Rows are dropped as they are
    /// delivered.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the reader was already read or closed.
    pub fn read<F>(&mut self, mut visit: F) -> Result<u64>
    where
        F: FnMut(RowRef<'_>) -> ControlFlow<()>,
    {
        if self.closed {
            return Err(invalid_state("read", "reader is closed"));
        }
        if self.consumed {
            return Err(invalid_state("read", "reader has already been read"));
        }
        self.consumed = true;

        let mut delivered = 0u64;
        for values in std::mem::take(&mut self.rows) {
            delivered += 1;
            if visit(RowRef::new(&self.columns, &values)).is_break() {
                break;
            }
        }
        Ok(delivered)
    }

    /// Close the reader and its connection
    ///
    /// The connection is released even when closing reports an error.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let outcome = if self.connection.state() == ConnectionState::Open {
            self.connection.close()
        } else {
            Ok(())
        };
        self.connection.release();
        tracing::debug!(data_source = %self.connection.data_source(), "reader closed");
        outcome
    }
}

impl Drop for DataReader {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(err.code = e.code(), err.message = e.message(), "reader close failed");
        }
    }
}

impl std::fmt::Debug for DataReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("columns", &self.columns)
            .field("consumed", &self.consumed)
            .field("closed", &self.closed)
            .finish()
    }
}
