//! Disconnected tables

use super::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A result-set column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataColumn {
    pub name: String,
    pub ordinal: usize,
}

impl DataColumn {
    pub fn new(name: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }
}

/// Borrowed view of one row together with its column metadata
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [DataColumn],
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn new(columns: &'a [DataColumn], values: &'a [Value]) -> Self {
        Self { columns, values }
    }

    /// Value at a column ordinal
    pub fn get(&self, ordinal: usize) -> Option<&'a Value> {
        self.values.get(ordinal)
    }

    /// Value of the first column with this name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&'a Value> {
        let ordinal = column_ordinal(self.columns, name)?;
        self.values.get(ordinal)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn columns(&self) -> &'a [DataColumn] {
        self.columns
    }
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in self.columns {
            let value = self.values.get(column.ordinal).unwrap_or(&Value::Null);
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}

pub(crate) fn column_ordinal(columns: &[DataColumn], name: &str) -> Option<usize> {
    columns
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .map(|c| c.ordinal)
}

/// In-memory snapshot of a full result set, independent of any connection
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    name: String,
    columns: Vec<DataColumn>,
    rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new(name: impl Into<String>, columns: Vec<DataColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    pub fn column_ordinal(&self, name: &str) -> Option<usize> {
        column_ordinal(&self.columns, name)
    }

    /// Append a row; short rows are padded with nulls
    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(values);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows
            .get(index)
            .map(|values| RowRef::new(&self.columns, values))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        self.rows
            .iter()
            .map(move |values| RowRef::new(&self.columns, values))
    }

    /// Cell lookup by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.row(row)?.get_by_name(column)
    }
}

impl Serialize for DataTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<RowRef<'_>> = self.rows().collect();
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("columns", &self.columns)?;
        map.serialize_entry("rows", &rows)?;
        map.end()
    }
}
