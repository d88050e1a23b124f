//! Sortable, filterable projection over a disconnected table

use super::table::{DataColumn, DataTable, RowRef};
use crate::errors::{ExError, ExErrorKind, Result};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One term of a sort expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub ordinal: usize,
    pub direction: SortDirection,
}

type RowFilter = Box<dyn Fn(&RowRef<'_>) -> bool>;

/// A projection of a [`DataTable`] with its own row order and row filter
///
/// With no sort and no filter applied the view yields exactly the table's
/// rows in table order.
pub struct DataView {
    table: DataTable,
    sort: Vec<SortKey>,
    filter: Option<RowFilter>,
    order: Vec<usize>,
}

impl DataView {
    pub fn new(table: DataTable) -> Self {
        let order = (0..table.row_count()).collect();
        Self {
            table,
            sort: Vec::new(),
            filter: None,
            order,
        }
    }

    /// Underlying table, unaffected by sort and filter
    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn columns(&self) -> &[DataColumn] {
        self.table.columns()
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    /// Apply a sort expression such as `"customer ASC, total DESC"`
    ///
    /// An empty expression clears the sort.
    pub fn set_sort(&mut self, expr: &str) -> Result<()> {
        self.sort = parse_sort(&self.table, expr)?;
        self.rebuild();
        Ok(())
    }

    /// Keep only rows for which `predicate` holds
    pub fn set_filter<F>(&mut self, predicate: F)
    where
        F: Fn(&RowRef<'_>) -> bool + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self.rebuild();
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.rebuild();
    }

    /// Number of rows visible through the view
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.table.row(*self.order.get(index)?)
    }

    /// Visible rows in view order
    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        self.order.iter().filter_map(move |i| self.table.row(*i))
    }

    /// Copy the visible rows, in view order, into a new table
    pub fn to_table(&self, name: impl Into<String>) -> DataTable {
        let mut table = DataTable::new(name, self.table.columns().to_vec());
        for row in self.rows() {
            table.push_row(row.values().to_vec());
        }
        table
    }

    fn rebuild(&mut self) {
        let table = &self.table;
        let mut order: Vec<usize> = (0..table.row_count())
            .filter(|i| match (&self.filter, table.row(*i)) {
                (Some(filter), Some(row)) => filter(&row),
                _ => true,
            })
            .collect();

        if !self.sort.is_empty() {
            // Stable sort keeps table order among equal keys.
            order.sort_by(|a, b| {
                let (Some(ra), Some(rb)) = (table.row(*a), table.row(*b)) else {
                    return std::cmp::Ordering::Equal;
                };
                for key in &self.sort {
                    let (va, vb) = (ra.get(key.ordinal), rb.get(key.ordinal));
                    let ord = match (va, vb) {
                        (Some(va), Some(vb)) => va.total_cmp(vb),
                        _ => std::cmp::Ordering::Equal,
                    };
                    let ord = match key.direction {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    };
                    if ord.is_ne() {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }
        self.order = order;
    }
}

fn parse_sort(table: &DataTable, expr: &str) -> Result<Vec<SortKey>> {
    let mut keys = Vec::new();
    for term in expr.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let mut words = term.split_whitespace();
        let column = words.next().unwrap_or_default();
        let direction = match words.next().map(str::to_ascii_uppercase).as_deref() {
            None | Some("ASC") => SortDirection::Ascending,
            Some("DESC") => SortDirection::Descending,
            Some(other) => {
                return Err(invalid_sort(format!(
                    "unknown sort direction '{}' in '{}'",
                    other, term
                )))
            }
        };
        if words.next().is_some() {
            return Err(invalid_sort(format!("malformed sort term '{}'", term)));
        }
        let ordinal = table
            .column_ordinal(column)
            .ok_or_else(|| invalid_sort(format!("unknown sort column '{}'", column)))?;
        keys.push(SortKey { ordinal, direction });
    }
    Ok(keys)
}

fn invalid_sort(message: String) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("set_sort")
        .with_message(message)
}

impl fmt::Debug for DataView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataView")
            .field("table", &self.table.name())
            .field("sort", &self.sort)
            .field("filtered", &self.filter.is_some())
            .field("len", &self.order.len())
            .finish()
    }
}

impl Serialize for DataView {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for row in self.rows() {
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    fn sample() -> DataTable {
        let mut table = DataTable::new(
            "Table",
            vec![DataColumn::new("name", 0), DataColumn::new("qty", 1)],
        );
        table.push_row(vec![Value::from("pear"), Value::Integer(3)]);
        table.push_row(vec![Value::from("apple"), Value::Integer(7)]);
        table.push_row(vec![Value::from("fig"), Value::Null]);
        table.push_row(vec![Value::from("apple"), Value::Integer(1)]);
        table
    }

    fn names(view: &DataView) -> Vec<String> {
        view.rows()
            .map(|r| r.get(0).map(Value::to_text).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_unsorted_view_matches_table() {
        let table = sample();
        let view = DataView::new(table.clone());
        assert_eq!(view.to_table("Table"), table);
    }

    #[test]
    fn test_multi_key_sort() {
        let mut view = DataView::new(sample());
        view.set_sort("name ASC, qty DESC").unwrap();
        assert_eq!(names(&view), vec!["apple", "apple", "fig", "pear"]);
        assert_eq!(view.row(0).and_then(|r| r.get(1)), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_nulls_sort_first() {
        let mut view = DataView::new(sample());
        view.set_sort("qty").unwrap();
        assert_eq!(names(&view)[0], "fig");
    }

    #[test]
    fn test_filter_then_clear() {
        let mut view = DataView::new(sample());
        view.set_filter(|row| row.get_by_name("name") == Some(&Value::from("apple")));
        assert_eq!(view.len(), 2);

        view.clear_filter();
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn test_bad_sort_expressions() {
        let mut view = DataView::new(sample());
        let err = view.set_sort("color").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(view.set_sort("name SIDEWAYS").is_err());
        assert!(view.set_sort("name ASC extra").is_err());
    }

    #[test]
    fn test_empty_sort_clears() {
        let mut view = DataView::new(sample());
        view.set_sort("name").unwrap();
        view.set_sort("").unwrap();
        assert!(view.sort_keys().is_empty());
        assert_eq!(names(&view)[0], "pear");
    }
}
