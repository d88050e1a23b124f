//! Parameter and result-shape models
//!
//! Parameters describe what a command binds; values, tables and views
//! describe what comes back. None of these types hold a connection.

pub mod param;
pub mod table;
pub mod value;
pub mod view;

pub use param::{ParamDirection, ParamValue, Parameter, SqlType};
pub use table::{DataColumn, DataTable, RowRef};
pub use value::Value;
pub use view::{DataView, SortDirection, SortKey};
