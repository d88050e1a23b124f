//! Statement plumbing shared by the facade and the reader

use crate::errors::{from_rusqlite, invalid_binding, parameter_mismatch, Result};
use daf_core::model::param::{DATETIME_FORMAT, DATE_FORMAT};
use daf_core::model::{DataColumn, ParamValue, Parameter, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Statement;
use std::time::{Duration, Instant};

/// Virtual machine steps between deadline checks
const PROGRESS_STEPS: i32 = 1_000;

/// Busy wait used when the command timeout is 0 (no limit)
const UNLIMITED_BUSY_MS: u64 = i32::MAX as u64;

/// A parameter value resolved to a statement slot
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    index: usize,
    value: ParamValue,
}

/// Resolve every bound parameter to a slot of `stmt`
///
/// Names are tried as written, then with the `@`, `:` and `$` prefixes.
/// Every slot the statement declares must be supplied.
pub(crate) fn resolve_bindings(stmt: &Statement<'_>, params: &[Parameter]) -> Result<Vec<Binding>> {
    let mut bindings = Vec::new();
    for param in params.iter().filter(|p| p.is_bound()) {
        if !param.value().is_compatible_with(param.sql_type()) {
            return Err(invalid_binding(format!(
                "parameter {} is declared {} but holds a {} value",
                param.name(),
                param.sql_type().name(),
                param.value().kind_name()
            )));
        }
        let index = slot_index(stmt, param.name())?.ok_or_else(|| {
            parameter_mismatch(format!(
                "{} is not a parameter of this statement",
                param.name()
            ))
        })?;
        bindings.push(Binding {
            index,
            value: param.value().clone(),
        });
    }

    for index in 1..=stmt.parameter_count() {
        if !bindings.iter().any(|b| b.index == index) {
            let name = stmt
                .parameter_name(index)
                .map_or_else(|| format!("?{}", index), str::to_string);
            return Err(parameter_mismatch(format!(
                "statement expects parameter {}, which was not supplied",
                name
            )));
        }
    }
    Ok(bindings)
}

fn slot_index(stmt: &Statement<'_>, name: &str) -> Result<Option<usize>> {
    if let Some(index) = stmt.parameter_index(name).map_err(from_rusqlite)? {
        return Ok(Some(index));
    }
    if name.starts_with(['@', ':', '$', '?']) {
        return Ok(None);
    }
    for prefix in ['@', ':', '$'] {
        let candidate = format!("{}{}", prefix, name);
        if let Some(index) = stmt.parameter_index(&candidate).map_err(from_rusqlite)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

pub(crate) fn apply_bindings(stmt: &mut Statement<'_>, bindings: &[Binding]) -> Result<()> {
    for binding in bindings {
        stmt.raw_bind_parameter(binding.index, to_sql_value(&binding.value))
            .map_err(from_rusqlite)?;
    }
    Ok(())
}

fn to_sql_value(value: &ParamValue) -> SqlValue {
    match value {
        ParamValue::Null => SqlValue::Null,
        ParamValue::Text(s) => SqlValue::Text(s.clone()),
        ParamValue::Integer(i) => SqlValue::Integer(*i),
        ParamValue::Real(r) => SqlValue::Real(*r),
        ParamValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        ParamValue::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        ParamValue::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        ParamValue::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

pub(crate) fn columns_of(stmt: &Statement<'_>) -> Vec<DataColumn> {
    stmt.column_names()
        .into_iter()
        .enumerate()
        .map(|(ordinal, name)| DataColumn::new(name, ordinal))
        .collect()
}

pub(crate) fn row_values(row: &rusqlite::Row<'_>, width: usize) -> Result<Vec<Value>> {
    (0..width)
        .map(|i| row.get_ref(i).map(from_value_ref).map_err(from_rusqlite))
        .collect()
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

/// Arm the command timeout on the session
///
/// The busy timeout bounds lock waits; the progress handler interrupts a
/// statement still running at the deadline. 0 disables both limits.
pub(crate) fn arm_timeout(handle: &rusqlite::Connection, timeout_secs: u32) -> Result<()> {
    if timeout_secs == 0 {
        handle
            .busy_timeout(Duration::from_millis(UNLIMITED_BUSY_MS))
            .map_err(from_rusqlite)?;
        handle.progress_handler(0, None::<fn() -> bool>);
        return Ok(());
    }

    let busy_ms = (u64::from(timeout_secs) * 1_000).min(UNLIMITED_BUSY_MS);
    handle
        .busy_timeout(Duration::from_millis(busy_ms))
        .map_err(from_rusqlite)?;

    let deadline = Instant::now() + Duration::from_secs(u64::from(timeout_secs));
    handle.progress_handler(PROGRESS_STEPS, Some(move || Instant::now() >= deadline));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daf_core::model::SqlType;
    use daf_core::ExErrorKind;

    fn conn() -> rusqlite::Connection {
        rusqlite::Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_names_match_with_any_prefix() {
        let conn = conn();
        let stmt = conn.prepare("SELECT @a, :b, $c").unwrap();
        let params = vec![
            Parameter::input("a", SqlType::Int, 1),
            Parameter::input(":b", SqlType::Int, 2),
            Parameter::input("c", SqlType::Int, 3),
        ];
        let bindings = resolve_bindings(&stmt, &params).unwrap();
        let indexes: Vec<usize> = bindings.iter().map(|b| b.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_parameter_is_mismatch() {
        let conn = conn();
        let stmt = conn.prepare("SELECT 1").unwrap();
        let params = vec![Parameter::input("ghost", SqlType::Int, 1)];
        let err = resolve_bindings(&stmt, &params).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ParameterMismatch);
    }

    #[test]
    fn test_missing_parameter_is_mismatch() {
        let conn = conn();
        let stmt = conn.prepare("SELECT @a, @b").unwrap();
        let params = vec![Parameter::input("a", SqlType::Int, 1)];
        let err = resolve_bindings(&stmt, &params).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ParameterMismatch);
        assert!(err.message().contains("@b"));
    }

    #[test]
    fn test_output_parameters_are_not_bound() {
        let conn = conn();
        let stmt = conn.prepare("SELECT @a").unwrap();
        let params = vec![
            Parameter::input("a", SqlType::Int, 1),
            Parameter::output("total", SqlType::Int),
            Parameter::return_value("RETURN_VALUE"),
        ];
        assert_eq!(resolve_bindings(&stmt, &params).unwrap().len(), 1);
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let conn = conn();
        let stmt = conn.prepare("SELECT @a").unwrap();
        let params = vec![Parameter::input("a", SqlType::Int, "seven")];
        let err = resolve_bindings(&stmt, &params).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(err.message().contains("declared int"));
    }

    #[test]
    fn test_bound_values_round_trip_through_sqlite() {
        let conn = conn();
        let mut stmt = conn.prepare("SELECT @t, @d, @b").unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let params = vec![
            Parameter::input("t", SqlType::Text, "x"),
            Parameter::input("d", SqlType::Date, date),
            Parameter::input("b", SqlType::Bit, true),
        ];
        let bindings = resolve_bindings(&stmt, &params).unwrap();
        apply_bindings(&mut stmt, &bindings).unwrap();
        let width = stmt.column_count();
        let mut rows = stmt.raw_query();
        let row = rows.next().unwrap().unwrap();
        let values = row_values(row, width).unwrap();
        assert_eq!(
            values,
            vec![Value::from("x"), Value::from("2024-05-01"), Value::Integer(1)]
        );
    }

    #[test]
    fn test_zero_timeout_disarms() {
        let conn = conn();
        arm_timeout(&conn, 0).unwrap();
        arm_timeout(&conn, 5).unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |r| r.get(0)).unwrap();
        assert_eq!(one, 1);
    }
}
