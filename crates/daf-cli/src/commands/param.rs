//! `--param name:type=value` parsing

use daf_core::model::{ParamValue, Parameter, SqlType};

/// Parse one `name:type=value` parameter
///
/// The value is everything after the first `=`; `NULL` binds a null of the
/// declared type.
pub fn parse_param(arg: &str) -> Result<Parameter, String> {
    let (head, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name:type=value, got '{}'", arg))?;
    let (name, type_name) = head
        .rsplit_once(':')
        .ok_or_else(|| format!("missing type in '{}'", arg))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", arg));
    }
    let sql_type =
        SqlType::parse(type_name).ok_or_else(|| format!("unknown type '{}'", type_name))?;
    let value = ParamValue::parse_as(sql_type, raw)
        .ok_or_else(|| format!("'{}' is not a valid {} value", raw, sql_type.name()))?;
    Ok(Parameter::input(name, sql_type, value))
}
