//! Command parameters
//!
//! A parameter's value is a tagged variant. Each variant knows how it is
//! rendered in a diagnostic trace line and which declared types accept it.

use chrono::{NaiveDate, NaiveDateTime};

/// Declared backend type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Char,
    Int,
    BigInt,
    Real,
    Decimal,
    Bit,
    Date,
    DateTime,
    Blob,
}

impl SqlType {
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Text => "text",
            SqlType::Char => "char",
            SqlType::Int => "int",
            SqlType::BigInt => "bigint",
            SqlType::Real => "real",
            SqlType::Decimal => "decimal",
            SqlType::Bit => "bit",
            SqlType::Date => "date",
            SqlType::DateTime => "datetime",
            SqlType::Blob => "blob",
        }
    }

    /// Parse a declared type name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        let t = match name.to_ascii_lowercase().as_str() {
            "text" | "varchar" | "nvarchar" | "string" => SqlType::Text,
            "char" | "nchar" => SqlType::Char,
            "int" | "integer" => SqlType::Int,
            "bigint" => SqlType::BigInt,
            "real" | "float" | "double" => SqlType::Real,
            "decimal" | "numeric" => SqlType::Decimal,
            "bit" | "bool" | "boolean" => SqlType::Bit,
            "date" => SqlType::Date,
            "datetime" | "timestamp" => SqlType::DateTime,
            "blob" | "binary" | "varbinary" => SqlType::Blob,
            _ => return None,
        };
        Some(t)
    }
}

/// Direction of a parameter relative to the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// Value bound to a parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Blob(Vec<u8>),
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl ParamValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Text(_) => "text",
            ParamValue::Integer(_) => "integer",
            ParamValue::Real(_) => "real",
            ParamValue::Bool(_) => "bool",
            ParamValue::Date(_) => "date",
            ParamValue::DateTime(_) => "datetime",
            ParamValue::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Render for a diagnostic trace line
    ///
    /// Text and date kinds are wrapped in single quotes as they are, null is
    /// the bare word `NULL`.
    pub fn render_trace(&self) -> String {
        match self {
            ParamValue::Null => "NULL".to_string(),
            ParamValue::Text(s) => format!("'{}'", s),
            ParamValue::Date(d) => format!("'{}'", d.format(DATE_FORMAT)),
            ParamValue::DateTime(dt) => format!("'{}'", dt.format(DATETIME_FORMAT)),
            ParamValue::Integer(i) => i.to_string(),
            ParamValue::Real(r) => r.to_string(),
            ParamValue::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            ParamValue::Blob(bytes) => format!("0x{}", hex::encode(bytes)),
        }
    }

    /// Whether this value may be bound to a parameter declared as `sql_type`
    pub fn is_compatible_with(&self, sql_type: SqlType) -> bool {
        match (self, sql_type) {
            (ParamValue::Null, _) => true,
            (ParamValue::Text(_), SqlType::Text | SqlType::Char) => true,
            (ParamValue::Integer(i), SqlType::Int) => i32::try_from(*i).is_ok(),
            (ParamValue::Integer(_), SqlType::BigInt | SqlType::Real | SqlType::Decimal) => true,
            (ParamValue::Integer(i), SqlType::Bit) => *i == 0 || *i == 1,
            (ParamValue::Real(_), SqlType::Real | SqlType::Decimal) => true,
            (ParamValue::Bool(_), SqlType::Bit) => true,
            (ParamValue::Date(_), SqlType::Date | SqlType::DateTime) => true,
            (ParamValue::DateTime(_), SqlType::DateTime) => true,
            (ParamValue::Blob(_), SqlType::Blob) => true,
            _ => false,
        }
    }

    /// Parse CLI-style literal text into a value of the declared type
    ///
    /// The literal `NULL` (any case) is the null value for every type.
    pub fn parse_as(sql_type: SqlType, raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("null") {
            return Some(ParamValue::Null);
        }
        let value = match sql_type {
            SqlType::Text | SqlType::Char => ParamValue::Text(raw.to_string()),
            SqlType::Int | SqlType::BigInt => ParamValue::Integer(raw.parse().ok()?),
            SqlType::Real | SqlType::Decimal => ParamValue::Real(raw.parse().ok()?),
            SqlType::Bit => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" => ParamValue::Bool(true),
                "0" | "false" => ParamValue::Bool(false),
                _ => return None,
            },
            SqlType::Date => ParamValue::Date(NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()?),
            SqlType::DateTime => ParamValue::DateTime(
                NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
                    .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
                    .ok()?,
            ),
            SqlType::Blob => ParamValue::Blob(hex::decode(raw.trim_start_matches("0x")).ok()?),
        };
        Some(value)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Integer(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Real(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(v: NaiveDate) -> Self {
        ParamValue::Date(v)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(v: NaiveDateTime) -> Self {
        ParamValue::DateTime(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        ParamValue::Blob(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

/// A named command parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    sql_type: SqlType,
    direction: ParamDirection,
    value: ParamValue,
}

impl Parameter {
    /// An input parameter
    pub fn input(name: impl Into<String>, sql_type: SqlType, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            sql_type,
            direction: ParamDirection::Input,
            value: value.into(),
        }
    }

    /// An output parameter; starts out null
    pub fn output(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            direction: ParamDirection::Output,
            value: ParamValue::Null,
        }
    }

    /// The statement's return value slot
    pub fn return_value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: SqlType::Int,
            direction: ParamDirection::ReturnValue,
            value: ParamValue::Null,
        }
    }

    pub fn with_direction(mut self, direction: ParamDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn direction(&self) -> ParamDirection {
        self.direction
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<ParamValue>) {
        self.value = value.into();
    }

    /// Whether the value is sent to the backend
    pub fn is_bound(&self) -> bool {
        matches!(
            self.direction,
            ParamDirection::Input | ParamDirection::InputOutput
        )
    }

    /// `name=value` fragment of a trace line
    pub fn render_trace(&self) -> String {
        format!("{}={}", self.name, self.value.render_trace())
    }
}
