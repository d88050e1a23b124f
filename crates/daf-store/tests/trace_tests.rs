#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::setup_test_db;
use daf_core::errors::{ExError, ExErrorKind};
use daf_core::model::{ParamValue, Parameter, SqlType};
use daf_core::trace::{DiagnosticTracer, MemoryTraceSink, TraceSink};
use daf_core::TimeoutSetting;
use daf_core_types::RequestId;
use daf_store::{Command, ConnectionState, SqlFacade};
use std::sync::Arc;

#[test]
fn test_trace_renders_null_unquoted() {
    // Given: a labelled insert with a NULL text and an integer parameter
    let db = setup_test_db();
    let conn = db.connection();
    let sink = Arc::new(MemoryTraceSink::new());
    let tracer = DiagnosticTracer::new(sink.clone());
    let request_id = tracer.request_id().clone();
    let facade = SqlFacade::new(TimeoutSetting::default()).with_tracer(tracer);

    let mut cmd = Command::new("INSERT INTO notes (body, qty) VALUES (@P1, @P2)", conn.clone())
        .with_param(Parameter::input("P1", SqlType::Text, ParamValue::Null))
        .with_param(Parameter::input("P2", SqlType::Int, 42))
        .with_param(Parameter::return_value("RETURN_VALUE"))
        .with_trace_label("insert-order");

    // When: it runs
    let message = facade.execute_non_query_capturing_error(&mut cmd).unwrap();

    // Then: the insert succeeded and the trace line was recorded
    assert_eq!(message, "");
    let line = sink.latest(&request_id).unwrap();
    assert!(line.starts_with("EXECUTE INSERT INTO notes (body, qty) VALUES (@P1, @P2) "));
    assert!(line.contains("P1=NULL"));
    assert!(line.contains("P2=42"));
    assert!(!line.contains("'NULL'"));
    assert!(!line.contains("RETURN_VALUE"));
    assert!(line.ends_with("insert-order"));
}

#[test]
fn test_trace_names_database_and_server() {
    let db = setup_test_db();
    let conn = db.connection();
    let sink = Arc::new(MemoryTraceSink::new());
    let tracer = DiagnosticTracer::new(sink.clone());
    let request_id = tracer.request_id().clone();
    let facade = SqlFacade::new(TimeoutSetting::default()).with_tracer(tracer);

    let mut cmd = Command::new("SELECT COUNT(*) FROM orders", conn.clone());
    facade.execute_scalar_text(&mut cmd).unwrap();

    let line = sink.latest(&request_id).unwrap();
    let expected = format!(
        "EXECUTE SELECT COUNT(*) FROM orders  orders {} execute_scalar_text",
        db.path.display()
    );
    assert_eq!(line, expected);
}

struct FailingSink;

impl TraceSink for FailingSink {
    fn write(&self, _: &RequestId, _: &str) -> daf_core::Result<()> {
        Err(ExError::new(ExErrorKind::Io).with_message("sink offline"))
    }
}

#[test]
fn test_failing_sink_does_not_fail_operation() {
    let db = setup_test_db();
    let conn = db.connection();
    let facade = SqlFacade::new(TimeoutSetting::default())
        .with_tracer(DiagnosticTracer::new(Arc::new(FailingSink)));

    let mut cmd = Command::new("UPDATE orders SET amount = amount + 1", conn.clone());

    assert_eq!(facade.execute_non_query(&mut cmd).unwrap(), 3);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[test]
fn test_errors_carry_request_id() {
    let db = setup_test_db();
    let conn = db.connection();
    let tracer = DiagnosticTracer::new(Arc::new(MemoryTraceSink::new()));
    let request_id = tracer.request_id().clone();
    let facade = SqlFacade::new(TimeoutSetting::default()).with_tracer(tracer);

    let mut cmd = Command::new("SELECT * FROM nowhere", conn);
    let err = facade.execute_table(&mut cmd, "T").unwrap_err();

    assert_eq!(err.request_id(), Some(&request_id));
}
