#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::setup_test_db;
use daf_core::logging_facility::test_capture::init_test_capture;
use daf_core::TimeoutSetting;
use daf_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_DURATION_MS, FIELD_ERR_CODE, FIELD_TIMEOUT_SECS,
};
use daf_store::{Command, SqlFacade};

// Facade op names are fixed; keep this the only test in this binary.
#[test]
fn test_facade_emits_lifecycle_events() {
    let capture = init_test_capture();
    let db = setup_test_db();
    let conn = db.connection();
    let facade = SqlFacade::new(TimeoutSetting::Fixed(12));

    facade
        .execute_table(&mut Command::new("SELECT * FROM orders", conn.clone()), "T")
        .unwrap();

    assert_eq!(capture.find("execute_table", EVENT_START).len(), 1);
    let end = capture.find("execute_table", EVENT_END);
    assert_eq!(end.len(), 1);
    assert!(end[0].field(FIELD_DURATION_MS).is_some());
    assert_eq!(end[0].field(FIELD_TIMEOUT_SECS), Some("12"));

    facade
        .execute_non_query(&mut Command::new("DELETE FROM missing", conn))
        .unwrap_err();

    let errors = capture.find("execute_non_query", EVENT_END_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field(FIELD_ERR_CODE), Some("ERR_BACKEND"));
    assert!(capture.find("execute_non_query", EVENT_END).is_empty());
}
