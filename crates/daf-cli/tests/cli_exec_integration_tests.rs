//! CLI integration tests
//!
//! Run the `daf` binary against a scratch database and inspect the JSON
//! envelope it prints.

use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn setup_test_db(temp_dir: &TempDir) -> PathBuf {
    let db_path = temp_dir.path().join("orders.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            customer TEXT NOT NULL,
            amount INTEGER NOT NULL
        );
        INSERT INTO orders (customer, amount) VALUES ('acme', 100);
        INSERT INTO orders (customer, amount) VALUES ('globex', 250);
        INSERT INTO orders (customer, amount) VALUES ('initech', 75);
        "#,
    )
    .unwrap();
    db_path
}

fn run_cli(db: &Path, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_daf");
    let mut full: Vec<&str> = vec![args[0], "--db", db.to_str().unwrap()];
    full.extend_from_slice(&args[1..]);
    Command::new(cli_bin)
        .args(&full)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI")
}

fn envelope(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a JSON envelope")
}

#[test]
fn test_cli_table_prints_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(
        &db,
        &[
            "table",
            "--sql",
            "SELECT customer, amount FROM orders WHERE amount > @min ORDER BY id",
            "--param",
            "min:int=80",
        ],
    );

    assert!(output.status.success());
    let json = envelope(&output);
    assert_eq!(json["status_code"], 200);
    assert_eq!(json["total"], 2);
    assert_eq!(json["data"][0]["customer"], "acme");
    assert_eq!(json["data"][1]["amount"], 250);
}

#[test]
fn test_cli_view_sorts_and_pages() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(
        &db,
        &[
            "view",
            "--sql",
            "SELECT customer, amount FROM orders",
            "--sort",
            "amount DESC",
            "--page",
            "1",
            "--per-page",
            "2",
        ],
    );

    assert!(output.status.success());
    let json = envelope(&output);
    assert_eq!(json["current_page"], 1);
    assert_eq!(json["items_per_page"], 2);
    assert_eq!(json["total"], 2);
    assert_eq!(json["data"][0]["customer"], "globex");
}

#[test]
fn test_cli_non_query_and_scalar() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(&db, &["non-query", "--sql", "UPDATE orders SET amount = 1"]);
    assert!(output.status.success());
    assert_eq!(envelope(&output)["data"][0]["rows_affected"], 3);

    let output = run_cli(&db, &["scalar", "--sql", "SELECT SUM(amount) FROM orders"]);
    assert_eq!(envelope(&output)["data"][0]["value"], "3");
}

#[test]
fn test_cli_reader_and_procedure() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(
        &db,
        &[
            "reader",
            "--proc",
            "dbo.[BigOrders]",
            "--proc-sql",
            "SELECT id FROM orders WHERE amount >= @floor",
            "--param",
            "floor:int=100",
        ],
    );

    assert!(output.status.success());
    let json = envelope(&output);
    assert_eq!(json["total"], 2);
    assert_eq!(json["data"][1]["id"], 2);
}

#[test]
fn test_cli_identity() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(
        &db,
        &[
            "identity",
            "--sql",
            "INSERT INTO orders (customer, amount) VALUES (@c, 5) RETURNING id",
            "--param",
            "c:text=hooli",
        ],
    );

    assert!(output.status.success());
    assert_eq!(envelope(&output)["data"][0]["identity"], 4);
}

#[test]
fn test_cli_try_non_query_reports_backend_failure() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(&db, &["try-non-query", "--sql", "UPDATE orders SET bogus = 1"]);

    assert!(output.status.success());
    let json = envelope(&output);
    assert_eq!(json["status_code"], 500);
    assert!(json["status_message"].as_str().unwrap().contains("bogus"));
}

#[test]
fn test_cli_non_query_failure_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(&db, &["non-query", "--sql", "UPDATE orders SET bogus = 1"]);

    assert!(!output.status.success());
    assert_eq!(envelope(&output)["status_code"], 500);
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_BACKEND"));
}

#[test]
fn test_cli_rejects_bad_param() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup_test_db(&temp_dir);

    let output = run_cli(&db, &["scalar", "--sql", "SELECT @a", "--param", "a:int=abc"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a valid int"));
}
