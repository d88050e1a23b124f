use daf_store::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

/// A scratch database seeded with three orders and an empty notes table
pub struct TestDb {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn connection(&self) -> Connection {
        Connection::file(&self.path)
    }
}

#[allow(dead_code)]
pub fn setup_test_db() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("orders.db");

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            customer TEXT NOT NULL,
            amount INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'open'
        );
        CREATE TABLE notes (
            id INTEGER PRIMARY KEY,
            body TEXT,
            qty INTEGER
        );
        INSERT INTO orders (customer, amount) VALUES ('acme', 100);
        INSERT INTO orders (customer, amount) VALUES ('globex', 250);
        INSERT INTO orders (customer, amount) VALUES ('initech', 75);
        "#,
    )
    .unwrap();

    TestDb { _dir: dir, path }
}
