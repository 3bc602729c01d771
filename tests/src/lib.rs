mod logging_driver;
pub use logging_driver::{LoggingDriver, OpsLog};

pub use std_util::prelude::*;

use std::{path::PathBuf, sync::Arc, sync::Once};
use tabula::{
    db::Builder,
    schema::{
        descriptor::{ColumnDescriptor, FieldDescriptor, TableDescriptor},
        DataType,
    },
    stmt::{Insert, JoinKind, Value},
    Db,
};
use tabula_core::Driver;
use tabula_driver_sqlite::Sqlite;

/// A database handle and the log of what it sent to the driver.
pub struct Test {
    pub db: Db,
    pub log: OpsLog,
}

impl Test {
    /// Builds `builder` over a fresh in-memory database.
    pub fn new(builder: &mut Builder) -> Test {
        Test::with_driver(builder, Arc::new(Sqlite::in_memory().unwrap()))
    }

    pub fn with_driver(builder: &mut Builder, driver: Arc<dyn Driver>) -> Test {
        init_tracing();
        let driver = LoggingDriver::new(driver);
        let log = driver.log();
        let db = builder.build(Arc::new(driver)).unwrap();
        Test { db, log }
    }

    /// Inserts a row through the engine and returns its id.
    pub fn insert(&self, table: &str, values: &[(&str, Value)]) -> i64 {
        let mut insert = Insert::new(table);
        for (column, value) in values {
            insert.add_constant(*column, value.clone());
        }
        self.db.engine().insert_data_with_response(insert).unwrap()
    }
}

/// Logs go to the test writer, filtered by `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A database file under the temp dir, removed if left by an earlier run.
pub fn temp_db(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tabula-{name}-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

pub fn customers() -> TableDescriptor {
    TableDescriptor::new("Customers")
        .field(FieldDescriptor::new("Name", DataType::String).precision(40).not_null())
}

pub fn orders() -> TableDescriptor {
    TableDescriptor::new("Orders")
        .field(FieldDescriptor::new("Customer", DataType::Long).relation("Customers"))
        .field(FieldDescriptor::new("Total", DataType::Decimal).precision(12).scale(2))
}

/// A left join over the relation field `source`.
pub fn join(source: &str, columns: Vec<ColumnDescriptor>) -> ColumnDescriptor {
    ColumnDescriptor::Join {
        name: None,
        source: source.into(),
        join_type: JoinKind::Left,
        hidden: false,
        label: None,
        editable: None,
        columns,
    }
}
