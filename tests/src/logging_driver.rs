use parking_lot::Mutex;
use std::sync::Arc;
use tabula_core::{
    driver::{
        DbCheck, DbField, DbForeignKey, DbIndex, DbKey, DbTrigger, Operation, Response, Sql,
    },
    Connection, Driver, Result,
};

/// Every operation executed through a [`LoggingDriver`], in order.
#[derive(Debug, Clone, Default)]
pub struct OpsLog(Arc<Mutex<Vec<Operation>>>);

impl OpsLog {
    pub fn clear(&self) {
        self.0.lock().clear();
    }

    /// Statements run since the last [`clear`](Self::clear), queries and
    /// updates alike.
    pub fn statements(&self) -> Vec<Sql> {
        self.0
            .lock()
            .iter()
            .filter_map(|op| match op {
                Operation::Query(sql) | Operation::Execute(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// DDL batches run since the last [`clear`](Self::clear).
    pub fn batches(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|op| match op {
                Operation::Batch(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Queries whose text contains `needle`.
    pub fn queries_containing(&self, needle: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|op| match op {
                Operation::Query(sql) if sql.text.contains(needle) => Some(sql.text.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Wraps a driver, recording each operation its connections execute.
#[derive(Debug)]
pub struct LoggingDriver {
    inner: Arc<dyn Driver>,
    log: OpsLog,
}

impl LoggingDriver {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            inner: driver,
            log: OpsLog::default(),
        }
    }

    /// Get a handle to access the operations log
    pub fn log(&self) -> OpsLog {
        self.log.clone()
    }
}

impl Driver for LoggingDriver {
    fn url(&self) -> &str {
        self.inner.url()
    }

    fn capability(&self) -> &'static tabula_core::driver::Capability {
        self.inner.capability()
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LoggingConnection {
            inner: self.inner.connect()?,
            log: self.log.clone(),
        }))
    }
}

#[derive(Debug)]
struct LoggingConnection {
    inner: Box<dyn Connection>,
    log: OpsLog,
}

impl Connection for LoggingConnection {
    fn exec(&mut self, op: Operation) -> Result<Response> {
        self.log.0.lock().push(op.clone());
        self.inner.exec(op)
    }

    fn db_tables(&mut self) -> Result<Vec<String>> {
        self.inner.db_tables()
    }

    fn db_fields(&mut self, table: &str) -> Result<Vec<DbField>> {
        self.inner.db_fields(table)
    }

    fn db_indexes(&mut self, table: &str) -> Result<Vec<DbIndex>> {
        self.inner.db_indexes(table)
    }

    fn db_keys(&mut self, table: &str) -> Result<Vec<DbKey>> {
        self.inner.db_keys(table)
    }

    fn db_foreign_keys(&mut self, table: Option<&str>) -> Result<Vec<DbForeignKey>> {
        self.inner.db_foreign_keys(table)
    }

    fn db_checks(&mut self, table: &str) -> Result<Vec<DbCheck>> {
        self.inner.db_checks(table)
    }

    fn db_triggers(&mut self, table: &str) -> Result<Vec<DbTrigger>> {
        self.inner.db_triggers(table)
    }
}
