mod catalog;

mod value;
pub(crate) use value::Value;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use rusqlite::Connection as RusqliteConnection;
use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tabula_core::{
    driver::{
        operation::{Operation, Sql, Transaction},
        Capability, DbCheck, DbField, DbForeignKey, DbIndex, DbKey, DbTrigger, Driver, Response,
    },
    Error, Result,
};
use url::Url;

/// How long a connection waits for a lock held by another connection to the
/// same database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Sqlite {
    url: String,
    storage: Storage,
}

#[derive(Debug)]
enum Storage {
    File(PathBuf),

    /// An in-memory database lives as long as its only connection. Callers
    /// take turns on it: a `Connection` holds it exclusively until dropped.
    InMemory(Arc<Mutex<RusqliteConnection>>),
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::driver_operation_failed)?;

        if url.scheme() != "sqlite" {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `sqlite` scheme; url={}",
                url_str
            )));
        }

        if url.path() == ":memory:" {
            Self::in_memory()
        } else {
            Ok(Self::open(url.path()))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Result<Self> {
        let connection =
            RusqliteConnection::open_in_memory().map_err(Error::driver_operation_failed)?;
        prepare(&connection)?;

        Ok(Self {
            url: "sqlite::memory:".to_string(),
            storage: Storage::InMemory(Arc::new(Mutex::new(connection))),
        })
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            url: format!("sqlite:{}", path.display()),
            storage: Storage::File(path),
        }
    }
}

impl Driver for Sqlite {
    fn url(&self) -> &str {
        &self.url
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    fn connect(&self) -> Result<Box<dyn tabula_core::Connection>> {
        let connection = match &self.storage {
            Storage::File(path) => Connection::open(path)?,
            Storage::InMemory(shared) => Connection {
                connection: Handle::Shared(shared.lock_arc()),
            },
        };
        Ok(Box::new(connection))
    }
}

/// Per connection settings. Rebuilds rename tables while other tables still
/// reference them by name, so renames must not rewrite those references.
fn prepare(connection: &RusqliteConnection) -> Result<()> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON; PRAGMA legacy_alter_table = ON;")
        .map_err(Error::driver_operation_failed)
}

#[derive(Debug)]
pub struct Connection {
    connection: Handle,
}

enum Handle {
    Owned(RusqliteConnection),
    Shared(ArcMutexGuard<RawMutex, RusqliteConnection>),
}

impl Deref for Handle {
    type Target = RusqliteConnection;

    fn deref(&self) -> &RusqliteConnection {
        match self {
            Handle::Owned(connection) => connection,
            Handle::Shared(guard) => guard,
        }
    }
}

impl DerefMut for Handle {
    fn deref_mut(&mut self) -> &mut RusqliteConnection {
        match self {
            Handle::Owned(connection) => connection,
            Handle::Shared(guard) => guard,
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::Owned(_) => f.write_str("Owned"),
            Handle::Shared(_) => f.write_str("Shared"),
        }
    }
}

impl Connection {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection =
            RusqliteConnection::open(path).map_err(Error::driver_operation_failed)?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(Error::driver_operation_failed)?;
        prepare(&connection)?;

        Ok(Self {
            connection: Handle::Owned(connection),
        })
    }

    fn query(&mut self, sql: &Sql) -> Result<Response> {
        let mut stmt = self
            .connection
            .prepare_cached(&sql.text)
            .map_err(Error::driver_operation_failed)?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let params = sql.params.iter().cloned().map(Value::from).collect::<Vec<_>>();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver_operation_failed)?;

        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(Error::driver_operation_failed)? {
            let mut items = Vec::with_capacity(width);
            for index in 0..width {
                items.push(Value::from_sql(row, index)?.into_inner());
            }
            ret.push(items);
        }

        Ok(Response::Rows { columns, rows: ret })
    }

    fn execute(&mut self, sql: &Sql) -> Result<Response> {
        let mut stmt = self
            .connection
            .prepare_cached(&sql.text)
            .map_err(Error::driver_operation_failed)?;

        let params = sql.params.iter().cloned().map(Value::from).collect::<Vec<_>>();
        let count = stmt
            .execute(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver_operation_failed)?;

        Ok(Response::count(count as _))
    }
}

impl tabula_core::driver::Connection for Connection {
    fn exec(&mut self, op: Operation) -> Result<Response> {
        tracing::debug!(sql = op.text(), "sqlite exec");

        match op {
            Operation::Query(sql) => self.query(&sql),
            Operation::Execute(sql) => self.execute(&sql),
            Operation::Batch(text) => {
                self.connection
                    .execute_batch(&text)
                    .map_err(Error::driver_operation_failed)?;
                Ok(Response::count(0))
            }
            Operation::Transaction(op) => {
                // Take the write lock up front so that two writers never
                // deadlock upgrading their read locks.
                let sql = match op {
                    Transaction::Start => "BEGIN IMMEDIATE",
                    Transaction::Commit => "COMMIT",
                    Transaction::Rollback => "ROLLBACK",
                };
                self.connection
                    .execute_batch(sql)
                    .map_err(Error::driver_operation_failed)?;
                Ok(Response::count(0))
            }
        }
    }

    fn db_tables(&mut self) -> Result<Vec<String>> {
        catalog::tables(&self.connection)
    }

    fn db_fields(&mut self, table: &str) -> Result<Vec<DbField>> {
        catalog::fields(&self.connection, table)
    }

    fn db_indexes(&mut self, table: &str) -> Result<Vec<DbIndex>> {
        catalog::indexes(&self.connection, table)
    }

    fn db_keys(&mut self, table: &str) -> Result<Vec<DbKey>> {
        catalog::keys(&self.connection, table)
    }

    fn db_foreign_keys(&mut self, table: Option<&str>) -> Result<Vec<DbForeignKey>> {
        match table {
            Some(table) => catalog::foreign_keys(&self.connection, table),
            None => {
                let mut ret = vec![];
                for table in catalog::tables(&self.connection)? {
                    ret.extend(catalog::foreign_keys(&self.connection, &table)?);
                }
                Ok(ret)
            }
        }
    }

    fn db_checks(&mut self, table: &str) -> Result<Vec<DbCheck>> {
        catalog::checks(&self.connection, table)
    }

    fn db_triggers(&mut self, table: &str) -> Result<Vec<DbTrigger>> {
        catalog::triggers(&self.connection, table)
    }
}
