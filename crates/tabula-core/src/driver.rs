mod capability;
pub use capability::Capability;

mod catalog;
pub use catalog::{DbCheck, DbField, DbForeignKey, DbIndex, DbKey, DbKeyKind, DbTrigger};

mod dialect;
pub use dialect::Dialect;

pub mod operation;
pub use operation::{Operation, Sql, Transaction};

mod response;
pub use response::Response;

use crate::Result;

use std::fmt::Debug;

/// A database the engine can open connections to.
pub trait Driver: Debug + Send + Sync + 'static {
    /// The URL this driver was created from.
    fn url(&self) -> &str;

    /// Describes the database's capability, which informs the SQL serializer
    /// and the lifecycle manager.
    fn capability(&self) -> &'static Capability;

    /// Opens a new connection. One connection serves one engine call.
    fn connect(&self) -> Result<Box<dyn Connection>>;
}

/// An open database connection.
///
/// Besides executing statements, a connection can introspect the live
/// catalog. Catalog names are returned as the database stores them.
pub trait Connection: Debug + Send {
    /// Executes a database operation
    fn exec(&mut self, op: Operation) -> Result<Response>;

    /// Names of all user tables.
    fn db_tables(&mut self) -> Result<Vec<String>>;

    /// Columns of `table`, in declaration order. Empty when the table does
    /// not exist.
    fn db_fields(&mut self, table: &str) -> Result<Vec<DbField>>;

    /// Non-constraint indexes of `table`.
    fn db_indexes(&mut self, table: &str) -> Result<Vec<DbIndex>>;

    /// Primary and unique key constraints of `table`.
    fn db_keys(&mut self, table: &str) -> Result<Vec<DbKey>>;

    /// Foreign keys declared on `table`, or on every table when `None`.
    fn db_foreign_keys(&mut self, table: Option<&str>) -> Result<Vec<DbForeignKey>>;

    /// Check constraints of `table`.
    fn db_checks(&mut self, table: &str) -> Result<Vec<DbCheck>>;

    /// Triggers defined on `table`.
    fn db_triggers(&mut self, table: &str) -> Result<Vec<DbTrigger>>;
}
