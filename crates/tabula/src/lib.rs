pub mod catalog;
pub use catalog::{ConditionProvider, SchemaCatalog, TableState};

mod config;
pub use config::{EngineConfig, MessageRule};

pub mod db;
pub use db::Db;

mod engine;
pub use engine::{Principal, QueryEngine, ViewRequest};

mod exec;

pub mod id_allocator;
pub use id_allocator::IdAllocator;

mod loader;
pub use loader::{Descriptors, LoadReport, Rejected};

pub mod system;
pub use system::SystemManager;

mod transaction;

pub mod view;
pub use view::View;

pub use tabula_core::{
    driver, event, filter, rowset, schema, stmt, Connection, Driver, Error, Filter, Result, RowSet,
    SimpleRowSet,
};
