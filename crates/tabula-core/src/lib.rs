pub mod driver;
pub use driver::{Connection, Driver};

mod error;
pub use error::Error;

pub mod event;

pub mod filter;
pub use filter::Filter;

pub mod rowset;
pub use rowset::{RowSet, SimpleRowSet};

pub mod schema;

pub mod stmt;

/// A Result type alias that uses Tabula's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
