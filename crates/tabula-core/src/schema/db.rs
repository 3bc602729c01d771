//! Physical table definitions derived from a logical [`Table`](super::Table).
//!
//! A logical table maps to its main table plus optional extension,
//! translation, state and audit satellites. The lifecycle manager compares
//! these definitions with the live catalog and renders DDL from them.

mod column;
pub use column::Column;

mod table;
pub use table::{Table, TableRole};
