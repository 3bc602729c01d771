//! Declarative table and view descriptions.
//!
//! Descriptors are JSON documents. A module ships defaults and an
//! installation may override them locally; [`merge`] folds the local layer
//! onto the module layer before deserializing.

mod dialect_text;
pub use dialect_text::DialectText;

mod merge;
pub use merge::merge;

mod table;
pub use table::{
    ConstraintDescriptor, FieldDescriptor, IndexDescriptor, TableDescriptor, TriggerDescriptor,
};

mod view;
pub use view::{
    CacheHints, ColumnDescriptor, ExpressionDescriptor, OrderDescriptor, ViewDescriptor,
    WhenDescriptor,
};

use crate::Result;

use serde::de::DeserializeOwned;

/// Parses a descriptor from a module layer and an optional local layer.
pub fn from_layers<T: DeserializeOwned>(module: &str, local: Option<&str>) -> Result<T> {
    let mut value: serde_json::Value = serde_json::from_str(module)?;
    if let Some(local) = local {
        merge(&mut value, serde_json::from_str(local)?);
    }
    Ok(serde_json::from_value(value)?)
}
