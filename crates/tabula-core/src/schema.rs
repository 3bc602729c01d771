mod check;
pub use check::Check;

mod data_type;
pub use data_type::DataType;

pub mod db;

pub mod descriptor;

mod field;
pub use field::Field;

mod foreign_key;
pub use foreign_key::{ForeignKey, OnDelete};

mod key;
pub use key::{Key, KeyKind};

pub mod name;

mod state;
pub use state::{State, STATE_BITS};

mod table;
pub use table::{
    PhysicalOptions, Table, AUDIT_FIELD, AUDIT_MODE, AUDIT_RECORD, AUDIT_TIME, AUDIT_USER, AUDIT_VALUE,
    DEFAULT_ID_NAME, DEFAULT_VERSION_NAME, LOCALE_FIELD,
};

mod trigger;
pub use trigger::{RelationTarget, Trigger, TriggerBody, TriggerEvent, TriggerScope, TriggerTiming};

/// Normalized registry key of a table or view name.
pub fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
