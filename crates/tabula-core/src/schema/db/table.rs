use super::Column;
use crate::schema::{Check, ForeignKey, Key, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Main,
    Extension,
    Translation,
    State,
    Audit,
}

/// A physical database table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Name of the table
    pub name: String,

    /// Logical table this physical table belongs to.
    pub owner: String,

    pub role: TableRole,

    /// The table's columns
    pub columns: Vec<Column>,

    /// Primary key, unique keys and indexes.
    pub keys: Vec<Key>,

    pub foreign_keys: Vec<ForeignKey>,

    pub checks: Vec<Check>,

    pub triggers: Vec<Trigger>,
}

impl Table {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, role: TableRole) -> Table {
        Table {
            name: name.into(),
            owner: owner.into(),
            role,
            columns: vec![],
            keys: vec![],
            foreign_keys: vec![],
            checks: vec![],
            triggers: vec![],
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&Key> {
        self.keys.iter().find(|key| key.is_primary())
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Key> + '_ {
        self.keys.iter().filter(|key| key.is_index())
    }

    /// Primary and unique keys.
    pub fn constraint_keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.keys.iter().filter(|key| !key.is_index())
    }

    pub(crate) fn add_key(&mut self, key: Key) {
        if !self.keys.iter().any(|k| k.name == key.name) {
            self.keys.push(key);
        }
    }
}
