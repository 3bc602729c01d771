//! Live catalog records returned by [`Connection`](super::Connection)
//! introspection.

/// A column as the database reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbField {
    pub name: String,

    /// Declared type, as written in the catalog (e.g. `VARCHAR(20)`).
    pub ty: String,

    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbIndex {
    pub name: String,
    pub table: String,
    pub unique: bool,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKeyKind {
    Primary,
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbKey {
    pub name: String,
    pub table: String,
    pub kind: DbKeyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbForeignKey {
    pub name: String,
    pub table: String,
    pub ref_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCheck {
    pub name: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTrigger {
    pub name: String,
    pub table: String,
}
