use super::{Name, Statement};

use tabula_core::schema::{Check, ForeignKey, Key, OnDelete};

/// A named table constraint, either inline in `CREATE TABLE` or added with
/// `ALTER TABLE ... ADD CONSTRAINT`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConstraint {
    pub name: String,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    ForeignKey {
        fields: Vec<String>,
        ref_table: String,
        /// Empty references the target's primary key.
        ref_fields: Vec<String>,
        on_delete: Option<OnDelete>,
    },
    Check(String),
}

/// `ALTER TABLE <table> ADD CONSTRAINT ...`
#[derive(Debug, Clone)]
pub struct AddConstraint {
    pub table: Name,
    pub constraint: TableConstraint,
}

impl TableConstraint {
    /// Primary or unique key. Returns `None` for plain indexes.
    pub fn from_key(key: &Key) -> Option<TableConstraint> {
        let kind = if key.is_primary() {
            ConstraintKind::PrimaryKey(key.fields.clone())
        } else if key.is_unique_key() {
            ConstraintKind::Unique(key.fields.clone())
        } else {
            return None;
        };
        Some(TableConstraint {
            name: key.name.clone(),
            kind,
        })
    }

    pub fn from_foreign_key(fk: &ForeignKey) -> TableConstraint {
        TableConstraint {
            name: fk.name.clone(),
            kind: ConstraintKind::ForeignKey {
                fields: fk.fields.clone(),
                ref_table: fk.ref_table.clone(),
                ref_fields: fk.ref_fields.clone(),
                on_delete: fk.on_delete,
            },
        }
    }

    pub fn from_check(check: &Check) -> TableConstraint {
        TableConstraint {
            name: check.name.clone(),
            kind: ConstraintKind::Check(check.expression.clone()),
        }
    }
}

impl Statement {
    pub fn add_constraint(table: &str, constraint: TableConstraint) -> Self {
        AddConstraint {
            table: Name::from(table),
            constraint,
        }
        .into()
    }

    /// Adds a primary or unique key. Returns `None` for plain indexes.
    pub fn add_key(table: &str, key: &Key) -> Option<Self> {
        TableConstraint::from_key(key).map(|constraint| Statement::add_constraint(table, constraint))
    }

    pub fn add_foreign_key(table: &str, fk: &ForeignKey) -> Self {
        Statement::add_constraint(table, TableConstraint::from_foreign_key(fk))
    }

    pub fn add_check(table: &str, check: &Check) -> Self {
        Statement::add_constraint(table, TableConstraint::from_check(check))
    }
}

impl From<AddConstraint> for Statement {
    fn from(value: AddConstraint) -> Self {
        Self::AddConstraint(value)
    }
}
