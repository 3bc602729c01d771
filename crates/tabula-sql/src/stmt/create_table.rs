use super::*;

use tabula_core::{driver::Capability, schema::db::Table};

#[derive(Debug, Clone)]
pub struct CreateTable {
    /// Name of the table
    pub name: Name,

    /// Column definitions
    pub columns: Vec<ColumnDef>,

    /// Constraints declared inline. Only populated for databases that
    /// cannot add constraints to an existing table.
    pub constraints: Vec<TableConstraint>,
}

impl Statement {
    pub fn create_table(table: &Table, capability: &Capability) -> Self {
        Statement::create_table_named(&table.name, table, capability)
    }

    /// Creates a table with the structure of `table` under another name.
    /// Used to build the backup copy during a rebuild.
    pub fn create_table_named(name: &str, table: &Table, capability: &Capability) -> Self {
        let constraints = if capability.inline_constraints {
            table
                .keys
                .iter()
                .filter_map(TableConstraint::from_key)
                .chain(table.foreign_keys.iter().map(TableConstraint::from_foreign_key))
                .chain(table.checks.iter().map(TableConstraint::from_check))
                .collect()
        } else {
            vec![]
        };

        CreateTable {
            name: Name::from(name),
            columns: table.columns.iter().map(ColumnDef::from_schema).collect(),
            constraints,
        }
        .into()
    }
}

impl From<CreateTable> for Statement {
    fn from(value: CreateTable) -> Self {
        Self::CreateTable(value)
    }
}
