use super::*;

/// Drops a foreign key constraint. Not available on SQLite, where foreign
/// keys live and die with their table.
#[derive(Debug, Clone)]
pub struct DropForeignKey {
    pub table: Name,
    pub name: Name,
}

impl Statement {
    pub fn drop_foreign_key(table: &str, name: &str) -> Self {
        DropForeignKey {
            table: Name::from(table),
            name: Name::from(name),
        }
        .into()
    }
}

impl From<DropForeignKey> for Statement {
    fn from(value: DropForeignKey) -> Self {
        Self::DropForeignKey(value)
    }
}
