use super::*;

use tabula_core::schema::Key;

#[derive(Debug, Clone, PartialEq)]
pub enum IndexTarget {
    Columns(Vec<String>),

    /// Dialect expression, emitted verbatim
    Expression(String),
}

#[derive(Debug, Clone)]
pub struct CreateIndex {
    /// Name of the index
    pub name: Name,

    /// Table the index is on
    pub on: Name,

    pub target: IndexTarget,

    /// When true, the index is unique
    pub unique: bool,
}

impl Statement {
    pub fn create_index(table: &str, key: &Key) -> Self {
        let target = match &key.expression {
            Some(expression) => IndexTarget::Expression(expression.clone()),
            None => IndexTarget::Columns(key.fields.clone()),
        };

        CreateIndex {
            name: Name::from(&key.name),
            on: Name::from(table),
            target,
            unique: key.unique,
        }
        .into()
    }
}

impl From<CreateIndex> for Statement {
    fn from(value: CreateIndex) -> Self {
        Self::CreateIndex(value)
    }
}
