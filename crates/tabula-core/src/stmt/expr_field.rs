use super::Expr;

/// A column reference. `source` is the FROM alias (or table name); when it
/// is `None` the name is rendered on its own, as for projection aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExprField {
    pub source: Option<String>,
    pub name: String,
}

impl From<ExprField> for Expr {
    fn from(value: ExprField) -> Self {
        Expr::Field(value)
    }
}
