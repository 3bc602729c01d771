use super::{Expr, Value};

/// An `UPDATE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub filter: Option<Expr>,
}

impl Update {
    pub fn new(table: impl Into<String>) -> Update {
        Update {
            table: table.into(),
            assignments: vec![],
            filter: None,
        }
    }

    pub fn set(&mut self, column: impl Into<String>, expr: impl Into<Expr>) -> &mut Self {
        self.assignments.push((column.into(), expr.into()));
        self
    }

    pub fn add_constant(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.set(column, Expr::Value(value.into()))
    }

    pub fn and_filter(&mut self, cond: Expr) -> &mut Self {
        self.filter = Expr::and_opt(self.filter.take(), Some(cond));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub(crate) fn collect_tables(&self, dst: &mut Vec<String>) {
        dst.push(self.table.clone());
        for (_, expr) in &self.assignments {
            expr.collect_tables(dst);
        }
        if let Some(filter) = &self.filter {
            filter.collect_tables(dst);
        }
    }
}
