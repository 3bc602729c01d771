use super::Expr;

/// A `DELETE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub filter: Option<Expr>,
}

impl Delete {
    pub fn new(table: impl Into<String>) -> Delete {
        Delete {
            table: table.into(),
            filter: None,
        }
    }

    pub fn and_filter(&mut self, cond: Expr) -> &mut Self {
        self.filter = Expr::and_opt(self.filter.take(), Some(cond));
        self
    }

    pub(crate) fn collect_tables(&self, dst: &mut Vec<String>) {
        dst.push(self.table.clone());
        if let Some(filter) = &self.filter {
            filter.collect_tables(dst);
        }
    }
}
