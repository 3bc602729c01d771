use super::{Expr, Select, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Expr>),
    Select(Box<Select>),
}

/// An `INSERT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Insert {
        Insert {
            table: table.into(),
            columns: vec![],
            source: InsertSource::Values(vec![]),
        }
    }

    pub fn from_select(table: impl Into<String>, columns: Vec<String>, query: Select) -> Insert {
        Insert {
            table: table.into(),
            columns,
            source: InsertSource::Select(Box::new(query)),
        }
    }

    /// Adds a constant column value. Only valid for `VALUES` inserts.
    pub fn add_constant(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        if let InsertSource::Values(values) = &mut self.source {
            self.columns.push(column.into());
            values.push(Expr::Value(value.into()));
        }
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// The constant bound to `column`, if any.
    pub fn value(&self, column: &str) -> Option<&Value> {
        let InsertSource::Values(values) = &self.source else {
            return None;
        };
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        match values.get(index) {
            Some(Expr::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub(crate) fn collect_tables(&self, dst: &mut Vec<String>) {
        dst.push(self.table.clone());
        match &self.source {
            InsertSource::Values(values) => values.iter().for_each(|e| e.collect_tables(dst)),
            InsertSource::Select(query) => query.collect_tables(dst),
        }
    }
}
