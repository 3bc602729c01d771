//! Row predicates over view columns.
//!
//! A [`Filter`] names view columns, not physical fields; the view compiler
//! turns it into a SQL condition.

mod parse;

use crate::stmt::Value;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Starts,
    Contains,
    Ends,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column op value`. Several values OR together for `EQ` and AND
    /// together for every other operator.
    ColumnValue {
        column: String,
        op: Operator,
        values: Vec<Value>,
    },

    /// `column op other`
    ColumnColumn {
        column: String,
        op: Operator,
        other: String,
    },

    ColumnIsNull(String),

    ColumnNotNull(String),

    /// Compares the row id.
    Id { op: Operator, ids: Vec<i64> },

    /// Compares the row version.
    Version { op: Operator, value: i64 },

    Compound {
        kind: Compound,
        filters: Vec<Filter>,
    },

    True,

    False,

    /// `column` is among the `in_column` values of the rows of `in_view`
    /// matching `in_filter`.
    ColumnIn {
        column: String,
        in_view: String,
        in_column: String,
        in_filter: Option<Box<Filter>>,
    },

    /// A predicate built by the condition provider registered under `key`.
    Custom { key: String, args: Vec<String> },
}

impl Filter {
    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Filter {
        Filter::ColumnValue {
            column: column.into(),
            op,
            values: vec![value.into()],
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::compare(column, Operator::Eq, value)
    }

    pub fn any_of(column: impl Into<String>, values: Vec<Value>) -> Filter {
        Filter::ColumnValue {
            column: column.into(),
            op: Operator::Eq,
            values,
        }
    }

    pub fn compare_columns(column: impl Into<String>, op: Operator, other: impl Into<String>) -> Filter {
        Filter::ColumnColumn {
            column: column.into(),
            op,
            other: other.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Filter {
        Filter::ColumnIsNull(column.into())
    }

    pub fn not_null(column: impl Into<String>) -> Filter {
        Filter::ColumnNotNull(column.into())
    }

    pub fn id_in(ids: Vec<i64>) -> Filter {
        Filter::Id {
            op: Operator::In,
            ids,
        }
    }

    pub fn compare_id(op: Operator, id: i64) -> Filter {
        Filter::Id { op, ids: vec![id] }
    }

    pub fn compare_version(op: Operator, value: i64) -> Filter {
        Filter::Version { op, value }
    }

    pub fn in_view(
        column: impl Into<String>,
        in_view: impl Into<String>,
        in_column: impl Into<String>,
        in_filter: Option<Filter>,
    ) -> Filter {
        Filter::ColumnIn {
            column: column.into(),
            in_view: in_view.into(),
            in_column: in_column.into(),
            in_filter: in_filter.map(Box::new),
        }
    }

    pub fn custom(key: impl Into<String>, args: Vec<String>) -> Filter {
        Filter::Custom {
            key: key.into(),
            args,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Filter {
        Filter::compound(Compound::And, filters)
    }

    pub fn or(filters: Vec<Filter>) -> Filter {
        Filter::compound(Compound::Or, filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Filter {
        Filter::Compound {
            kind: Compound::Not,
            filters: vec![filter],
        }
    }

    /// ANDs two optional filters.
    pub fn and_opt(lhs: Option<Filter>, rhs: Option<Filter>) -> Option<Filter> {
        match (lhs, rhs) {
            (None, rhs) => rhs,
            (lhs, None) => lhs,
            (Some(lhs), Some(rhs)) => Some(Filter::and(vec![lhs, rhs])),
        }
    }

    fn compound(kind: Compound, filters: Vec<Filter>) -> Filter {
        let mut flat = vec![];
        for filter in filters {
            match filter {
                Filter::Compound { kind: inner, filters } if inner == kind => flat.extend(filters),
                filter => flat.push(filter),
            }
        }
        if flat.len() == 1 {
            if let Some(filter) = flat.pop() {
                return filter;
            }
        }
        Filter::Compound {
            kind,
            filters: flat,
        }
    }

    /// Whether the filter reads `column`, compared case-insensitively.
    pub fn involves_column(&self, column: &str) -> bool {
        let mut found = false;
        self.visit_columns(&mut |name| found |= name.eq_ignore_ascii_case(column));
        found
    }

    /// Every column name the filter reads, without duplicates.
    pub fn columns(&self) -> Vec<String> {
        let mut names: Vec<String> = vec![];
        self.visit_columns(&mut |name| {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        });
        names
    }

    fn visit_columns(&self, f: &mut impl FnMut(&str)) {
        match self {
            Filter::ColumnValue { column, .. }
            | Filter::ColumnIsNull(column)
            | Filter::ColumnNotNull(column)
            | Filter::ColumnIn { column, .. } => f(column),
            Filter::ColumnColumn { column, other, .. } => {
                f(column);
                f(other);
            }
            Filter::Compound { filters, .. } => {
                for filter in filters {
                    filter.visit_columns(f);
                }
            }
            Filter::Id { .. }
            | Filter::Version { .. }
            | Filter::True
            | Filter::False
            | Filter::Custom { .. } => {}
        }
    }
}
