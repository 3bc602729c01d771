use super::{Expr, Select};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table(String),
    Query(Box<Select>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub on: Expr,

    /// Rendered join key. Two joins with the same key produce the same rows,
    /// so the second one reuses the alias of the first.
    pub key: String,
}

/// One entry of a FROM clause. The first entry of a query has no join.
#[derive(Debug, Clone, PartialEq)]
pub struct From {
    pub source: Source,
    pub alias: Option<String>,
    pub join: Option<Join>,
}

impl From {
    pub fn table_name(&self) -> Option<&str> {
        match &self.source {
            Source::Table(name) => Some(name),
            Source::Query(_) => None,
        }
    }

    /// The name other clauses use to refer to this source.
    pub fn reference(&self) -> Option<&str> {
        self.alias.as_deref().or_else(|| self.table_name())
    }
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}
