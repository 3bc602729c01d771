use crate::{
    schema::DataType,
    stmt::{Aggregate, JoinKind},
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    pub name: String,

    #[serde(default)]
    pub module: Option<String>,

    pub source: String,

    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,

    /// Explicit row grouping. A grouped view is read-only.
    #[serde(default)]
    pub group_by: Vec<String>,

    /// Filter expression, see [`Filter::parse`](crate::Filter::parse).
    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default)]
    pub order: Vec<OrderDescriptor>,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub cache: Option<CacheHints>,

    #[serde(default)]
    pub edit_form: Option<String>,

    #[serde(default)]
    pub new_row_form: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnDescriptor {
    /// A field of the table in scope.
    Simple {
        name: String,
        source: String,
        #[serde(default)]
        locale: Option<String>,
        #[serde(default)]
        aggregate: Option<Aggregate>,
        #[serde(default)]
        hidden: bool,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        editable: Option<bool>,
    },

    /// Follows the relation field `source` to its target table. Nested
    /// columns read the target table.
    Join {
        #[serde(default)]
        name: Option<String>,
        source: String,
        #[serde(default)]
        join_type: JoinKind,
        #[serde(default)]
        hidden: bool,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        editable: Option<bool>,
        columns: Vec<ColumnDescriptor>,
    },

    /// Joins `table` whose field `source` points back at the table in scope.
    ExternalJoin {
        table: String,
        source: String,
        #[serde(default)]
        join_type: JoinKind,
        columns: Vec<ColumnDescriptor>,
    },

    /// The id of the table in scope.
    Id {
        name: String,
        #[serde(default)]
        aggregate: Option<Aggregate>,
        #[serde(default)]
        hidden: bool,
        #[serde(default)]
        label: Option<String>,
    },

    /// A computed column.
    Expression {
        name: String,
        expression: ExpressionDescriptor,
        #[serde(rename = "type", default)]
        ty: Option<DataType>,
        #[serde(default)]
        precision: Option<u32>,
        #[serde(default)]
        scale: Option<u32>,
        #[serde(default)]
        aggregate: Option<Aggregate>,
        #[serde(default)]
        hidden: bool,
        #[serde(default)]
        label: Option<String>,
    },

    /// An aggregate over all rows of a group, `COUNT(*)` style.
    Aggregate {
        name: String,
        aggregate: Aggregate,
        #[serde(default)]
        label: Option<String>,
    },
}

/// Typed expression tree of a computed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionDescriptor {
    /// A column of this view, or a field of the source table.
    Name(String),
    Number(f64),
    String(String),
    Plus(Vec<ExpressionDescriptor>),
    Minus(Vec<ExpressionDescriptor>),
    Multiply(Vec<ExpressionDescriptor>),
    Divide(Vec<ExpressionDescriptor>),
    Concat(Vec<ExpressionDescriptor>),
    Nvl(Vec<ExpressionDescriptor>),
    Cast {
        expression: Box<ExpressionDescriptor>,
        #[serde(rename = "type")]
        ty: DataType,
        #[serde(default)]
        precision: Option<u32>,
        #[serde(default)]
        scale: Option<u32>,
    },
    Case {
        #[serde(default)]
        operand: Option<Box<ExpressionDescriptor>>,
        whens: Vec<WhenDescriptor>,
        #[serde(default)]
        otherwise: Option<Box<ExpressionDescriptor>>,
    },
    Bulk(Vec<ExpressionDescriptor>),

    /// SQL text with `"Column"` references substituted.
    Macro(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenDescriptor {
    pub when: ExpressionDescriptor,
    pub then: ExpressionDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDescriptor {
    pub column: String,

    #[serde(default)]
    pub desc: bool,
}

/// Client cache sizing. Carried through for consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHints {
    #[serde(default)]
    pub maximum_size: Option<u32>,

    #[serde(default)]
    pub eviction: Option<String>,
}

impl ViewDescriptor {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> ViewDescriptor {
        ViewDescriptor {
            name: name.into(),
            module: None,
            source: source.into(),
            columns: vec![],
            group_by: vec![],
            filter: None,
            order: vec![],
            read_only: false,
            cache: None,
            edit_form: None,
            new_row_form: None,
        }
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }
}

impl ColumnDescriptor {
    pub fn simple(name: impl Into<String>, source: impl Into<String>) -> ColumnDescriptor {
        ColumnDescriptor::Simple {
            name: name.into(),
            source: source.into(),
            locale: None,
            aggregate: None,
            hidden: false,
            label: None,
            editable: None,
        }
    }

    pub fn expression(name: impl Into<String>, expression: ExpressionDescriptor) -> ColumnDescriptor {
        ColumnDescriptor::Expression {
            name: name.into(),
            expression,
            ty: None,
            precision: None,
            scale: None,
            aggregate: None,
            hidden: false,
            label: None,
        }
    }
}
