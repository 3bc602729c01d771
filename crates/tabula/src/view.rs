//! Compiled views.
//!
//! A [`View`] is the query-ready form of a
//! [`ViewDescriptor`](tabula_core::schema::descriptor::ViewDescriptor): every
//! column resolved to a SQL expression over the source table and its joins,
//! plus a base `SELECT` carrying those joins and the grouping.

mod compile;
pub use compile::ViewCompiler;

mod condition;

mod expr;

mod query;

use crate::Result;

use indexmap::IndexMap;
use tabula_core::{
    rowset::ColumnInfo,
    schema::{descriptor::CacheHints, normalize, DataType},
    stmt::{Aggregate, Expr, Select},
    Error, Filter,
};

/// One sort key of a view query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub desc: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Order {
        Order {
            column: column.into(),
            desc: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Order {
        Order {
            column: column.into(),
            desc: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewColumn {
    pub name: String,

    pub label: Option<String>,

    /// Expression selected for this column, aggregate included.
    pub expr: Expr,

    pub aggregate: Option<Aggregate>,

    pub ty: DataType,

    pub precision: Option<u32>,

    pub scale: Option<u32>,

    pub nullable: bool,

    pub hidden: bool,

    /// Computed from an expression rather than read from a field.
    pub computed: bool,

    pub read_only: bool,

    pub editable: bool,

    /// Number of non-owned relations crossed to reach the column.
    pub level: i32,

    /// Join column this column hangs off, `None` at the source level.
    pub parent: Option<String>,

    /// Table the column reads from.
    pub table: String,

    /// Field of `table` backing the column.
    pub field: Option<String>,

    /// FROM alias the column reads from.
    pub alias: String,

    pub locale: Option<String>,

    pub default: Option<String>,

    pub enum_key: Option<String>,
}

impl ViewColumn {
    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    pub fn to_column_info(&self) -> ColumnInfo {
        let mut info = ColumnInfo::new(&self.name, self.ty);
        if let Some(label) = &self.label {
            info.label = label.clone();
        }
        info.nullable = self.nullable;
        info.precision = self.precision;
        info.scale = self.scale;
        info.read_only = self.read_only;
        info.editable = self.editable;
        info.level = self.level;
        info.default = self.default.clone();
        info.enum_key = self.enum_key.clone();
        info
    }
}

#[derive(Debug, Clone)]
pub struct View {
    pub name: String,

    pub module: Option<String>,

    /// Source table name.
    pub source: String,

    /// FROM alias of the source table.
    pub source_alias: String,

    pub id_name: String,

    pub version_name: String,

    pub(crate) columns: IndexMap<String, ViewColumn>,

    /// Explicit grouping, by column name.
    pub group_by: Vec<String>,

    pub filter: Option<Filter>,

    pub order: Vec<Order>,

    pub read_only: bool,

    pub cache: Option<CacheHints>,

    pub edit_form: Option<String>,

    pub new_row_form: Option<String>,

    /// FROM clause, joins and grouping; fields are added per query.
    pub(crate) base: Select,

    /// Rows are grouped, by an aggregate column or explicit grouping.
    pub(crate) grouped: bool,
}

impl View {
    pub fn column(&self, name: &str) -> Option<&ViewColumn> {
        self.columns.get(&normalize(name))
    }

    pub fn column_or_err(&self, name: &str) -> Result<&ViewColumn> {
        self.column(name)
            .ok_or_else(|| Error::unknown_column(&self.name, name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn columns(&self) -> impl ExactSizeIterator<Item = &ViewColumn> + '_ {
        self.columns.values()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns().map(|column| column.name.as_str()).collect()
    }

    /// Columns returned to callers when no column list is given.
    pub fn visible_columns(&self) -> impl Iterator<Item = &ViewColumn> + '_ {
        self.columns().filter(|column| !column.hidden)
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    pub fn has_explicit_grouping(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn has_aggregates(&self) -> bool {
        self.columns().any(ViewColumn::is_aggregate)
    }

    pub(crate) fn source_id(&self) -> Expr {
        Expr::field(&self.source_alias, &self.id_name)
    }

    pub(crate) fn source_version(&self) -> Expr {
        Expr::field(&self.source_alias, &self.version_name)
    }

    /// Metadata of the columns a query over `columns` returns.
    pub fn column_infos(&self, columns: Option<&[String]>) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .active_columns(columns)?
            .into_iter()
            .map(ViewColumn::to_column_info)
            .collect())
    }

    /// Requested columns, hidden ones dropped. All visible columns when no
    /// list is given.
    pub(crate) fn active_columns(&self, columns: Option<&[String]>) -> Result<Vec<&ViewColumn>> {
        match columns {
            None => Ok(self.visible_columns().collect()),
            Some(names) => {
                let mut active: Vec<&ViewColumn> = vec![];
                for name in names {
                    let column = self.column_or_err(name)?;
                    if !column.hidden && !active.iter().any(|c| c.name == column.name) {
                        active.push(column);
                    }
                }
                Ok(active)
            }
        }
    }
}
