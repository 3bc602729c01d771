//! Query results handed back to callers.
//!
//! Values are string encoded; consumers never see driver types.

use crate::schema::DataType;

use serde::{Deserialize, Serialize};

/// Metadata of one result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub id: String,
    pub label: String,
    pub ty: DataType,
    pub nullable: bool,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub read_only: bool,
    pub editable: bool,
    pub level: i32,
    pub default: Option<String>,
    pub enum_key: Option<String>,
}

impl ColumnInfo {
    pub fn new(id: impl Into<String>, ty: DataType) -> ColumnInfo {
        let id = id.into();
        ColumnInfo {
            label: id.clone(),
            id,
            ty,
            nullable: true,
            precision: None,
            scale: None,
            read_only: false,
            editable: false,
            level: 0,
            default: None,
            enum_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: i64,
    pub version: i64,
    pub editable: bool,
    pub removable: bool,
    pub values: Vec<Option<String>>,
}

impl Row {
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(Option::as_deref)
    }
}

/// Rows of a view, or of a raw query when `view_name` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Set when rows carry real ids of the view's source table.
    pub view_name: Option<String>,
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(view_name: Option<String>, columns: Vec<ColumnInfo>) -> RowSet {
        RowSet {
            view_name,
            columns,
            rows: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, id: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.id.eq_ignore_ascii_case(id))
    }

    pub fn row_by_id(&self, id: i64) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// The value of column `id` in row `row`.
    pub fn value(&self, row: usize, id: &str) -> Option<&str> {
        let index = self.column_index(id)?;
        self.rows.get(row)?.value(index)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.iter().map(|row| row.id).collect()
    }
}

/// Rows of an arbitrary query, without ids or column metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleRowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SimpleRowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// All values of one column.
    pub fn column_values(&self, column: &str) -> Vec<Option<&str>> {
        match self.column_index(column) {
            Some(index) => self
                .rows
                .iter()
                .map(|row| row.get(index).and_then(Option::as_deref))
                .collect(),
            None => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_column_name() {
        let mut rowset = RowSet::new(
            Some("Orders".into()),
            vec![ColumnInfo::new("Status", DataType::Integer)],
        );
        rowset.rows.push(Row {
            id: 7,
            version: 1,
            editable: true,
            removable: false,
            values: vec![Some("3".into())],
        });

        assert_eq!(rowset.value(0, "status"), Some("3"));
        assert_eq!(rowset.row_by_id(7).map(|r| r.version), Some(1));
        assert_eq!(rowset.ids(), vec![7]);
        assert_eq!(rowset.value(1, "status"), None);
    }

    #[test]
    fn simple_rowset_columns() {
        let rowset = SimpleRowSet {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![Some("1".into()), None], vec![Some("2".into()), Some("x".into())]],
        };
        assert_eq!(rowset.column_values("B"), vec![None, Some("x")]);
        assert_eq!(rowset.value(0, "a"), Some("1"));
    }
}
