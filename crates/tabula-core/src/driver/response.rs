use crate::{stmt::Value, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Rows returned by a query
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self::Count(count)
    }

    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn into_count(self) -> Result<u64> {
        match self {
            Self::Count(count) => Ok(count),
            Self::Rows { .. } => Err(Error::from_args(format_args!(
                "expected an update count, got rows"
            ))),
        }
    }

    pub fn into_rows(self) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        match self {
            Self::Rows { columns, rows } => Ok((columns, rows)),
            Self::Count(_) => Err(Error::from_args(format_args!(
                "expected rows, got an update count"
            ))),
        }
    }

    /// The first column of the first row, `Null` when there is none.
    pub fn into_scalar(self) -> Result<Value> {
        let (_, rows) = self.into_rows()?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(Value::Null))
    }
}
