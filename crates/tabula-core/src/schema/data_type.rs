use serde::{Deserialize, Serialize};

/// Logical type of a field or view column.
///
/// Dates and date-times are stored as epoch milliseconds in a 64-bit
/// integer column, whatever the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Long,
    Double,
    Decimal,
    Char,
    String,
    Text,
    Date,
    #[serde(alias = "datetime")]
    DateTime,
    Blob,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Long | DataType::Double | DataType::Decimal
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, DataType::Char | DataType::String | DataType::Text)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, DataType::Date | DataType::DateTime)
    }

    /// Types that take a length or precision in their declaration.
    pub fn has_precision(self) -> bool {
        matches!(self, DataType::Char | DataType::String | DataType::Decimal)
    }
}
