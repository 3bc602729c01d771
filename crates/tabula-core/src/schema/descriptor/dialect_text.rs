use crate::driver::Dialect;

use serde::{Deserialize, Serialize};

/// SQL text given per dialect. Dialects without text fall back to
/// `default`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectText {
    pub default: Option<String>,
    pub postgresql: Option<String>,
    pub mssql: Option<String>,
    pub mysql: Option<String>,
    pub sqlite: Option<String>,
}

impl DialectText {
    pub fn new(text: impl Into<String>) -> DialectText {
        DialectText {
            default: Some(text.into()),
            ..DialectText::default()
        }
    }

    pub fn get(&self, dialect: Dialect) -> Option<&str> {
        let text = match dialect {
            Dialect::Postgresql => &self.postgresql,
            Dialect::Mssql => &self.mssql,
            Dialect::Mysql => &self.mysql,
            Dialect::Sqlite => &self.sqlite,
        };
        text.as_deref()
            .or(self.default.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        Dialect::ALL.iter().all(|dialect| self.get(*dialect).is_none())
    }
}
