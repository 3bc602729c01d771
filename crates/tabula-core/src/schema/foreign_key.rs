use super::name;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub name: String,
    pub fields: Vec<String>,
    pub ref_table: String,
    pub ref_fields: Vec<String>,
    pub on_delete: Option<OnDelete>,
}

impl ForeignKey {
    pub fn new(
        table: &str,
        fields: Vec<String>,
        ref_table: impl Into<String>,
        ref_fields: Vec<String>,
        on_delete: Option<OnDelete>,
    ) -> ForeignKey {
        ForeignKey {
            name: name::object_name(
                name::FOREIGN_KEY_PREFIX,
                table,
                fields.iter().map(String::as_str),
            ),
            fields,
            ref_table: ref_table.into(),
            ref_fields,
            on_delete,
        }
    }
}
