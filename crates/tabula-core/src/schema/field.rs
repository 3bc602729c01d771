use super::{DataType, OnDelete};

/// A field of a logical table.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,

    pub ty: DataType,

    /// Length for strings, total digits for decimals.
    pub precision: Option<u32>,

    pub scale: Option<u32>,

    pub not_null: bool,

    pub unique: bool,

    /// Target table when this field references another table's id.
    pub relation: Option<String>,

    /// Delete action of the relation's foreign key.
    pub on_delete: Option<OnDelete>,

    /// An owned relation: deleting this row deletes the referenced row.
    pub editable: bool,

    /// Stored in the extension table instead of the owner.
    pub extended: bool,

    /// Stored per locale in the translation table.
    pub translatable: bool,

    /// Changes are written to the audit table.
    pub auditable: bool,

    /// Dialect expression for a computed field. Computed fields have no
    /// storage.
    pub expression: Option<String>,

    pub default: Option<String>,

    pub enum_key: Option<String>,

    pub label: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: DataType) -> Field {
        Field {
            name: name.into(),
            ty,
            precision: None,
            scale: None,
            not_null: false,
            unique: false,
            relation: None,
            on_delete: None,
            editable: false,
            extended: false,
            translatable: false,
            auditable: false,
            expression: None,
            default: None,
            enum_key: None,
            label: None,
        }
    }

    pub fn is_computed(&self) -> bool {
        self.expression.is_some()
    }

    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }

    /// Whether the value lives in the owner table itself.
    pub fn is_stored_in_owner(&self) -> bool {
        !self.is_computed() && !self.extended && !self.translatable
    }
}
