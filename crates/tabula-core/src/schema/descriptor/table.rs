use super::DialectText;
use crate::schema::{DataType, OnDelete, State, TriggerEvent, TriggerScope, TriggerTiming};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,

    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub id_name: Option<String>,

    #[serde(default)]
    pub version_name: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    #[serde(default)]
    pub indexes: Vec<IndexDescriptor>,

    #[serde(default)]
    pub constraints: Vec<ConstraintDescriptor>,

    #[serde(default)]
    pub triggers: Vec<TriggerDescriptor>,

    #[serde(default)]
    pub states: Vec<State>,

    /// Writes changes of auditable fields to the audit table.
    #[serde(default)]
    pub audit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: DataType,

    #[serde(default)]
    pub precision: Option<u32>,

    #[serde(default)]
    pub scale: Option<u32>,

    #[serde(default)]
    pub not_null: bool,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub relation: Option<String>,

    #[serde(default)]
    pub cascade: Option<OnDelete>,

    /// Owned relation; deleting this row deletes the related row.
    #[serde(default)]
    pub editable: bool,

    #[serde(default)]
    pub extended: bool,

    #[serde(default)]
    pub translatable: bool,

    /// Field participates in auditing. Defaults to true for tables with
    /// auditing on.
    #[serde(default)]
    pub audit: Option<bool>,

    #[serde(default)]
    pub expression: Option<DialectText>,

    #[serde(default)]
    pub default: Option<String>,

    #[serde(default)]
    pub enum_key: Option<String>,

    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    #[serde(default)]
    pub fields: Vec<String>,

    #[serde(default)]
    pub unique: bool,

    /// Expression index, used instead of `fields` when present for the
    /// active dialect.
    #[serde(default)]
    pub expression: Option<DialectText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintDescriptor {
    Check {
        expression: DialectText,
    },
    Unique {
        fields: Vec<String>,
    },
    ForeignKey {
        fields: Vec<String>,
        ref_table: String,
        #[serde(default)]
        ref_fields: Vec<String>,
        #[serde(default)]
        cascade: Option<OnDelete>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,

    #[serde(default)]
    pub scope: TriggerScope,

    pub body: DialectText,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> TableDescriptor {
        TableDescriptor {
            name: name.into(),
            module: None,
            id_name: None,
            version_name: None,
            fields: vec![],
            indexes: vec![],
            constraints: vec![],
            triggers: vec![],
            states: vec![],
            audit: false,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: DataType) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            ty,
            precision: None,
            scale: None,
            not_null: false,
            unique: false,
            relation: None,
            cascade: None,
            editable: false,
            extended: false,
            translatable: false,
            audit: None,
            expression: None,
            default: None,
            enum_key: None,
            label: None,
        }
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn relation(mut self, table: impl Into<String>) -> Self {
        self.relation = Some(table.into());
        self
    }

    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    pub fn translatable(mut self) -> Self {
        self.translatable = true;
        self
    }
}
