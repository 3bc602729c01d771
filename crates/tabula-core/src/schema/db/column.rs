use crate::schema::{DataType, Field};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The name of the column in the database.
    pub name: String,

    pub ty: DataType,

    pub precision: Option<u32>,

    pub scale: Option<u32>,

    pub not_null: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: DataType, not_null: bool) -> Column {
        Column {
            name: name.into(),
            ty,
            precision: None,
            scale: None,
            not_null,
        }
    }

    pub fn with_precision(mut self, precision: Option<u32>, scale: Option<u32>) -> Column {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

impl From<&Field> for Column {
    fn from(field: &Field) -> Column {
        Column::new(&field.name, field.ty, field.not_null).with_precision(field.precision, field.scale)
    }
}
