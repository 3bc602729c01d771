use tabula_core::schema::{db, DataType};

/// A column definition within `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: DataType,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub not_null: bool,
}

impl ColumnDef {
    pub fn from_schema(column: &db::Column) -> ColumnDef {
        ColumnDef {
            name: column.name.clone(),
            ty: column.ty,
            precision: column.precision,
            scale: column.scale,
            not_null: column.not_null,
        }
    }
}
