use super::{Flavor, Formatter, Params, ToSql};

use tabula_core::{driver::Capability, schema::DataType};

/// Storage type of a column.
pub(super) struct ColumnType {
    pub(super) ty: DataType,
    pub(super) precision: Option<u32>,
    pub(super) scale: Option<u32>,
}

/// Target type of a `CAST`. MySQL only casts to a restricted set of types.
pub(super) struct CastType {
    pub(super) ty: DataType,
    pub(super) precision: Option<u32>,
    pub(super) scale: Option<u32>,
}

const DEFAULT_STRING_LENGTH: u32 = 255;

impl ToSql for ColumnType {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        let flavor = f.serializer.flavor;
        let sql = match self.ty {
            DataType::Boolean => match flavor {
                Flavor::Mssql => "BIT".to_string(),
                _ => "BOOLEAN".to_string(),
            },
            DataType::Integer => "INTEGER".to_string(),
            DataType::Long | DataType::Date | DataType::DateTime => "BIGINT".to_string(),
            DataType::Double => match flavor {
                Flavor::Mssql => "FLOAT".to_string(),
                Flavor::Postgresql => "DOUBLE PRECISION".to_string(),
                _ => "DOUBLE".to_string(),
            },
            DataType::Decimal => decimal(self.precision, self.scale),
            DataType::Char => format!("CHAR({})", self.precision.unwrap_or(1)),
            DataType::String => {
                let length = self.precision.unwrap_or(DEFAULT_STRING_LENGTH);
                if length > Capability::for_dialect(flavor.dialect()).max_varchar {
                    text(flavor).to_string()
                } else {
                    format!("VARCHAR({length})")
                }
            }
            DataType::Text => text(flavor).to_string(),
            DataType::Blob => match flavor {
                Flavor::Postgresql => "BYTEA".to_string(),
                Flavor::Mssql => "VARBINARY(MAX)".to_string(),
                Flavor::Mysql => "LONGBLOB".to_string(),
                Flavor::Sqlite => "BLOB".to_string(),
            },
        };
        f.dst.push_str(&sql);
    }
}

impl ToSql for CastType {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        if f.serializer.flavor != Flavor::Mysql {
            return ColumnType {
                ty: self.ty,
                precision: self.precision,
                scale: self.scale,
            }
            .to_sql(f);
        }

        let sql = match self.ty {
            DataType::Boolean | DataType::Integer | DataType::Long => "SIGNED".to_string(),
            DataType::Date | DataType::DateTime => "SIGNED".to_string(),
            DataType::Double => "DOUBLE".to_string(),
            DataType::Decimal => decimal(self.precision, self.scale),
            DataType::Char | DataType::String => match self.precision {
                Some(length) => format!("CHAR({length})"),
                None => "CHAR".to_string(),
            },
            DataType::Text => "CHAR".to_string(),
            DataType::Blob => "BINARY".to_string(),
        };
        f.dst.push_str(&sql);
    }
}

fn decimal(precision: Option<u32>, scale: Option<u32>) -> String {
    match (precision, scale) {
        (Some(precision), Some(scale)) => format!("NUMERIC({precision}, {scale})"),
        (Some(precision), None) => format!("NUMERIC({precision}, 0)"),
        _ => "NUMERIC".to_string(),
    }
}

fn text(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::Mssql => "VARCHAR(MAX)",
        Flavor::Mysql => "LONGTEXT",
        _ => "TEXT",
    }
}
