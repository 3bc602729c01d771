#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::{Comma, Delimited, Period};

mod flavor;
use flavor::Flavor;

mod ident;
use ident::{Ident, Literal};

mod params;
pub use params::{Params, Placeholder};

// Fragment serializers
mod expr;
mod statement;
mod trigger;
mod ty;
mod value;

use crate::stmt::Statement;

use tabula_core::{
    driver::{Dialect, Transaction},
    schema::db,
};

/// Serialize a statement to a SQL string
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    /// The database flavor handles the differences between SQL dialects and
    /// supported features.
    flavor: Flavor,
}

struct Formatter<'a, T> {
    /// Handle to the serializer
    serializer: &'a Serializer,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut T,
}

/// Discards parameters. DDL never binds any.
struct NoParams;

impl Params for NoParams {
    fn push(&mut self, _: &crate::stmt::Value) -> Placeholder {
        Placeholder(0)
    }
}

impl Serializer {
    pub fn serialize(&self, stmt: &Statement, params: &mut impl Params) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            params,
        };

        stmt.to_sql(&mut fmt);

        ret.push(';');
        ret
    }

    /// Serializes a statement that binds no parameters.
    pub fn serialize_ddl(&self, stmt: &Statement) -> String {
        self.serialize(stmt, &mut NoParams)
    }

    /// Serialize a transaction control operation to a SQL string.
    pub fn serialize_transaction(&self, op: &Transaction) -> String {
        match op {
            Transaction::Start => match self.flavor {
                Flavor::Mysql => "START TRANSACTION",
                Flavor::Mssql => "BEGIN TRANSACTION",
                Flavor::Postgresql | Flavor::Sqlite => "BEGIN",
            },
            Transaction::Commit => "COMMIT",
            Transaction::Rollback => "ROLLBACK",
        }
        .to_string()
    }

    /// Declared type of `column`, as the database would report it.
    pub fn column_type(&self, column: &db::Column) -> String {
        let mut ret = String::new();
        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            params: &mut NoParams,
        };
        ty::ColumnType {
            ty: column.ty,
            precision: column.precision,
            scale: column.scale,
        }
        .to_sql(&mut fmt);
        ret
    }

    /// Quotes an identifier.
    pub fn quote(&self, name: &str) -> String {
        let mut ret = String::new();
        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            params: &mut NoParams,
        };
        Ident(name).to_sql(&mut fmt);
        ret
    }

    pub fn dialect(&self) -> Dialect {
        self.flavor.dialect()
    }
}
