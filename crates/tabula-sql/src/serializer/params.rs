use super::{Flavor, Formatter, ToSql};

use crate::stmt;

pub trait Params {
    fn push(&mut self, param: &stmt::Value) -> Placeholder;
}

/// 1-based position of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder(pub usize);

impl Params for Vec<stmt::Value> {
    fn push(&mut self, value: &stmt::Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match f.serializer.flavor {
            Flavor::Mysql => f.dst.push('?'),
            Flavor::Postgresql => f.dst.push_str(&format!("${}", self.0)),
            Flavor::Sqlite => f.dst.push_str(&format!("?{}", self.0)),
            Flavor::Mssql => f.dst.push_str(&format!("@p{}", self.0)),
        }
    }
}
