use super::{Params, ToSql};

use crate::stmt;

impl ToSql for &stmt::Value {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            stmt::Value::Null => fmt!(f, "NULL"),
            value => {
                let placeholder = f.params.push(value);
                fmt!(f, placeholder)
            }
        }
    }
}
