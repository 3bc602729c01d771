use super::{Flavor, Formatter, Params, Period, ToSql};

use crate::stmt::Name;

/// A quoted identifier
pub(super) struct Ident<S>(pub(super) S);

/// A quoted string literal. Only used for engine generated text, such as
/// field names in trigger bodies.
pub(super) struct Literal<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        let name = self.0.as_ref();
        match f.serializer.flavor {
            Flavor::Postgresql | Flavor::Sqlite => {
                f.dst.push('"');
                f.dst.push_str(&name.replace('"', "\"\""));
                f.dst.push('"');
            }
            Flavor::Mysql => {
                f.dst.push('`');
                f.dst.push_str(&name.replace('`', "``"));
                f.dst.push('`');
            }
            Flavor::Mssql => {
                f.dst.push('[');
                f.dst.push_str(&name.replace(']', "]]"));
                f.dst.push(']');
            }
        }
    }
}

impl<S: AsRef<str>> ToSql for Literal<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        let text = self.0.as_ref().replace('\'', "''");
        f.dst.push('\'');
        match f.serializer.flavor {
            Flavor::Mysql => f.dst.push_str(&text.replace('\\', "\\\\")),
            _ => f.dst.push_str(&text),
        }
        f.dst.push('\'');
    }
}

impl ToSql for &Name {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        fmt!(f, Period(self.0.iter().map(Ident)));
    }
}
