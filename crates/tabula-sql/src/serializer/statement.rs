use super::{ty::ColumnType, Comma, Flavor, Ident, Params, ToSql};

use crate::stmt::{self, ColumnDef, ConstraintKind, IndexTarget, Statement, TableConstraint};
use tabula_core::schema::OnDelete;

impl ToSql for &Statement {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            Statement::AddConstraint(stmt) => stmt.to_sql(f),
            Statement::CopyTable(stmt) => stmt.to_sql(f),
            Statement::CreateIndex(stmt) => stmt.to_sql(f),
            Statement::CreateTable(stmt) => stmt.to_sql(f),
            Statement::CreateTrigger(stmt) => stmt.to_sql(f),
            Statement::Delete(stmt) => stmt.to_sql(f),
            Statement::DropForeignKey(stmt) => stmt.to_sql(f),
            Statement::DropTable(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Pragma(stmt) => stmt.to_sql(f),
            Statement::Query(stmt) => stmt.to_sql(f),
            Statement::RenameTable(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &stmt::Select {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "SELECT ");
        if self.distinct {
            fmt!(f, "DISTINCT ");
        }

        if self.fields.is_empty() {
            fmt!(f, "*");
        } else {
            fmt!(f, Comma(&self.fields));
        }

        if !self.from.is_empty() {
            fmt!(f, " FROM ");
            for from in &self.from {
                from.to_sql(f);
            }
        }

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY " Comma(&self.group_by));
        }

        if let Some(having) = &self.having {
            fmt!(f, " HAVING " having);
        }

        let paged = self.limit.is_some() || self.offset.is_some();

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.order_by));
        } else if paged && f.serializer.is_mssql() {
            // OFFSET ... FETCH requires an ORDER BY clause
            fmt!(f, " ORDER BY (SELECT 0)");
        }

        if paged {
            Page {
                limit: self.limit,
                offset: self.offset,
            }
            .to_sql(f);
        }
    }
}

struct Page {
    limit: Option<u64>,
    offset: Option<u64>,
}

impl ToSql for Page {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let offset = self.offset.filter(|offset| *offset > 0);

        match f.serializer.flavor {
            Flavor::Mssql => {
                fmt!(f, " OFFSET " offset.unwrap_or(0) " ROWS");
                if let Some(limit) = self.limit {
                    fmt!(f, " FETCH NEXT " limit " ROWS ONLY");
                }
            }
            flavor => {
                match self.limit {
                    Some(limit) => fmt!(f, " LIMIT " limit),
                    // An offset needs a limit on these databases
                    None if offset.is_some() && flavor == Flavor::Sqlite => fmt!(f, " LIMIT -1"),
                    None if offset.is_some() && flavor == Flavor::Mysql => {
                        fmt!(f, " LIMIT " u64::MAX)
                    }
                    None => {}
                }
                if let Some(offset) = offset {
                    fmt!(f, " OFFSET " offset);
                }
            }
        }
    }
}

impl ToSql for &stmt::SelectItem {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, &self.expr);
        if let Some(alias) = &self.alias {
            fmt!(f, " AS " Ident(alias));
        }
    }
}

impl ToSql for &tabula_core::stmt::From {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if let Some(join) = &self.join {
            fmt!(f, " " join.kind.as_str() " ");
        }

        match &self.source {
            stmt::Source::Table(name) => {
                fmt!(f, Ident(name));
                if let Some(alias) = self.alias.as_ref().filter(|alias| *alias != name) {
                    fmt!(f, " " Ident(alias));
                }
            }
            stmt::Source::Query(query) => {
                let query = &**query;
                fmt!(f, "(" query ")");
                if let Some(alias) = &self.alias {
                    fmt!(f, " " Ident(alias));
                }
            }
        }

        if let Some(join) = &self.join {
            let on = &join.on;
            fmt!(f, " ON " on);
        }
    }
}

impl ToSql for &stmt::OrderBy {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, &self.expr);
        if self.desc {
            fmt!(f, " DESC");
        }
    }
}

impl ToSql for &stmt::Insert {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let columns = Comma(self.columns.iter().map(Ident));
        fmt!(f, "INSERT INTO " Ident(&self.table) " (" columns ")");

        match &self.source {
            stmt::InsertSource::Values(values) => {
                fmt!(f, " VALUES (" Comma(values) ")");
            }
            stmt::InsertSource::Select(query) => {
                let query = &**query;
                fmt!(f, " " query);
            }
        }
    }
}

impl ToSql for &stmt::Update {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let assignments = Comma(self.assignments.iter().map(|(column, expr)| Assignment {
            column,
            expr,
        }));
        fmt!(f, "UPDATE " Ident(&self.table) " SET " assignments);

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }
    }
}

struct Assignment<'a> {
    column: &'a str,
    expr: &'a stmt::Expr,
}

impl ToSql for Assignment<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, Ident(self.column) " = " self.expr);
    }
}

impl ToSql for &stmt::Delete {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "DELETE FROM " Ident(&self.table));

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }
    }
}

impl ToSql for &stmt::CreateTable {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let name = &self.name;
        fmt!(f, "CREATE TABLE " name " (");

        let mut s = "\n    ";
        for column in &self.columns {
            fmt!(f, s column);
            s = ",\n    ";
        }
        for constraint in &self.constraints {
            fmt!(f, s constraint);
        }

        fmt!(f, "\n)");
    }
}

impl ToSql for &ColumnDef {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let ty = ColumnType {
            ty: self.ty,
            precision: self.precision,
            scale: self.scale,
        };
        fmt!(f, Ident(&self.name) " " ty);

        if self.not_null {
            fmt!(f, " NOT NULL");
        }
    }
}

impl ToSql for &TableConstraint {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "CONSTRAINT " Ident(&self.name) " ");

        match &self.kind {
            ConstraintKind::PrimaryKey(fields) => {
                fmt!(f, "PRIMARY KEY (" Comma(fields.iter().map(Ident)) ")");
            }
            ConstraintKind::Unique(fields) => {
                fmt!(f, "UNIQUE (" Comma(fields.iter().map(Ident)) ")");
            }
            ConstraintKind::ForeignKey {
                fields,
                ref_table,
                ref_fields,
                on_delete,
            } => {
                fmt!(f, "FOREIGN KEY (" Comma(fields.iter().map(Ident)) ") REFERENCES " Ident(ref_table));
                if !ref_fields.is_empty() {
                    fmt!(f, " (" Comma(ref_fields.iter().map(Ident)) ")");
                }
                match on_delete {
                    Some(OnDelete::Cascade) => fmt!(f, " ON DELETE CASCADE"),
                    Some(OnDelete::SetNull) => fmt!(f, " ON DELETE SET NULL"),
                    None => {}
                }
            }
            ConstraintKind::Check(expression) => {
                fmt!(f, "CHECK (" expression ")");
            }
        }
    }
}

impl ToSql for &stmt::AddConstraint {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if f.serializer.is_sqlite() {
            panic!("SQLite declares constraints in CREATE TABLE; constraint={}", self.constraint.name);
        }
        let table = &self.table;
        let constraint = &self.constraint;
        fmt!(f, "ALTER TABLE " table " ADD " constraint);
    }
}

impl ToSql for &stmt::CreateIndex {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let unique = if self.unique { "UNIQUE " } else { "" };
        let name = &self.name;
        let on = &self.on;
        fmt!(f, "CREATE " unique "INDEX " name " ON " on " (");

        match &self.target {
            IndexTarget::Columns(columns) => {
                fmt!(f, Comma(columns.iter().map(Ident)) ")");

                // SQL Server treats NULLs as equal in unique indexes
                if let [column] = &columns[..] {
                    if self.unique && f.serializer.is_mssql() {
                        fmt!(f, " WHERE " Ident(column) " IS NOT NULL");
                    }
                }
            }
            IndexTarget::Expression(expression) => {
                fmt!(f, expression ")");
            }
        }
    }
}

impl ToSql for &stmt::CopyTable {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let target_cols = Comma(self.columns.iter().map(|(target, _)| Ident(target)));
        let source_cols = Comma(self.columns.iter().map(|(_, source)| Ident(source)));
        let target = &self.target;
        let source = &self.source;
        fmt!(f, "INSERT INTO " target " (" target_cols ") SELECT " source_cols " FROM " source);
    }
}

impl ToSql for &stmt::DropTable {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let if_exists = if self.if_exists { "IF EXISTS " } else { "" };
        let name = &self.name;
        fmt!(f, "DROP TABLE " if_exists name);
    }
}

impl ToSql for &stmt::DropForeignKey {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let table = &self.table;
        let name = &self.name;
        match f.serializer.flavor {
            Flavor::Mysql => fmt!(f, "ALTER TABLE " table " DROP FOREIGN KEY " name),
            Flavor::Postgresql | Flavor::Mssql => {
                fmt!(f, "ALTER TABLE " table " DROP CONSTRAINT " name)
            }
            Flavor::Sqlite => panic!("SQLite cannot drop a foreign key; name={}", self.name),
        }
    }
}

impl ToSql for &stmt::RenameTable {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match f.serializer.flavor {
            Flavor::Mssql => {
                let from = self.from.to_string().replace('\'', "''");
                let to = self.to.to_string().replace('\'', "''");
                fmt!(f, "EXEC sp_rename '" from.as_str() "', '" to.as_str() "'");
            }
            Flavor::Mysql => {
                let (from, to) = (&self.from, &self.to);
                fmt!(f, "RENAME TABLE " from " TO " to)
            }
            Flavor::Postgresql | Flavor::Sqlite => {
                let (from, to) = (&self.from, &self.to);
                fmt!(f, "ALTER TABLE " from " RENAME TO " to)
            }
        }
    }
}

impl ToSql for &stmt::Pragma {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if !f.serializer.is_sqlite() {
            panic!("\"PRAGMA\" statements only supported in SQLite");
        }
        match &self.value {
            Some(value) => fmt!(f, "PRAGMA " self.name.as_str() " = " value.as_str()),
            None => fmt!(f, "PRAGMA " self.name.as_str()),
        }
    }
}
