//! Compares physical table definitions with the live catalog.
//!
//! Only engine-owned objects (see [`name::is_engine_owned`]) take part: an
//! index or constraint someone created by hand is neither expected nor
//! counted.

use super::Diagnostic;
use crate::Result;

use tabula_core::{
    schema::{
        db::{Table, TableRole},
        name,
    },
    Connection,
};
use tabula_sql::Serializer;

/// Diagnostics for one physical table. With `all` unset, stops at the
/// first mismatch.
pub(super) fn check(
    conn: &mut dyn Connection,
    serializer: &Serializer,
    table: &Table,
    all: bool,
) -> Result<Vec<Diagnostic>> {
    let mut diff = Diff {
        table,
        all,
        diagnostics: vec![],
    };

    let live = conn.db_fields(&table.name)?;
    if live.is_empty() {
        let kind = match table.role {
            TableRole::Audit => "AUDIT TABLE",
            _ => "TABLE",
        };
        diff.push(format!("{kind} {} NOT IN DATABASE", table.name));
        return Ok(diff.diagnostics);
    }

    for column in &table.columns {
        let Some(field) = live.iter().find(|f| f.name.eq_ignore_ascii_case(&column.name)) else {
            diff.push(format!("FIELD {} NOT IN {}", column.name, table.name));
            continue;
        };
        let expected = type_text(&serializer.column_type(column));
        let actual = type_text(&field.ty);
        if expected != actual {
            diff.push(format!("FIELD {}: TYPE {expected} != {actual}", column.name));
        } else if column.not_null != field.not_null {
            diff.push(format!(
                "FIELD {}: NOT NULL {} != {}",
                column.name, column.not_null, field.not_null
            ));
        }
    }
    if live.len() > table.columns.len() {
        diff.push("TOO MANY FIELDS".to_string());
    }
    if diff.done() {
        return Ok(diff.diagnostics);
    }

    let live: Vec<String> = conn
        .db_indexes(&table.name)?
        .into_iter()
        .map(|index| index.name)
        .collect();
    diff.names("INDEX", "INDEXES", table.indexes().map(|key| key.name.as_str()), live);
    if diff.done() {
        return Ok(diff.diagnostics);
    }

    let live: Vec<String> = conn
        .db_keys(&table.name)?
        .into_iter()
        .map(|key| key.name)
        .collect();
    diff.names(
        "KEY",
        "UNIQUE KEYS",
        table.constraint_keys().map(|key| key.name.as_str()),
        live,
    );
    if diff.done() {
        return Ok(diff.diagnostics);
    }

    let live: Vec<String> = conn
        .db_foreign_keys(Some(&table.name))?
        .into_iter()
        .map(|fk| fk.name)
        .collect();
    diff.names(
        "FOREIGN KEY",
        "FOREIGN KEYS",
        table.foreign_keys.iter().map(|fk| fk.name.as_str()),
        live,
    );
    if diff.done() {
        return Ok(diff.diagnostics);
    }

    let live: Vec<String> = conn
        .db_checks(&table.name)?
        .into_iter()
        .map(|check| check.name)
        .collect();
    diff.names(
        "CHECK",
        "CHECK CONSTRAINTS",
        table.checks.iter().map(|check| check.name.as_str()),
        live,
    );
    if diff.done() {
        return Ok(diff.diagnostics);
    }

    let live: Vec<String> = conn
        .db_triggers(&table.name)?
        .into_iter()
        .map(|trigger| trigger.name)
        .collect();
    diff.names(
        "TRIGGER",
        "TRIGGERS",
        table.triggers.iter().map(|trigger| trigger.name.as_str()),
        live,
    );

    Ok(diff.diagnostics)
}

struct Diff<'a> {
    table: &'a Table,
    all: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Diff<'_> {
    fn push(&mut self, message: String) {
        if self.all || self.diagnostics.is_empty() {
            self.diagnostics.push(Diagnostic {
                table: self.table.name.clone(),
                message,
            });
        }
    }

    fn done(&self) -> bool {
        !self.all && !self.diagnostics.is_empty()
    }

    /// Expected names missing from `live`, then a surplus of engine-owned
    /// live objects.
    fn names<'b>(
        &mut self,
        kind: &str,
        plural: &str,
        expected: impl Iterator<Item = &'b str>,
        live: Vec<String>,
    ) {
        let live: Vec<String> = live
            .into_iter()
            .filter(|name| name::is_engine_owned(name))
            .collect();

        let mut count = 0;
        for name in expected {
            count += 1;
            if !live.iter().any(|l| l.eq_ignore_ascii_case(name)) {
                self.push(format!("{kind} {name} NOT IN {}", self.table.name));
            }
        }
        if live.len() > count {
            self.push(format!("TOO MANY {plural}"));
        }
    }
}

/// Declared types compare without whitespace and case.
fn type_text(ty: &str) -> String {
    ty.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::{driver::Operation, schema::db::Column, schema::DataType, schema::Key, Driver};
    use tabula_driver_sqlite::Sqlite;

    fn orders() -> Table {
        let mut table = Table::new("Orders", "Orders", TableRole::Main);
        table.columns = vec![
            Column::new("ID", DataType::Long, true),
            Column::new("Name", DataType::String, false).with_precision(Some(20), None),
        ];
        table.keys.push(Key::primary("Orders", "ID"));
        table
    }

    fn messages(diagnostics: Vec<Diagnostic>) -> Vec<String> {
        diagnostics.into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn missing_table() {
        let driver = Sqlite::in_memory().unwrap();
        let mut conn = driver.connect().unwrap();
        let found = check(&mut *conn, &Serializer::sqlite(), &orders(), true).unwrap();
        assert_eq!(messages(found), vec!["TABLE Orders NOT IN DATABASE"]);
    }

    #[test]
    fn field_mismatches_are_collected() {
        let driver = Sqlite::in_memory().unwrap();
        let mut conn = driver.connect().unwrap();
        let key = &orders().keys[0].name;
        conn.exec(Operation::Batch(format!(
            r#"CREATE TABLE "Orders" ("ID" BIGINT, "Name" VARCHAR(10), "Extra" INTEGER, CONSTRAINT "{key}" PRIMARY KEY ("ID")); CREATE INDEX "IK_1" ON "Orders" ("Name"); CREATE INDEX "by_hand" ON "Orders" ("Extra");"#
        )))
        .unwrap();

        let found = check(&mut *conn, &Serializer::sqlite(), &orders(), true).unwrap();
        assert_eq!(
            messages(found),
            vec![
                "FIELD ID: NOT NULL true != false",
                "FIELD Name: TYPE VARCHAR(20) != VARCHAR(10)",
                "TOO MANY FIELDS",
                "TOO MANY INDEXES",
            ]
        );

        let first = check(&mut *conn, &Serializer::sqlite(), &orders(), false).unwrap();
        assert_eq!(messages(first), vec!["FIELD ID: NOT NULL true != false"]);
    }

    #[test]
    fn matching_table_has_no_diagnostics() {
        let driver = Sqlite::in_memory().unwrap();
        let mut conn = driver.connect().unwrap();
        let key = &orders().keys[0].name;
        conn.exec(Operation::Batch(format!(
            r#"CREATE TABLE "Orders" ("ID" BIGINT NOT NULL, "Name" VARCHAR(20), CONSTRAINT "{key}" PRIMARY KEY ("ID"));"#
        )))
        .unwrap();

        let found = check(&mut *conn, &Serializer::sqlite(), &orders(), true).unwrap();
        assert!(found.is_empty());
    }
}
