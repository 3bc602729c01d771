//! Live catalog introspection.
//!
//! SQLite keeps no names for constraints: primary keys, unique keys, foreign
//! keys and checks only exist in the `CREATE TABLE` text, so their names are
//! read back from there.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use tabula_core::{
    driver::{DbCheck, DbField, DbForeignKey, DbIndex, DbKey, DbKeyKind, DbTrigger},
    Error, Result,
};

static CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CONSTRAINT\s+["`\[]?(\w+)["`\]]?\s+(PRIMARY\s+KEY|UNIQUE|FOREIGN\s+KEY|CHECK)"#)
        .unwrap()
});

static REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*\([^)]*\)\s*REFERENCES\s+["`\[]?(\w+)"#).unwrap()
});

pub(crate) fn tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
        )
        .map_err(Error::driver_operation_failed)?;

    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(Error::driver_operation_failed)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::driver_operation_failed)
}

pub(crate) fn fields(conn: &Connection, table: &str) -> Result<Vec<DbField>> {
    let mut stmt = conn
        .prepare_cached(r#"SELECT name, type, "notnull" FROM pragma_table_info(?1) ORDER BY cid"#)
        .map_err(Error::driver_operation_failed)?;

    let rows = stmt
        .query_map(params![table], |row| {
            Ok(DbField {
                name: row.get(0)?,
                ty: row.get(1)?,
                not_null: row.get::<_, i64>(2)? != 0,
            })
        })
        .map_err(Error::driver_operation_failed)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::driver_operation_failed)
}

/// Indexes created with `CREATE INDEX`. Indexes backing key constraints are
/// reported by [`keys`].
pub(crate) fn indexes(conn: &Connection, table: &str) -> Result<Vec<DbIndex>> {
    let list: Vec<(String, bool)> = {
        let mut stmt = conn
            .prepare_cached(
                r#"SELECT name, "unique" FROM pragma_index_list(?1) WHERE origin = 'c' ORDER BY name"#,
            )
            .map_err(Error::driver_operation_failed)?;

        let rows = stmt
            .query_map(params![table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? != 0))
            })
            .map_err(Error::driver_operation_failed)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::driver_operation_failed)?
    };

    let mut ret = Vec::with_capacity(list.len());

    for (name, unique) in list {
        let mut stmt = conn
            .prepare_cached("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
            .map_err(Error::driver_operation_failed)?;

        // Expression columns have no name.
        let fields = stmt
            .query_map(params![name], |row| row.get::<_, Option<String>>(0))
            .map_err(Error::driver_operation_failed)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::driver_operation_failed)?
            .into_iter()
            .flatten()
            .collect();

        ret.push(DbIndex {
            name,
            table: table.to_string(),
            unique,
            fields,
        });
    }

    Ok(ret)
}

pub(crate) fn keys(conn: &Connection, table: &str) -> Result<Vec<DbKey>> {
    let Some((table, sql)) = definition(conn, table)? else {
        return Ok(vec![]);
    };

    Ok(constraints(&sql)
        .filter_map(|(name, kind, _)| {
            let kind = match kind.as_str() {
                "PRIMARY KEY" => DbKeyKind::Primary,
                "UNIQUE" => DbKeyKind::Unique,
                _ => return None,
            };
            Some(DbKey {
                name,
                table: table.clone(),
                kind,
            })
        })
        .collect())
}

pub(crate) fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<DbForeignKey>> {
    let Some((table, sql)) = definition(conn, table)? else {
        return Ok(vec![]);
    };

    Ok(constraints(&sql)
        .filter(|(_, kind, _)| kind == "FOREIGN KEY")
        .filter_map(|(name, _, rest)| {
            let ref_table = REFERENCES.captures(rest)?.get(1)?.as_str().to_string();
            Some(DbForeignKey {
                name,
                table: table.clone(),
                ref_table,
            })
        })
        .collect())
}

pub(crate) fn checks(conn: &Connection, table: &str) -> Result<Vec<DbCheck>> {
    let Some((table, sql)) = definition(conn, table)? else {
        return Ok(vec![]);
    };

    Ok(constraints(&sql)
        .filter(|(_, kind, _)| kind == "CHECK")
        .map(|(name, _, _)| DbCheck {
            name,
            table: table.clone(),
        })
        .collect())
}

pub(crate) fn triggers(conn: &Connection, table: &str) -> Result<Vec<DbTrigger>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT name, tbl_name FROM sqlite_master \
             WHERE type = 'trigger' AND tbl_name = ?1 COLLATE NOCASE ORDER BY name",
        )
        .map_err(Error::driver_operation_failed)?;

    let rows = stmt
        .query_map(params![table], |row| {
            Ok(DbTrigger {
                name: row.get(0)?,
                table: row.get(1)?,
            })
        })
        .map_err(Error::driver_operation_failed)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::driver_operation_failed)
}

/// Stored name and `CREATE TABLE` text of `table`.
fn definition(conn: &Connection, table: &str) -> Result<Option<(String, String)>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        )
        .map_err(Error::driver_operation_failed)?;

    let mut rows = stmt
        .query(params![table])
        .map_err(Error::driver_operation_failed)?;

    let Some(row) = rows.next().map_err(Error::driver_operation_failed)? else {
        return Ok(None);
    };
    let name: String = row.get(0).map_err(Error::driver_operation_failed)?;
    let sql: Option<String> = row.get(1).map_err(Error::driver_operation_failed)?;

    Ok(sql.map(|sql| (name, sql)))
}

/// Named constraints of a table definition: name, normalized kind, and the
/// text following the kind keyword.
fn constraints(sql: &str) -> impl Iterator<Item = (String, String, &str)> + '_ {
    CONSTRAINT.captures_iter(sql).filter_map(move |caps| {
        let name = caps.get(1)?.as_str().to_string();
        let kind = caps
            .get(2)?
            .as_str()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let rest = &sql[caps.get(0)?.end()..];
        Some((name, kind, rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE "Customers" (
                "ID" BIGINT NOT NULL,
                "Name" VARCHAR(40),
                CONSTRAINT "PK_1" PRIMARY KEY ("ID")
            );
            CREATE TABLE "Orders" (
                "ID" BIGINT NOT NULL,
                "Customer" BIGINT,
                "Total" NUMERIC(12, 2),
                CONSTRAINT "PK_2" PRIMARY KEY ("ID"),
                CONSTRAINT "UK_3" UNIQUE ("Customer", "Total"),
                CONSTRAINT "FK_4" FOREIGN KEY ("Customer") REFERENCES "Customers" ("ID") ON DELETE CASCADE,
                CONSTRAINT "CK_5" CHECK ("Total" >= 0)
            );
            CREATE INDEX "IK_6" ON "Orders" ("Customer");
            CREATE TRIGGER "TR_7" AFTER DELETE ON "Orders" FOR EACH ROW BEGIN
                DELETE FROM "Customers" WHERE "ID" = OLD."Customer";
            END;
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn tables_and_fields() {
        let conn = db();
        assert_eq!(tables(&conn).unwrap(), vec!["Customers", "Orders"]);

        let fields = fields(&conn, "orders").unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "ID");
        assert!(fields[0].not_null);
        assert_eq!(fields[2].ty.replace(' ', ""), "NUMERIC(12,2)");
        assert!(!fields[2].not_null);
    }

    #[test]
    fn constraints_are_read_from_the_definition() {
        let conn = db();

        let found = keys(&conn, "Orders").unwrap();
        assert_eq!(
            found.iter().map(|k| (k.name.as_str(), k.kind)).collect::<Vec<_>>(),
            vec![("PK_2", DbKeyKind::Primary), ("UK_3", DbKeyKind::Unique)]
        );

        let fks = foreign_keys(&conn, "Orders").unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].name, "FK_4");
        assert_eq!(fks[0].ref_table, "Customers");

        assert_eq!(checks(&conn, "Orders").unwrap()[0].name, "CK_5");
        assert!(keys(&conn, "Missing").unwrap().is_empty());
    }

    #[test]
    fn indexes_skip_constraint_backed_ones() {
        let conn = db();
        let indexes = indexes(&conn, "Orders").unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "IK_6");
        assert_eq!(indexes[0].fields, vec!["Customer"]);
        assert!(!indexes[0].unique);
    }

    #[test]
    fn triggers_by_table() {
        let conn = db();
        let found = triggers(&conn, "ORDERS").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "TR_7");
        assert!(triggers(&conn, "Customers").unwrap().is_empty());
    }
}
