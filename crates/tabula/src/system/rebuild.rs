//! Creates and rebuilds physical tables.
//!
//! A rebuild copies the table into `<table>_BAK` with the desired
//! structure, drops the original and renames the copy into place. When
//! a step fails the backup table is left behind for inspection, and no
//! later rebuild of the table runs until it is removed.

use crate::{catalog::SchemaCatalog, Result};

use tabula_core::{
    driver::{Capability, Operation},
    schema::{db::Table, name, PhysicalOptions},
    Connection, Error,
};
use tabula_sql::{Serializer, Statement};

pub(crate) struct Ddl<'a> {
    pub(crate) conn: &'a mut dyn Connection,
    pub(crate) serializer: &'a Serializer,
    pub(crate) capability: &'static Capability,
}

impl Ddl<'_> {
    fn run(&mut self, stmt: Statement) -> Result<()> {
        let sql = self.serializer.serialize_ddl(&stmt);
        tracing::debug!(%sql, "ddl");
        self.conn.exec(Operation::Batch(sql))?;
        Ok(())
    }

    /// Creates a table that does not exist yet.
    pub(crate) fn create(&mut self, table: &Table) -> Result<()> {
        tracing::info!(table = %table.name, "creating table");
        self.run(Statement::create_table(table, self.capability))?;
        if !self.capability.inline_constraints {
            self.add_constraints(table)?;
            for fk in &table.foreign_keys {
                self.run(Statement::add_foreign_key(&table.name, fk))?;
            }
        }
        self.finish(table)
    }

    /// Rebuilds an existing table, keeping the rows of every column the
    /// old and new structure share.
    pub(super) fn rebuild(&mut self, table: &Table, catalog: &SchemaCatalog, options: &PhysicalOptions) -> Result<()> {
        tracing::info!(table = %table.name, "rebuilding table");

        if self.capability.inline_constraints {
            self.run(Statement::pragma_disable_foreign_keys())?;
            let ret = self.rebuild_inline(table);
            // Re-enable even when the rebuild failed.
            let enabled = self.run(Statement::pragma_enable_foreign_keys());
            ret.and(enabled)
        } else {
            self.rebuild_altered(table, catalog, options)
        }
    }

    /// Constraints live in the `CREATE TABLE` text, so the backup carries
    /// them and references from other tables keep pointing at the name.
    fn rebuild_inline(&mut self, table: &Table) -> Result<()> {
        let backup = name::backup_table(&table.name);
        let columns = self.common_columns(table)?;

        self.check_no_backup(&table.name, &backup)?;
        self.run(Statement::create_table_named(&backup, table, self.capability))?;
        self.run(Statement::copy_table(&table.name, &backup, columns))?;
        self.run(Statement::drop_table(&table.name))?;
        self.run(Statement::rename_table(&backup, &table.name))?;
        self.finish(table)
    }

    fn rebuild_altered(&mut self, table: &Table, catalog: &SchemaCatalog, options: &PhysicalOptions) -> Result<()> {
        let backup = name::backup_table(&table.name);
        let columns = self.common_columns(table)?;

        self.check_no_backup(&table.name, &backup)?;
        self.run(Statement::create_table_named(&backup, table, self.capability))?;
        self.run(Statement::copy_table(&table.name, &backup, columns))?;

        let referencing: Vec<_> = self
            .conn
            .db_foreign_keys(None)?
            .into_iter()
            .filter(|fk| fk.ref_table.eq_ignore_ascii_case(&table.name))
            .collect();
        for fk in &referencing {
            self.run(Statement::drop_foreign_key(&fk.table, &fk.name))?;
        }

        self.run(Statement::drop_table(&table.name))?;
        self.run(Statement::rename_table(&backup, &table.name))?;

        self.add_constraints(table)?;
        for fk in &table.foreign_keys {
            self.run(Statement::add_foreign_key(&table.name, fk))?;
        }

        // References from active tables were dropped above.
        for other in catalog.tables().filter(|t| catalog.is_active(&t.name)) {
            for physical in other.db_tables(options) {
                if physical.name.eq_ignore_ascii_case(&table.name) {
                    continue;
                }
                for fk in physical
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.ref_table.eq_ignore_ascii_case(&table.name))
                {
                    self.run(Statement::add_foreign_key(&physical.name, fk))?;
                }
            }
        }

        self.finish(table)
    }

    /// A backup left by a failed rebuild may hold the only copy of rows.
    fn check_no_backup(&mut self, table: &str, backup: &str) -> Result<()> {
        let exists = self
            .conn
            .db_tables()?
            .iter()
            .any(|name| name.eq_ignore_ascii_case(backup));
        if exists {
            return Err(Error::schema_definition(
                table,
                format!("backup table {backup} exists from an earlier rebuild"),
            ));
        }
        Ok(())
    }

    fn add_constraints(&mut self, table: &Table) -> Result<()> {
        for key in table.constraint_keys() {
            if let Some(stmt) = Statement::add_key(&table.name, key) {
                self.run(stmt)?;
            }
        }
        for check in &table.checks {
            self.run(Statement::add_check(&table.name, check))?;
        }
        Ok(())
    }

    /// Indexes and triggers, which every dialect creates separately.
    fn finish(&mut self, table: &Table) -> Result<()> {
        for key in table.indexes() {
            self.run(Statement::create_index(&table.name, key))?;
        }
        for trigger in &table.triggers {
            self.run(Statement::create_trigger(&table.name, trigger))?;
        }
        Ok(())
    }

    /// `(target, source)` pairs of the columns present in the live table.
    fn common_columns(&mut self, table: &Table) -> Result<Vec<(String, String)>> {
        let live = self.conn.db_fields(&table.name)?;
        Ok(table
            .columns
            .iter()
            .filter_map(|column| {
                let field = live
                    .iter()
                    .find(|field| field.name.eq_ignore_ascii_case(&column.name))?;
                Some((column.name.clone(), field.name.clone()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableState;
    use tabula_core::{
        driver::{DbCheck, DbField, DbForeignKey, DbIndex, DbKey, DbTrigger, Dialect, Response},
        schema::{
            descriptor::{FieldDescriptor, TableDescriptor},
            DataType, Table as LogicalTable,
        },
    };

    /// Records DDL and answers catalog questions for a live `Customers`
    /// table that `Orders` references.
    #[derive(Debug)]
    struct Recorder {
        fk: String,
        batches: Vec<String>,
    }

    impl Connection for Recorder {
        fn exec(&mut self, op: Operation) -> Result<Response> {
            if let Operation::Batch(sql) = op {
                self.batches.push(sql);
            }
            Ok(Response::count(0))
        }

        fn db_tables(&mut self) -> Result<Vec<String>> {
            Ok(vec!["Customers".to_string(), "Orders".to_string()])
        }

        fn db_fields(&mut self, table: &str) -> Result<Vec<DbField>> {
            let field = |name: &str, ty: &str| DbField {
                name: name.to_string(),
                ty: ty.to_string(),
                not_null: false,
            };
            Ok(match table {
                "Customers" => vec![field("ID", "BIGINT"), field("Version", "BIGINT"), field("Name", "VARCHAR(10)")],
                _ => vec![],
            })
        }

        fn db_indexes(&mut self, _: &str) -> Result<Vec<DbIndex>> {
            Ok(vec![])
        }

        fn db_keys(&mut self, _: &str) -> Result<Vec<DbKey>> {
            Ok(vec![])
        }

        fn db_foreign_keys(&mut self, _: Option<&str>) -> Result<Vec<DbForeignKey>> {
            Ok(vec![DbForeignKey {
                name: self.fk.clone(),
                table: "Orders".to_string(),
                ref_table: "Customers".to_string(),
            }])
        }

        fn db_checks(&mut self, _: &str) -> Result<Vec<DbCheck>> {
            Ok(vec![])
        }

        fn db_triggers(&mut self, _: &str) -> Result<Vec<DbTrigger>> {
            Ok(vec![])
        }
    }

    fn catalog() -> SchemaCatalog {
        let customers = TableDescriptor::new("Customers")
            .field(FieldDescriptor::new("Name", DataType::String).precision(40));
        let orders = TableDescriptor::new("Orders")
            .field(FieldDescriptor::new("Customer", DataType::Long).relation("Customers"));

        let mut catalog = SchemaCatalog::new();
        for desc in [customers, orders] {
            catalog.add_table(LogicalTable::from_descriptor(&desc, Dialect::Postgresql).unwrap());
        }
        catalog.set_state("Customers", TableState::Rebuilding);
        catalog.set_state("Orders", TableState::Active);
        catalog
    }

    fn position(batches: &[String], sql: &str) -> usize {
        batches
            .iter()
            .position(|batch| batch == sql)
            .unwrap_or_else(|| panic!("{sql} not run; ran {batches:#?}"))
    }

    #[test]
    fn referencing_foreign_keys_are_dropped_and_restored() {
        let catalog = catalog();
        let options = PhysicalOptions {
            dialect: Dialect::Postgresql,
            state_columns: 1,
            audit: false,
        };
        let customers = catalog.table("Customers").unwrap().db_tables(&options).remove(0);
        let orders = catalog.table("Orders").unwrap().db_tables(&options).remove(0);
        let fk = &orders.foreign_keys[0];

        let serializer = Serializer::postgresql();
        let mut conn = Recorder {
            fk: fk.name.clone(),
            batches: vec![],
        };
        Ddl {
            conn: &mut conn,
            serializer: &serializer,
            capability: &Capability::POSTGRESQL,
        }
        .rebuild(&customers, &catalog, &options)
        .unwrap();

        let batches = &conn.batches;
        assert!(batches[0].starts_with("CREATE TABLE \"Customers_BAK\" ("), "{batches:#?}");
        assert!(batches[1].starts_with("INSERT INTO \"Customers_BAK\" ("), "{batches:#?}");
        assert!(batches[1].ends_with("\"Name\" FROM \"Customers\";"), "{batches:#?}");

        let drop_fk = position(batches, &format!("ALTER TABLE \"Orders\" DROP CONSTRAINT \"{}\";", fk.name));
        let drop = position(batches, "DROP TABLE \"Customers\";");
        let rename = position(batches, "ALTER TABLE \"Customers_BAK\" RENAME TO \"Customers\";");
        let add_fk = position(batches, &serializer.serialize_ddl(&Statement::add_foreign_key("Orders", fk)));
        assert!(drop_fk < drop && drop < rename && rename < add_fk, "{batches:#?}");

        assert!(batches[add_fk].starts_with(&format!(
            "ALTER TABLE \"Orders\" ADD CONSTRAINT \"{}\" FOREIGN KEY (\"Customer\") REFERENCES \"Customers\"",
            fk.name
        )));
        // The constraint is restored once, not once per step
        assert_eq!(batches.iter().filter(|batch| batch.contains("ADD CONSTRAINT \"FK_")).count(), 1);
        assert!(!batches.iter().any(|batch| batch.starts_with("PRAGMA")));
    }
}
