//! Schema lifecycle: loading descriptors, reconciling registered tables with
//! the database and activating them on first use.

mod diff;
mod rebuild;
pub(crate) use rebuild::Ddl;

use crate::{
    catalog::{ConditionProvider, SchemaCatalog, TableState},
    loader::{self, Descriptors, LoadReport},
    view::View,
    EngineConfig, Result,
};

use parking_lot::{RwLock, RwLockReadGuard};
use std::{collections::HashSet, path::Path, sync::Arc};
use tabula_core::{
    schema::{db, Table},
    stmt::Value,
    Connection, Driver, Error,
};
use tabula_sql::Serializer;

/// One structural difference between a registered table and the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Physical table the difference was found on.
    pub table: String,
    pub message: String,
}

/// Outcome of [`SystemManager::reconcile`].
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub diagnostics: Vec<Diagnostic>,

    /// Physical tables created or rebuilt.
    pub rebuilt: Vec<String>,

    /// Logical tables that became active.
    pub activated: Vec<String>,
}

#[derive(Debug)]
pub struct SystemManager {
    config: EngineConfig,
    driver: Arc<dyn Driver>,
    serializer: Serializer,
    catalog: RwLock<SchemaCatalog>,

    /// Shared by engine calls for their whole run, exclusive while tables
    /// are rebuilt. Taken before `catalog`.
    schema: RwLock<()>,
}

impl SystemManager {
    pub fn new(config: EngineConfig, driver: Arc<dyn Driver>) -> SystemManager {
        let mut config = config;
        config.dialect = driver.capability().dialect;

        SystemManager {
            serializer: Serializer::for_dialect(config.dialect),
            config,
            driver,
            catalog: RwLock::new(SchemaCatalog::new()),
            schema: RwLock::new(()),
        }
    }

    /// Replaces the catalog with one built from `descriptors`. Every table
    /// starts inactive; condition providers carry over.
    pub fn load(&self, descriptors: &Descriptors) -> LoadReport {
        let mut catalog = self.catalog.write();
        let (next, report) = loader::build_catalog(self.config.dialect, descriptors, catalog.providers());
        *catalog = next;
        report
    }

    /// Reads descriptor files, see [`Descriptors::read_dir`], and loads them.
    pub fn load_dir(&self, module_dir: &Path, local_dir: Option<&Path>) -> Result<LoadReport> {
        let descriptors = Descriptors::read_dir(module_dir, local_dir)?;
        Ok(self.load(&descriptors))
    }

    pub fn register_provider(&self, key: impl Into<String>, provider: Arc<dyn ConditionProvider>) {
        self.catalog.write().register_provider(key, provider);
    }

    /// Brings every registered table in line with its definition. A dry run
    /// only reports what differs.
    pub fn reconcile(&self, dry_run: bool) -> Result<Reconciliation> {
        let names = self.table_names();
        if dry_run {
            return Ok(Reconciliation {
                diagnostics: self.check_tables(&names)?,
                ..Reconciliation::default()
            });
        }

        let _schema = self.schema.write();
        let mut catalog = self.catalog.write();
        let mut conn = self.driver.connect()?;
        let mut out = Reconciliation::default();
        let mut visiting = HashSet::new();

        for name in &names {
            self.ensure_active(&mut catalog, &mut *conn, name, &mut visiting, &mut out)?;
        }

        tracing::info!(
            activated = out.activated.len(),
            rebuilt = out.rebuilt.len(),
            "reconciled schema"
        );
        Ok(out)
    }

    /// Every difference between the named tables and the database. Nothing
    /// is changed.
    pub fn check_tables<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Diagnostic>> {
        let catalog = self.catalog.read();
        let mut conn = self.driver.connect()?;
        let mut diagnostics = vec![];

        for name in names {
            let table = catalog.table_or_err(name.as_ref())?;
            for physical in self.physical_tables(table) {
                diagnostics.extend(diff::check(&mut *conn, &self.serializer, &physical, true)?);
            }
        }
        Ok(diagnostics)
    }

    /// Rebuilds every physical table of `name`, whether it differs or not.
    ///
    /// Waits for running engine calls to finish, so it must not be called
    /// from a data event handler.
    pub fn rebuild_table(&self, name: &str) -> Result<Reconciliation> {
        let _schema = self.schema.write();
        let mut catalog = self.catalog.write();
        let mut conn = self.driver.connect()?;
        let mut out = Reconciliation::default();
        self.rebuild_locked(&mut catalog, &mut *conn, name, &mut out)?;
        Ok(out)
    }

    /// Rebuilds every table that is active in this process.
    pub fn rebuild_active_tables(&self) -> Result<Reconciliation> {
        let _schema = self.schema.write();
        let mut catalog = self.catalog.write();
        let mut conn = self.driver.connect()?;
        let mut out = Reconciliation::default();

        let active: Vec<String> = catalog
            .tables()
            .filter(|table| catalog.is_active(&table.name))
            .map(|table| table.name.clone())
            .collect();
        for name in active {
            self.rebuild_locked(&mut catalog, &mut *conn, &name, &mut out)?;
        }
        Ok(out)
    }

    /// Activates the tables behind `names`, which may be physical names.
    /// Unknown names are ignored.
    pub fn activate_tables<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        if self.all_active(names) {
            return Ok(());
        }
        let mut conn = self.driver.connect()?;
        self.activate_locked(&mut *conn, names)
    }

    /// Like [`activate_tables`](Self::activate_tables), on an open
    /// connection.
    pub fn activate_with<S: AsRef<str>>(&self, conn: &mut dyn Connection, names: &[S]) -> Result<()> {
        if self.all_active(names) {
            return Ok(());
        }
        self.activate_locked(conn, names)
    }

    fn all_active<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let catalog = self.catalog.read();
        names.iter().all(|name| {
            catalog
                .logical_table(name.as_ref())
                .map_or(true, |table| catalog.is_active(&table.name))
        })
    }

    fn activate_locked<S: AsRef<str>>(&self, conn: &mut dyn Connection, names: &[S]) -> Result<()> {
        let mut catalog = self.catalog.write();
        let mut out = Reconciliation::default();
        let mut visiting = HashSet::new();

        let logical: Vec<String> = names
            .iter()
            .filter_map(|name| catalog.logical_table(name.as_ref()))
            .map(|table| table.name.clone())
            .collect();

        // Another caller may have activated them in the meantime, which
        // `ensure_active` sees.
        for name in logical {
            self.ensure_active(&mut catalog, conn, &name, &mut visiting, &mut out)?;
        }
        Ok(())
    }

    /// Activates `name` after the tables its foreign keys point at.
    fn ensure_active(
        &self,
        catalog: &mut SchemaCatalog,
        conn: &mut dyn Connection,
        name: &str,
        visiting: &mut HashSet<String>,
        out: &mut Reconciliation,
    ) -> Result<()> {
        let table = catalog.table_or_err(name)?.clone();
        if catalog.state(&table.name) != TableState::Inactive
            || !visiting.insert(tabula_core::schema::normalize(&table.name))
        {
            return Ok(());
        }

        let physical = self.physical_tables(&table);

        for target in physical.iter().flat_map(|t| &t.foreign_keys).map(|fk| fk.ref_table.clone()) {
            if !target.eq_ignore_ascii_case(&table.name) && catalog.has_table(&target) {
                self.ensure_active(catalog, conn, &target, visiting, out)?;
            }
        }

        let mut differing = vec![];
        for candidate in &physical {
            let found = diff::check(conn, &self.serializer, candidate, false)?;
            if !found.is_empty() {
                differing.push(candidate);
                out.diagnostics.extend(found);
            }
        }

        if !differing.is_empty() {
            catalog.set_state(&table.name, TableState::Rebuilding);
            let options = self.config.physical_options();
            let mut ddl = rebuild::Ddl {
                conn: &mut *conn,
                serializer: &self.serializer,
                capability: self.driver.capability(),
            };
            for physical in differing {
                let exists = !ddl.conn.db_fields(&physical.name)?.is_empty();
                let ret = if exists {
                    ddl.rebuild(physical, catalog, &options)
                } else {
                    ddl.create(physical)
                };
                if let Err(err) = ret {
                    catalog.set_state(&table.name, TableState::Inactive);
                    return Err(err.context(Error::schema_definition(&table.name, "table could not be rebuilt")));
                }
                out.rebuilt.push(physical.name.clone());
            }
        }

        catalog.set_state(&table.name, TableState::Active);
        out.activated.push(table.name.clone());
        tracing::info!(table = %table.name, "table active");
        Ok(())
    }

    fn rebuild_locked(
        &self,
        catalog: &mut SchemaCatalog,
        conn: &mut dyn Connection,
        name: &str,
        out: &mut Reconciliation,
    ) -> Result<()> {
        let table = catalog.table_or_err(name)?.clone();
        catalog.set_state(&table.name, TableState::Rebuilding);

        let options = self.config.physical_options();
        let mut ddl = rebuild::Ddl {
            conn,
            serializer: &self.serializer,
            capability: self.driver.capability(),
        };

        for physical in self.physical_tables(&table) {
            let exists = !ddl.conn.db_fields(&physical.name)?.is_empty();
            let ret = if exists {
                ddl.rebuild(&physical, catalog, &options)
            } else {
                ddl.create(&physical)
            };
            if let Err(err) = ret {
                catalog.set_state(&table.name, TableState::Inactive);
                return Err(err);
            }
            out.rebuilt.push(physical.name);
        }

        catalog.set_state(&table.name, TableState::Active);
        out.activated.push(table.name.clone());
        Ok(())
    }

    /// Audit table first, its trigger bodies refer to it. Then the main
    /// table and its satellites.
    fn physical_tables(&self, table: &Table) -> Vec<db::Table> {
        let options = self.config.physical_options();
        table
            .audit_table(&options)
            .into_iter()
            .chain(table.db_tables(&options))
            .collect()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.catalog.read().is_active(name)
    }

    /// Truncates a string to the precision of `table.field`. Anything else
    /// passes unchanged.
    pub fn clamp_value(&self, table: &str, field: &str, value: Value) -> Value {
        let catalog = self.catalog.read();
        let Some(field) = catalog.table(table).and_then(|table| table.field(field)) else {
            return value;
        };
        match (value, field.precision) {
            (Value::String(text), Some(precision)) if field.ty.is_string() => {
                let precision = precision as usize;
                if text.chars().count() > precision {
                    Value::String(text.chars().take(precision).collect())
                } else {
                    Value::String(text)
                }
            }
            (value, _) => value,
        }
    }

    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.catalog.read().table(name).cloned()
    }

    pub fn view(&self, name: &str) -> Option<Arc<View>> {
        self.catalog.read().view(name).cloned()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.catalog.read().tables().map(|table| table.name.clone()).collect()
    }

    pub fn view_names(&self) -> Vec<String> {
        self.catalog.read().views().map(|view| view.name.clone()).collect()
    }

    pub(crate) fn catalog(&self) -> RwLockReadGuard<'_, SchemaCatalog> {
        self.catalog.read()
    }

    /// Keeps rebuilds out until the guard drops. Nested engine calls on one
    /// thread may each take it.
    pub(crate) fn schema_in_use(&self) -> RwLockReadGuard<'_, ()> {
        self.schema.read_recursive()
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::{
        driver::Operation,
        schema::{
            descriptor::{FieldDescriptor, TableDescriptor},
            DataType,
        },
    };
    use tabula_driver_sqlite::Sqlite;

    fn system() -> SystemManager {
        let driver = Sqlite::in_memory().unwrap();
        SystemManager::new(EngineConfig::default(), Arc::new(driver))
    }

    fn descriptors(name_length: u32) -> Descriptors {
        let mut customer = FieldDescriptor::new("Customer", DataType::Long);
        customer.relation = Some("Customers".to_string());
        Descriptors::new()
            .table(
                TableDescriptor::new("Customers")
                    .field(FieldDescriptor::new("Name", DataType::String).precision(name_length)),
            )
            .table(
                TableDescriptor::new("Orders")
                    .field(customer)
                    .field(FieldDescriptor::new("Total", DataType::Decimal).precision(12).scale(2)),
            )
    }

    #[test]
    fn reconcile_creates_then_settles() {
        let system = system();
        system.load(&descriptors(20));

        let first = system.reconcile(false).unwrap();
        assert_eq!(first.activated, vec!["Customers", "Orders"]);
        assert!(first.rebuilt.contains(&"Orders".to_string()));

        system.load(&descriptors(20));
        let dry = system.reconcile(true).unwrap();
        assert_eq!(dry.diagnostics, vec![]);

        let second = system.reconcile(false).unwrap();
        assert!(second.rebuilt.is_empty());
        assert_eq!(second.activated.len(), 2);
    }

    #[test]
    fn activation_follows_foreign_keys() {
        let system = system();
        system.load(&descriptors(20));

        system.activate_tables(&["Orders"]).unwrap();
        assert!(system.is_active("Orders"));
        assert!(system.is_active("Customers"));
    }

    #[test]
    fn widening_keeps_rows() {
        let system = system();
        system.load(&descriptors(10));
        system.reconcile(false).unwrap();

        {
            let mut conn = system.driver().connect().unwrap();
            conn.exec(Operation::Batch(
                r#"INSERT INTO "Customers" ("ID", "Version", "Name") VALUES (1, 1, 'Ann');"#.into(),
            ))
            .unwrap();
        }

        system.load(&descriptors(40));
        let dry = system.reconcile(true).unwrap();
        assert_eq!(
            dry.diagnostics,
            vec![Diagnostic {
                table: "Customers".to_string(),
                message: "FIELD Name: TYPE VARCHAR(40) != VARCHAR(10)".to_string(),
            }]
        );

        let out = system.reconcile(false).unwrap();
        assert_eq!(out.rebuilt, vec!["Customers"]);

        let mut conn = system.driver().connect().unwrap();
        let name = conn
            .exec(Operation::Query(r#"SELECT "Name" FROM "Customers" WHERE "ID" = 1"#.into()))
            .unwrap()
            .into_scalar()
            .unwrap();
        assert_eq!(name, Value::from("Ann"));
        assert!(conn.db_fields("Customers_BAK").unwrap().is_empty());
    }

    #[test]
    fn failed_rebuild_keeps_its_backup() {
        let system = system();
        system.load(&descriptors(10));
        system.reconcile(false).unwrap();

        {
            let mut conn = system.driver().connect().unwrap();
            conn.exec(Operation::Batch(
                r#"INSERT INTO "Customers" ("ID", "Version", "Name") VALUES (1, 1, NULL);"#.into(),
            ))
            .unwrap();
        }

        // The NULL name cannot be copied into the stricter structure.
        let strict = Descriptors::new().table(
            TableDescriptor::new("Customers")
                .field(FieldDescriptor::new("Name", DataType::String).precision(10).not_null()),
        );
        system.load(&strict);
        let err = system.reconcile(false).unwrap_err();
        assert!(err.is_schema_definition());
        assert!(!system.is_active("Customers"));

        let backup_exists = || {
            let mut conn = system.driver().connect().unwrap();
            !conn.db_fields("Customers_BAK").unwrap().is_empty()
        };
        assert!(backup_exists());

        let err = system.rebuild_table("Customers").unwrap_err();
        assert!(err.is_schema_definition());
        assert!(err.to_string().contains("Customers_BAK"), "{err}");
        assert!(backup_exists());

        // Neither attempt touched the original rows
        let mut conn = system.driver().connect().unwrap();
        let count = conn
            .exec(Operation::Query(r#"SELECT COUNT(*) FROM "Customers""#.into()))
            .unwrap()
            .into_scalar()
            .unwrap();
        assert_eq!(count, Value::I64(1));
    }

    #[test]
    fn strings_are_clamped_to_precision() {
        let system = system();
        system.load(&descriptors(3));

        assert_eq!(
            system.clamp_value("Customers", "Name", Value::from("Annabel")),
            Value::from("Ann")
        );
        assert_eq!(system.clamp_value("Customers", "Missing", Value::from("x")), Value::from("x"));
        assert_eq!(system.clamp_value("Orders", "Customer", Value::I64(5)), Value::I64(5));
    }
}
