//! Builds a [`SchemaCatalog`] from table and view descriptors.
//!
//! A broken descriptor only takes itself down: it is rejected with a
//! warning and everything else keeps loading. Tables whose relations point
//! at rejected or unknown tables are rejected in turn.

use crate::{
    catalog::{ConditionProvider, SchemaCatalog},
    view::{View, ViewCompiler},
    Result,
};

use indexmap::IndexMap;
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
    sync::Arc,
};
use tabula_core::{
    driver::Dialect,
    schema::{
        descriptor::{self, ColumnDescriptor, TableDescriptor, ViewDescriptor},
        normalize, Table,
    },
    Error,
};

const TABLE_SUFFIX: &str = ".table.json";
const VIEW_SUFFIX: &str = ".view.json";

/// The descriptors of one load.
#[derive(Debug, Clone, Default)]
pub struct Descriptors {
    pub tables: Vec<TableDescriptor>,
    pub views: Vec<ViewDescriptor>,

    /// Files that could not be parsed.
    pub rejected: Vec<Rejected>,
}

/// An object left out of the catalog, and why.
#[derive(Debug, Clone)]
pub struct Rejected {
    pub name: String,
    pub error: Error,
}

/// What a load registered.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub tables: Vec<String>,
    pub views: Vec<String>,
    pub rejected: Vec<Rejected>,
}

impl Descriptors {
    pub fn new() -> Descriptors {
        Descriptors::default()
    }

    pub fn table(mut self, desc: TableDescriptor) -> Self {
        self.tables.push(desc);
        self
    }

    pub fn view(mut self, desc: ViewDescriptor) -> Self {
        self.views.push(desc);
        self
    }

    /// Reads every `*.table.json` and `*.view.json` file of `module_dir`. A
    /// file of the same name in `local_dir` is merged on top of the module
    /// file.
    pub fn read_dir(module_dir: &Path, local_dir: Option<&Path>) -> Result<Descriptors> {
        let mut names = vec![];
        for entry in fs::read_dir(module_dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(TABLE_SUFFIX) || name.ends_with(VIEW_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        let mut descriptors = Descriptors::new();

        for name in names {
            let module = fs::read_to_string(module_dir.join(&name))?;
            let local = match local_dir.map(|dir| dir.join(&name)) {
                Some(path) if path.is_file() => Some(fs::read_to_string(path)?),
                _ => None,
            };

            let parsed = if name.ends_with(TABLE_SUFFIX) {
                descriptor::from_layers::<TableDescriptor>(&module, local.as_deref())
                    .map(|desc| descriptors.tables.push(desc))
            } else {
                descriptor::from_layers::<ViewDescriptor>(&module, local.as_deref())
                    .map(|desc| descriptors.views.push(desc))
            };

            if let Err(err) = parsed {
                let err = err.context(Error::schema_definition(&name, "descriptor file is invalid"));
                tracing::warn!(file = %name, error = %err, "rejected descriptor file");
                descriptors.rejected.push(Rejected { name, error: err });
            }
        }

        tracing::debug!(
            dir = %module_dir.display(),
            tables = descriptors.tables.len(),
            views = descriptors.views.len(),
            "read descriptors"
        );
        Ok(descriptors)
    }
}

impl LoadReport {
    fn reject(&mut self, name: &str, error: Error) {
        tracing::warn!(object = %name, error = %error, "rejected schema object");
        self.rejected.push(Rejected {
            name: name.to_string(),
            error,
        });
    }

    pub fn is_rejected(&self, name: &str) -> bool {
        self.rejected
            .iter()
            .any(|rejected| rejected.name.eq_ignore_ascii_case(name))
    }
}

/// Registers tables, then views. Tables without a declared view of the same
/// name get a default view over their fields.
pub(crate) fn build_catalog(
    dialect: Dialect,
    descriptors: &Descriptors,
    providers: &HashMap<String, Arc<dyn ConditionProvider>>,
) -> (SchemaCatalog, LoadReport) {
    let mut report = LoadReport {
        rejected: descriptors.rejected.clone(),
        ..LoadReport::default()
    };

    let mut tables: IndexMap<String, Table> = IndexMap::new();
    for desc in &descriptors.tables {
        match Table::from_descriptor(desc, dialect) {
            Ok(table) => {
                let key = normalize(&table.name);
                if tables.contains_key(&key) {
                    let err = Error::schema_definition(&table.name, "duplicate table");
                    report.reject(&table.name, err);
                    continue;
                }
                tables.insert(key, table);
            }
            Err(err) => report.reject(desc.name.trim(), err),
        }
    }

    // Rejecting a table can leave others dangling, repeat until stable.
    loop {
        let dangling: Vec<(String, String)> = tables
            .values()
            .filter_map(|table| Some((table.name.clone(), dangling_reference(table, &tables)?)))
            .collect();
        if dangling.is_empty() {
            break;
        }
        for (name, message) in dangling {
            tables.shift_remove(&normalize(&name));
            report.reject(&name, Error::schema_definition(&name, message));
        }
    }

    let id_names: HashMap<String, String> = tables
        .iter()
        .map(|(key, table)| (key.clone(), table.id_name.clone()))
        .collect();

    let mut catalog = SchemaCatalog::new();
    for (_, mut table) in tables {
        table.resolve_relations(|target| id_names.get(&normalize(target)).cloned());
        report.tables.push(table.name.clone());
        catalog.add_table(table);
    }
    for (key, provider) in providers {
        catalog.register_provider(key.clone(), provider.clone());
    }

    let mut declared = HashSet::new();
    let mut views: Vec<View> = vec![];

    for desc in &descriptors.views {
        if !declared.insert(normalize(&desc.name)) {
            let err = Error::schema_definition(desc.name.trim(), "duplicate view");
            report.reject(desc.name.trim(), err);
            continue;
        }
        match ViewCompiler::compile(&catalog, desc) {
            Ok(view) => views.push(view),
            Err(err) => report.reject(desc.name.trim(), err),
        }
    }

    for table in catalog.tables() {
        if declared.contains(&normalize(&table.name)) {
            continue;
        }
        let desc = default_view(table);
        match ViewCompiler::compile(&catalog, &desc) {
            Ok(view) => views.push(view),
            Err(err) => report.reject(&desc.name, err),
        }
    }

    for view in views {
        report.views.push(view.name.clone());
        catalog.add_view(view);
    }

    tracing::info!(
        tables = report.tables.len(),
        views = report.views.len(),
        rejected = report.rejected.len(),
        "schema loaded"
    );
    (catalog, report)
}

/// The first relation or foreign key of `table` pointing at a table, or a
/// target field, that is not registered.
fn dangling_reference(table: &Table, tables: &IndexMap<String, Table>) -> Option<String> {
    let mut relations = table.fields().filter_map(|field| field.relation.as_deref());
    if let Some(target) = relations.find(|target| !tables.contains_key(&normalize(target))) {
        return Some(format!("relation to unknown table {target}"));
    }

    for fk in &table.foreign_keys {
        let Some(target) = tables.get(&normalize(&fk.ref_table)) else {
            return Some(format!("relation to unknown table {}", fk.ref_table));
        };
        let unknown = fk.ref_fields.iter().find(|name| {
            let stored = target.field(name).is_some_and(|field| field.is_stored_in_owner());
            !stored && !name.eq_ignore_ascii_case(&target.id_name) && !name.eq_ignore_ascii_case(&target.version_name)
        });
        if let Some(field) = unknown {
            return Some(format!("foreign key {} to unknown field {}.{field}", fk.name, target.name));
        }
    }
    None
}

/// Every field readable without a locale, by field name.
fn default_view(table: &Table) -> ViewDescriptor {
    let mut desc = ViewDescriptor::new(&table.name, &table.name);
    desc.module = table.module.clone();
    for field in table.fields().filter(|field| !field.translatable) {
        desc.columns
            .push(ColumnDescriptor::simple(&field.name, &field.name));
    }
    desc
}
