use crate::{view::View, Result};

use indexmap::IndexMap;
use std::{collections::HashMap, fmt, sync::Arc};
use tabula_core::{
    schema::{self, name, Table},
    stmt::Expr,
    Error,
};

/// Lifecycle state of a registered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableState {
    /// Not yet verified against the database.
    #[default]
    Inactive,

    /// A structural change is being applied.
    Rebuilding,

    /// Verified in this process; no further checks until the catalog is
    /// reloaded.
    Active,
}

/// Builds the condition behind a [`Filter::Custom`](tabula_core::Filter).
pub trait ConditionProvider: Send + Sync {
    /// Returns `None` to leave the query unrestricted.
    fn condition(&self, view: &View, args: &[String]) -> Result<Option<Expr>>;
}

impl<F> ConditionProvider for F
where
    F: Fn(&View, &[String]) -> Result<Option<Expr>> + Send + Sync,
{
    fn condition(&self, view: &View, args: &[String]) -> Result<Option<Expr>> {
        self(view, args)
    }
}

/// Lookups the view compiler needs while building sub-queries.
pub trait ViewFinder {
    fn find_view(&self, name: &str) -> Option<Arc<View>>;

    fn condition_provider(&self, key: &str) -> Option<Arc<dyn ConditionProvider>>;
}

/// Registered tables and compiled views, keyed by normalized name.
#[derive(Default)]
pub struct SchemaCatalog {
    tables: IndexMap<String, Arc<Table>>,
    views: IndexMap<String, Arc<View>>,
    providers: HashMap<String, Arc<dyn ConditionProvider>>,
    states: HashMap<String, TableState>,
}

impl SchemaCatalog {
    pub fn new() -> SchemaCatalog {
        SchemaCatalog::default()
    }

    pub fn table(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.get(&schema::normalize(name))
    }

    pub fn table_or_err(&self, name: &str) -> Result<&Arc<Table>> {
        self.table(name).ok_or_else(|| Error::unknown_table(name))
    }

    pub fn view(&self, name: &str) -> Option<&Arc<View>> {
        self.views.get(&schema::normalize(name))
    }

    pub fn view_or_err(&self, name: &str) -> Result<&Arc<View>> {
        self.view(name).ok_or_else(|| Error::unknown_view(name))
    }

    pub fn tables(&self) -> impl ExactSizeIterator<Item = &Arc<Table>> + '_ {
        self.tables.values()
    }

    pub fn views(&self) -> impl ExactSizeIterator<Item = &Arc<View>> + '_ {
        self.views.values()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.view(name).is_some()
    }

    pub(crate) fn add_table(&mut self, table: Table) {
        let key = schema::normalize(&table.name);
        self.states.insert(key.clone(), TableState::Inactive);
        self.tables.insert(key, Arc::new(table));
    }

    pub(crate) fn add_view(&mut self, view: View) {
        self.views
            .insert(schema::normalize(&view.name), Arc::new(view));
    }

    pub fn register_provider(&mut self, key: impl Into<String>, provider: Arc<dyn ConditionProvider>) {
        self.providers.insert(schema::normalize(&key.into()), provider);
    }

    pub(crate) fn providers(&self) -> &HashMap<String, Arc<dyn ConditionProvider>> {
        &self.providers
    }

    pub fn state(&self, table: &str) -> TableState {
        self.states
            .get(&schema::normalize(table))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn set_state(&mut self, table: &str, state: TableState) {
        if let Some(entry) = self.states.get_mut(&schema::normalize(table)) {
            *entry = state;
        }
    }

    pub fn is_active(&self, table: &str) -> bool {
        self.state(table) == TableState::Active
    }

    /// The registered table owning the physical table `physical`: the table
    /// itself, or the owner of a satellite.
    pub fn logical_table(&self, physical: &str) -> Option<&Arc<Table>> {
        if let Some(table) = self.table(physical) {
            return Some(table);
        }
        [
            name::EXTENSION_SUFFIX,
            name::TRANSLATION_SUFFIX,
            name::STATE_SUFFIX,
            name::AUDIT_SUFFIX,
        ]
        .iter()
        .find_map(|suffix| {
            let owner = strip_suffix_ignore_case(physical, suffix)?;
            self.table(owner)
        })
    }
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    let (head, tail) = (name.get(..split)?, name.get(split..)?);
    (!head.is_empty() && tail.eq_ignore_ascii_case(suffix)).then_some(head)
}

impl ViewFinder for SchemaCatalog {
    fn find_view(&self, name: &str) -> Option<Arc<View>> {
        self.view(name).cloned()
    }

    fn condition_provider(&self, key: &str) -> Option<Arc<dyn ConditionProvider>> {
        self.providers.get(&schema::normalize(key)).cloned()
    }
}

impl fmt::Debug for SchemaCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCatalog")
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .field("providers", &self.providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{
        driver::Dialect,
        schema::{
            descriptor::{FieldDescriptor, TableDescriptor},
            DataType,
        },
    };

    fn catalog() -> SchemaCatalog {
        let desc = TableDescriptor::new("Orders").field(FieldDescriptor::new("Total", DataType::Double));
        let mut catalog = SchemaCatalog::new();
        catalog.add_table(Table::from_descriptor(&desc, Dialect::Sqlite).unwrap());
        catalog
    }

    #[test]
    fn lookups_ignore_case() {
        let catalog = catalog();
        assert!(catalog.has_table("ORDERS"));
        assert!(catalog.table_or_err("Missing").unwrap_err().is_unknown_object());
        assert!(catalog.view_or_err("Orders").is_err());
    }

    #[test]
    fn satellites_map_to_their_owner() {
        let catalog = catalog();
        assert_eq!(catalog.logical_table("Orders_EXT").unwrap().name, "Orders");
        assert_eq!(catalog.logical_table("orders_state").unwrap().name, "Orders");
        assert!(catalog.logical_table("_EXT").is_none());
        assert!(catalog.logical_table("Customers_EXT").is_none());
    }

    #[test]
    fn tables_start_inactive() {
        let mut catalog = catalog();
        assert_eq!(catalog.state("Orders"), TableState::Inactive);

        catalog.set_state("orders", TableState::Active);
        assert!(catalog.is_active("Orders"));

        // Unknown tables never become active
        catalog.set_state("Missing", TableState::Active);
        assert!(!catalog.is_active("Missing"));
    }
}
