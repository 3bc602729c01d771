mod builder;
pub use builder::Builder;

mod connect;
pub use connect::connect;

use crate::{
    engine::{Principal, QueryEngine, ViewRequest},
    loader::LoadReport,
    system::{Reconciliation, SystemManager},
    Result,
};

use std::sync::Arc;
use tabula_core::{Driver, RowSet};

/// Shared state between all `Db` clones.
pub(crate) struct Shared {
    pub(crate) engine: QueryEngine,

    /// What the initial load registered.
    pub(crate) report: LoadReport,
}

/// A handle to a loaded schema and the database behind it. Cloning is cheap;
/// every clone drives the same engine.
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.shared.engine
    }

    pub fn system(&self) -> &Arc<SystemManager> {
        self.shared.engine.system()
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        self.system().driver()
    }

    /// Tables and views registered by the build, and the objects rejected.
    pub fn report(&self) -> &LoadReport {
        &self.shared.report
    }

    /// See [`SystemManager::reconcile`].
    pub fn reconcile(&self, dry_run: bool) -> Result<Reconciliation> {
        self.system().reconcile(dry_run)
    }

    pub fn get_view_data(&self, principal: &Principal, view: &str, request: &ViewRequest) -> Result<RowSet> {
        self.shared.engine.get_view_data(principal, view, request)
    }

    /// Hands unused ids back to the sequence table.
    pub fn shutdown(&self) -> Result<()> {
        self.shared.engine.shutdown()
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("engine", &self.shared.engine)
            .field("tables", &self.shared.report.tables.len())
            .field("views", &self.shared.report.views.len())
            .finish()
    }
}
