use super::{connect, Db, Shared};
use crate::{
    catalog::ConditionProvider, engine::QueryEngine, loader::Descriptors, system::SystemManager,
    EngineConfig, Result,
};

use std::sync::Arc;
use tabula_core::{
    event::DataEventHandler,
    schema::descriptor::{TableDescriptor, ViewDescriptor},
    Driver,
};

/// Collects configuration, descriptors and handlers, then loads them into a
/// [`Db`].
#[derive(Default)]
pub struct Builder {
    config: EngineConfig,

    /// Descriptors given in code. Files from the configured directories are
    /// read at build time and come first.
    descriptors: Descriptors,

    handlers: Vec<Arc<dyn DataEventHandler>>,
    providers: Vec<(String, Arc<dyn ConditionProvider>)>,
}

impl Builder {
    pub fn config(&mut self, config: EngineConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn table(&mut self, desc: TableDescriptor) -> &mut Self {
        self.descriptors.tables.push(desc);
        self
    }

    pub fn view(&mut self, desc: ViewDescriptor) -> &mut Self {
        self.descriptors.views.push(desc);
        self
    }

    pub fn descriptors(&mut self, descriptors: Descriptors) -> &mut Self {
        self.descriptors.tables.extend(descriptors.tables);
        self.descriptors.views.extend(descriptors.views);
        self.descriptors.rejected.extend(descriptors.rejected);
        self
    }

    /// Registers a data event handler. Handlers run in registration order.
    pub fn handler(&mut self, handler: impl DataEventHandler + 'static) -> &mut Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn condition_provider(
        &mut self,
        key: impl Into<String>,
        provider: impl ConditionProvider + 'static,
    ) -> &mut Self {
        self.providers.push((key.into(), Arc::new(provider)));
        self
    }

    pub fn connect(&mut self, url: &str) -> Result<Db> {
        self.build(connect(url)?)
    }

    /// Loads the schema. Tables stay inactive until first used or until
    /// [`Db::reconcile`] runs.
    pub fn build(&mut self, driver: Arc<dyn Driver>) -> Result<Db> {
        let system = Arc::new(SystemManager::new(self.config.clone(), driver));
        for (key, provider) in &self.providers {
            system.register_provider(key.clone(), provider.clone());
        }

        let mut descriptors = match &self.config.module_dir {
            Some(dir) => Descriptors::read_dir(dir, self.config.local_dir.as_deref())?,
            None => Descriptors::new(),
        };
        descriptors.tables.extend(self.descriptors.tables.iter().cloned());
        descriptors.views.extend(self.descriptors.views.iter().cloned());
        descriptors.rejected.extend(self.descriptors.rejected.iter().cloned());

        let report = system.load(&descriptors);
        tracing::info!(
            driver = %system.driver().url(),
            tables = report.tables.len(),
            views = report.views.len(),
            rejected = report.rejected.len(),
            "built database handle"
        );

        let engine = QueryEngine::new(system);
        for handler in &self.handlers {
            engine.events().register_arc(handler.clone());
        }

        Ok(Db {
            shared: Arc::new(Shared { engine, report }),
        })
    }
}
