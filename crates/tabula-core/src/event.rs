//! Synchronous before/after notifications around reads and writes.
//!
//! Each event is posted twice: once in the [`Stage::Before`] stage, where
//! handlers may veto a write by adding error messages, and once in the
//! [`Stage::After`] stage with the outcome filled in. Handlers run in
//! registration order. A panicking handler is a bug and is not caught.

use crate::{
    rowset::RowSet,
    stmt::{Select, Statement, Value},
};

use parking_lot::RwLock;
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataEventKind {
    /// A raw statement against a table.
    TableModify {
        query: Statement,
        /// Rows affected, set for the after stage.
        update_count: Option<u64>,
    },

    /// A new row written through a view.
    ViewInsert {
        view: String,
        columns: Vec<String>,
        row: Vec<Value>,
        /// Column values added by before-stage handlers, persisted with the row.
        added: Vec<(String, Value)>,
        /// Id of the new row, set for the after stage.
        id: Option<i64>,
    },

    /// Changed values of one row written through a view.
    ViewUpdate {
        view: String,
        id: i64,
        version: i64,
        columns: Vec<String>,
        row: Vec<Value>,
        added: Vec<(String, Value)>,
    },

    ViewDelete {
        view: String,
        ids: Vec<i64>,
    },

    /// A read of a view. After-stage handlers may edit the row set.
    ViewQuery {
        view: String,
        query: Select,
        rowset: Option<RowSet>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataEvent {
    stage: Stage,
    pub kind: DataEventKind,
    messages: Vec<String>,
}

impl DataEvent {
    pub fn new(kind: DataEventKind) -> DataEvent {
        DataEvent {
            stage: Stage::Before,
            kind,
            messages: vec![],
        }
    }

    pub fn table_modify(query: Statement) -> DataEvent {
        DataEvent::new(DataEventKind::TableModify {
            query,
            update_count: None,
        })
    }

    pub fn view_insert(view: impl Into<String>, columns: Vec<String>, row: Vec<Value>) -> DataEvent {
        DataEvent::new(DataEventKind::ViewInsert {
            view: view.into(),
            columns,
            row,
            added: vec![],
            id: None,
        })
    }

    pub fn view_update(
        view: impl Into<String>,
        id: i64,
        version: i64,
        columns: Vec<String>,
        row: Vec<Value>,
    ) -> DataEvent {
        DataEvent::new(DataEventKind::ViewUpdate {
            view: view.into(),
            id,
            version,
            columns,
            row,
            added: vec![],
        })
    }

    pub fn view_delete(view: impl Into<String>, ids: Vec<i64>) -> DataEvent {
        DataEvent::new(DataEventKind::ViewDelete {
            view: view.into(),
            ids,
        })
    }

    pub fn view_query(view: impl Into<String>, query: Select) -> DataEvent {
        DataEvent::new(DataEventKind::ViewQuery {
            view: view.into(),
            query,
            rowset: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_before(&self) -> bool {
        self.stage == Stage::Before
    }

    pub fn is_after(&self) -> bool {
        self.stage == Stage::After
    }

    /// Moves the event to the after stage.
    pub fn set_after(&mut self) {
        self.stage = Stage::After;
    }

    /// Records a validation failure. Only meaningful in the before stage.
    pub fn add_error_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// View, or target table, the event is about.
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            DataEventKind::TableModify { query, .. } => query.target(),
            DataEventKind::ViewInsert { view, .. }
            | DataEventKind::ViewUpdate { view, .. }
            | DataEventKind::ViewDelete { view, .. }
            | DataEventKind::ViewQuery { view, .. } => Some(view),
        }
    }

    /// Adds a column value to a view insert or update. Returns false for
    /// other events.
    pub fn add_column(&mut self, column: impl Into<String>, value: impl Into<Value>) -> bool {
        match &mut self.kind {
            DataEventKind::ViewInsert { added, .. } | DataEventKind::ViewUpdate { added, .. } => {
                added.push((column.into(), value.into()));
                true
            }
            _ => false,
        }
    }

    /// The value written to `column` by a view insert or update, including
    /// values added by handlers.
    pub fn column_value(&self, column: &str) -> Option<&Value> {
        let (columns, row, added) = match &self.kind {
            DataEventKind::ViewInsert {
                columns, row, added, ..
            }
            | DataEventKind::ViewUpdate {
                columns, row, added, ..
            } => (columns, row, added),
            _ => return None,
        };
        added
            .iter()
            .rev()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
            .or_else(|| {
                columns
                    .iter()
                    .position(|name| name.eq_ignore_ascii_case(column))
                    .and_then(|index| row.get(index))
            })
    }

    pub fn rowset_mut(&mut self) -> Option<&mut RowSet> {
        match &mut self.kind {
            DataEventKind::ViewQuery { rowset, .. } => rowset.as_mut(),
            _ => None,
        }
    }
}

/// Receives data events.
pub trait DataEventHandler: Send + Sync {
    fn on_event(&self, event: &mut DataEvent);
}

impl<F> DataEventHandler for F
where
    F: Fn(&mut DataEvent) + Send + Sync,
{
    fn on_event(&self, event: &mut DataEvent) {
        self(event)
    }
}

/// Dispatches events to registered handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn DataEventHandler>>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn register(&self, handler: impl DataEventHandler + 'static) {
        self.handlers.write().push(Arc::new(handler));
    }

    pub fn register_arc(&self, handler: Arc<dyn DataEventHandler>) {
        self.handlers.write().push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Runs every handler on `event`, in registration order. Handlers may
    /// register further handlers; those see the next event.
    pub fn post(&self, event: &mut DataEvent) {
        let handlers = self.handlers.read().clone();
        tracing::trace!(
            target = event.target().unwrap_or_default(),
            stage = ?event.stage(),
            handlers = handlers.len(),
            "posting data event"
        );
        for handler in handlers {
            handler.on_event(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.len())
            .finish()
    }
}
