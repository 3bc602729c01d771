//! Runs reads and writes against the database.
//!
//! Every call takes one connection from the driver, activates the tables
//! the statement touches and posts data events around the work. Reads of a
//! view apply the row-level rights of the calling principal.
//!
//! Table rebuilds wait until no call is running, and calls wait for a
//! running rebuild.

mod messages;
use messages::Messages;

mod rights;

mod rows;
use rows::RowReader;

mod write;

use crate::{
    exec::{self, now_millis},
    id_allocator::IdAllocator,
    system::SystemManager,
    view::Order,
    Result,
};

use std::sync::Arc;
use tabula_core::{
    bail,
    driver::{DbCheck, DbField, DbForeignKey, DbIndex, DbKey, DbTrigger, Response},
    event::{DataEvent, DataEventKind, EventBus},
    schema::{DEFAULT_ID_NAME, DEFAULT_VERSION_NAME},
    stmt::{Expr, Insert, Select, SelectItem, Statement, Value},
    Connection, Error, Filter, RowSet, SimpleRowSet,
};

/// The caller a rights-sensitive operation runs for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub roles: Vec<i64>,

    /// Administrators bypass row-level rights.
    pub admin: bool,
}

impl Principal {
    pub fn user(user_id: i64, roles: Vec<i64>) -> Principal {
        Principal {
            user_id,
            roles,
            admin: false,
        }
    }

    pub fn admin(user_id: i64) -> Principal {
        Principal {
            user_id,
            roles: vec![],
            admin: true,
        }
    }
}

/// Which rows and columns of a view to read.
#[derive(Debug, Clone, Default)]
pub struct ViewRequest {
    pub filter: Option<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,

    /// Every visible column when `None`.
    pub columns: Option<Vec<String>>,
}

impl ViewRequest {
    pub fn new() -> ViewRequest {
        ViewRequest::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug)]
pub struct QueryEngine {
    system: Arc<SystemManager>,
    events: EventBus,
    ids: IdAllocator,
    messages: Messages,
}

impl QueryEngine {
    pub fn new(system: Arc<SystemManager>) -> QueryEngine {
        let config = system.config();
        let ids = IdAllocator::new(
            config.id_chunk_size,
            *system.serializer(),
            config.capability(),
        );
        let messages = Messages::new(config.message_rules());

        QueryEngine {
            system,
            events: EventBus::new(),
            ids,
            messages,
        }
    }

    pub fn system(&self) -> &Arc<SystemManager> {
        &self.system
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Reads the rows of `view` visible to `principal`.
    pub fn get_view_data(&self, principal: &Principal, view: &str, request: &ViewRequest) -> Result<RowSet> {
        let _schema = self.system.schema_in_use();
        let columns = request.columns.as_deref();

        let (view, table, mut select, infos) = {
            let catalog = self.system.catalog();
            let view = catalog.view_or_err(view)?.clone();
            let table = catalog.table_or_err(&view.source)?.clone();
            let select = view.query(request.filter.as_ref(), &request.order, columns, &*catalog)?;
            let infos = view.column_infos(columns)?;
            (view, table, select, infos)
        };
        select.limit = request.limit;
        select.offset = request.offset;

        let applied = rights::apply(
            &mut select,
            &view,
            &table,
            principal,
            self.state_columns(),
            true,
        );

        let mut conn = self.connect()?;
        self.activate(&mut *conn, &select.tables())?;

        let mut event = DataEvent::view_query(&view.name, select);
        self.post_before(&mut event)?;
        let DataEventKind::ViewQuery { query, .. } = &event.kind else {
            bail!("view query event changed kind");
        };

        let (names, rows) = self.run(&mut *conn, query.clone())?.into_rows()?;
        tracing::debug!(view = %view.name, rows = rows.len(), "view data");

        let reader = RowReader {
            view: &view.name,
            id_name: &view.id_name,
            version_name: &view.version_name,
            rights: applied,
            max_scale: self.system.config().max_decimal_scale,
        };
        let rowset = reader.read(infos, &names, rows);

        if let DataEventKind::ViewQuery { rowset: slot, .. } = &mut event.kind {
            *slot = Some(rowset);
        }
        event.set_after();
        self.events.post(&mut event);

        Ok(event.rowset_mut().map(std::mem::take).unwrap_or_default())
    }

    /// Number of rows of `view` visible to `principal`.
    pub fn get_view_size(&self, principal: &Principal, view: &str, filter: Option<&Filter>) -> Result<i64> {
        let _schema = self.system.schema_in_use();
        let select = self.visible_query(principal, view, filter, None)?;
        self.sql_count(select)
    }

    /// Distinct value combinations of `columns` with the number of rows
    /// holding each, in a `Count` column.
    pub fn get_histogram(
        &self,
        principal: &Principal,
        view: &str,
        filter: Option<&Filter>,
        columns: &[String],
        order: &[String],
    ) -> Result<SimpleRowSet> {
        let _schema = self.system.schema_in_use();
        const ALIAS: &str = "Hist";

        if columns.is_empty() {
            bail!("histogram of view {view} needs at least one column");
        }
        let mut inner = self.visible_query(principal, view, filter, Some(columns))?;
        inner.order_by.clear();

        let mut select = Select::new();
        select.add_from_query(inner, ALIAS);
        for column in columns {
            select.add_field(Expr::field(ALIAS, column), Some(column.clone()));
            select.add_group(Expr::field(ALIAS, column));
        }
        select.add_field(Expr::count_all(), Some("Count".to_string()));

        for column in order {
            if columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                select.add_order(Expr::field(ALIAS, column), false);
            } else {
                tracing::warn!(view, column = %column, "ignoring histogram order on unselected column");
            }
        }
        self.get_data(select)
    }

    /// Inserts a row, allocating its id and version when absent. Returns
    /// the id of the new row.
    ///
    /// The id allocator runs its own transaction, so this must not be called
    /// inside one.
    pub fn insert_data_with_response(&self, insert: Insert) -> Result<i64> {
        let _schema = self.system.schema_in_use();
        let mut conn = self.connect()?;
        self.activate(&mut *conn, &[insert.table.as_str()])?;
        self.insert_with(&mut *conn, insert)
    }

    /// Runs a write after the before-stage [`DataEvent`]. A handler adding
    /// error messages stops the write before any SQL runs. Returns the
    /// number of affected rows.
    pub fn update_data_with_response(&self, stmt: impl Into<Statement>) -> Result<u64> {
        let _schema = self.system.schema_in_use();
        let stmt = stmt.into();
        let mut conn = self.connect()?;
        self.activate(&mut *conn, &stmt.tables())?;
        self.update_with(&mut *conn, stmt)
    }

    /// Number of rows `select` returns.
    pub fn sql_count(&self, select: Select) -> Result<i64> {
        let wrap = select.distinct
            || select.is_grouped()
            || select.has_aggregates()
            || select.limit.is_some()
            || select.offset.is_some();

        let mut count = Select::new();
        if wrap {
            let mut inner = select;
            inner.order_by.clear();
            count.add_from_query(inner, "Cnt").add_field(Expr::count_all(), None);
        } else {
            count = select;
            count.fields = vec![SelectItem {
                expr: Expr::count_all(),
                alias: None,
            }];
            count.order_by.clear();
        }

        Ok(self.get_value(count)?.to_i64().unwrap_or(0))
    }

    /// Whether any row of `table` matches `condition`.
    pub fn sql_exists(&self, table: &str, condition: Option<Expr>) -> Result<bool> {
        let mut select = Select::new();
        select.add_from(table, None).add_field(Expr::value(1i64), None);
        if let Some(condition) = condition {
            select.and_filter(condition);
        }
        select.limit = Some(1);
        Ok(!self.get_data(select)?.is_empty())
    }

    pub fn get_data(&self, select: Select) -> Result<SimpleRowSet> {
        let (columns, rows) = self.query(select)?.into_rows()?;
        Ok(rows::simple_rowset(columns, rows))
    }

    /// The first column of the first row, `Null` when there is none.
    pub fn get_value(&self, select: Select) -> Result<Value> {
        self.query(select)?.into_scalar()
    }

    pub fn get_long(&self, select: Select) -> Result<Option<i64>> {
        Ok(self.get_value(select)?.to_i64())
    }

    /// Id of the first row of `table` whose `field` equals `value`.
    pub fn get_id_by(&self, table: &str, field: &str, value: impl Into<Value>) -> Result<Option<i64>> {
        let id_name = self.id_name(table);
        let mut select = Select::new();
        select
            .add_from(table, None)
            .add_field(Expr::field(table, &id_name), None)
            .and_filter(Expr::eq(Expr::field(table, field), value.into()));
        select.add_order(Expr::field(table, &id_name), false);
        select.limit = Some(1);
        self.get_long(select)
    }

    pub fn db_tables(&self) -> Result<Vec<String>> {
        self.connect()?.db_tables()
    }

    pub fn db_fields(&self, table: &str) -> Result<Vec<DbField>> {
        self.connect()?.db_fields(table)
    }

    /// Primary and unique keys of `table`, then its indexes.
    pub fn db_keys(&self, table: &str) -> Result<(Vec<DbKey>, Vec<DbIndex>)> {
        let mut conn = self.connect()?;
        Ok((conn.db_keys(table)?, conn.db_indexes(table)?))
    }

    /// Foreign keys of `table`, or of every table.
    pub fn db_foreign_keys(&self, table: Option<&str>) -> Result<Vec<DbForeignKey>> {
        self.connect()?.db_foreign_keys(table)
    }

    pub fn db_checks(&self, table: &str) -> Result<Vec<DbCheck>> {
        self.connect()?.db_checks(table)
    }

    pub fn db_triggers(&self, table: &str) -> Result<Vec<DbTrigger>> {
        self.connect()?.db_triggers(table)
    }

    /// Gives unused reserved ids back.
    pub fn shutdown(&self) -> Result<()> {
        let mut conn = self.connect()?;
        self.ids.shutdown(&mut *conn)
    }

    /// The view query with the visibility rights applied and no extra
    /// columns.
    fn visible_query(
        &self,
        principal: &Principal,
        view: &str,
        filter: Option<&Filter>,
        columns: Option<&[String]>,
    ) -> Result<Select> {
        let catalog = self.system.catalog();
        let view = catalog.view_or_err(view)?;
        let table = catalog.table_or_err(&view.source)?;
        let mut select = view.query(filter, &[], columns, &*catalog)?;
        rights::apply(
            &mut select,
            view,
            table,
            principal,
            self.state_columns(),
            false,
        );
        Ok(select)
    }

    fn query(&self, select: Select) -> Result<Response> {
        let _schema = self.system.schema_in_use();
        let mut conn = self.connect()?;
        self.activate(&mut *conn, &select.tables())?;
        self.run(&mut *conn, select)
    }

    fn insert_with(&self, conn: &mut dyn Connection, mut insert: Insert) -> Result<i64> {
        let (id_name, version_name) = self.id_version_names(&insert.table);

        let id = if insert.has_column(&id_name) {
            let Some(id) = insert.value(&id_name).and_then(Value::to_i64) else {
                bail!("insert into {} has a non-constant {id_name}", insert.table);
            };
            id
        } else {
            let id = self.ids.next_id(conn, &insert.table, &id_name)?;
            insert.add_constant(&id_name, id);
            id
        };
        if !insert.has_column(&version_name) {
            insert.add_constant(&version_name, now_millis());
        }

        self.update_with(conn, insert.into())?;
        Ok(id)
    }

    fn update_with(&self, conn: &mut dyn Connection, stmt: Statement) -> Result<u64> {
        let mut event = DataEvent::table_modify(stmt);
        self.post_before(&mut event)?;
        let DataEventKind::TableModify { query, .. } = &event.kind else {
            bail!("table modify event changed kind");
        };

        let count = self.run(conn, query.clone())?.into_count()?;
        tracing::debug!(table = event.target().unwrap_or_default(), count, "modified");

        if let DataEventKind::TableModify { update_count, .. } = &mut event.kind {
            *update_count = Some(count);
        }
        event.set_after();
        self.events.post(&mut event);
        Ok(count)
    }

    /// Posts the before stage. Error messages from handlers become a
    /// validation error.
    fn post_before(&self, event: &mut DataEvent) -> Result<()> {
        self.events.post(event);
        if event.has_errors() {
            return Err(Error::validation(event.messages().to_vec()));
        }
        Ok(())
    }

    fn run(&self, conn: &mut dyn Connection, stmt: impl Into<tabula_sql::Statement>) -> Result<Response> {
        exec::run(conn, self.system.serializer(), stmt).map_err(|err| self.messages.translate(err))
    }

    fn activate<S: AsRef<str>>(&self, conn: &mut dyn Connection, tables: &[S]) -> Result<()> {
        self.system.activate_with(conn, tables)
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        self.system.driver().connect()
    }

    fn state_columns(&self) -> usize {
        self.system.config().state_columns.max(1)
    }

    fn id_name(&self, table: &str) -> String {
        self.id_version_names(table).0
    }

    /// Id and version column names of the physical table `table`.
    fn id_version_names(&self, table: &str) -> (String, String) {
        match self.system.catalog().logical_table(table) {
            Some(owner) => (owner.id_name.clone(), owner.version_name.clone()),
            None => (DEFAULT_ID_NAME.to_string(), DEFAULT_VERSION_NAME.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EngineConfig, loader::Descriptors};
    use pretty_assertions::assert_eq;
    use tabula_core::{
        schema::{
            descriptor::{FieldDescriptor, TableDescriptor},
            DataType,
        },
        stmt::Update,
    };
    use tabula_driver_sqlite::Sqlite;

    fn engine() -> QueryEngine {
        let driver = Sqlite::in_memory().unwrap();
        let system = SystemManager::new(EngineConfig::default(), Arc::new(driver));
        let report = system.load(
            &Descriptors::new().table(
                TableDescriptor::new("Items")
                    .field(FieldDescriptor::new("Code", DataType::String).precision(10).unique())
                    .field(FieldDescriptor::new("Qty", DataType::Integer)),
            ),
        );
        assert!(report.rejected.is_empty());
        QueryEngine::new(Arc::new(system))
    }

    fn insert(engine: &QueryEngine, code: &str, qty: i32) -> Result<i64> {
        let mut insert = Insert::new("Items");
        insert.add_constant("Code", code).add_constant("Qty", qty);
        engine.insert_data_with_response(insert)
    }

    fn items() -> Select {
        let mut select = Select::new();
        select
            .add_from("Items", None)
            .add_field(Expr::field("Items", "Qty"), None);
        select
    }

    #[test]
    fn inserts_get_ids_and_versions() {
        let engine = engine();
        assert_eq!(insert(&engine, "a", 1).unwrap(), 1);
        assert_eq!(insert(&engine, "b", 1).unwrap(), 2);

        let mut select = Select::new();
        select
            .add_from("Items", None)
            .add_field(Expr::field("Items", "Version"), None)
            .and_filter(Expr::eq(Expr::field("Items", "ID"), Value::I64(2)));
        assert!(engine.get_long(select).unwrap().unwrap() > 0);
        assert_eq!(engine.get_id_by("Items", "Code", "b").unwrap(), Some(2));
        assert_eq!(engine.get_id_by("Items", "Code", "z").unwrap(), None);
    }

    #[test]
    fn driver_errors_are_translated() {
        let engine = engine();
        insert(&engine, "a", 1).unwrap();

        let err = insert(&engine, "a", 2).unwrap_err();
        assert!(err.is_query_failed());
        assert_eq!(err.to_string(), "Duplicate value: Items.Code must be unique");
    }

    #[test]
    fn vetoed_writes_run_no_sql() {
        let engine = engine();
        insert(&engine, "a", 1).unwrap();
        engine.events().register(|event: &mut DataEvent| {
            if event.is_before() && matches!(event.kind, DataEventKind::TableModify { .. }) {
                event.add_error_message("frozen");
            }
        });

        let mut update = Update::new("Items");
        update.add_constant("Qty", 5);
        let err = engine.update_data_with_response(update).unwrap_err();
        assert_eq!(err.validation_messages(), Some(&["frozen".to_string()][..]));

        let mut select = items();
        select.and_filter(Expr::eq(Expr::field("Items", "Qty"), Value::I64(5)));
        assert!(!engine.sql_exists("Items", Some(Expr::eq(Expr::name("Qty"), Value::I64(5)))).unwrap());
        assert_eq!(engine.sql_count(select).unwrap(), 0);
    }

    #[test]
    fn counts_wrap_grouped_queries() {
        let engine = engine();
        for (code, qty) in [("a", 1), ("b", 1), ("c", 2)] {
            insert(&engine, code, qty).unwrap();
        }

        assert_eq!(engine.sql_count(items()).unwrap(), 3);

        let mut grouped = items();
        grouped.add_group(Expr::field("Items", "Qty"));
        assert_eq!(engine.sql_count(grouped).unwrap(), 2);

        let mut distinct = items();
        distinct.distinct = true;
        assert_eq!(engine.sql_count(distinct).unwrap(), 2);
    }

    #[test]
    fn rebuilds_wait_for_running_calls() {
        use std::{
            sync::atomic::{AtomicBool, Ordering},
            thread,
            time::Duration,
        };

        let engine = engine();
        insert(&engine, "a", 1).unwrap();

        let rebuilt = Arc::new(AtomicBool::new(false));
        let rebuild = Arc::new(parking_lot::Mutex::new(None));
        let seen_during_query = Arc::new(parking_lot::Mutex::new(None));

        let (system, done, handle, seen) = (
            engine.system().clone(),
            rebuilt.clone(),
            rebuild.clone(),
            seen_during_query.clone(),
        );
        engine.events().register(move |event: &mut DataEvent| {
            if !event.is_before() || !matches!(event.kind, DataEventKind::ViewQuery { .. }) {
                return;
            }
            let (system, thread_done) = (system.clone(), done.clone());
            *handle.lock() = Some(thread::spawn(move || {
                let out = system.rebuild_table("Items");
                thread_done.store(true, Ordering::SeqCst);
                out
            }));
            thread::sleep(Duration::from_millis(200));
            *seen.lock() = Some(done.load(Ordering::SeqCst));
        });

        let rows = engine
            .get_view_data(&Principal::admin(1), "Items", &ViewRequest::new())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(*seen_during_query.lock(), Some(false));

        let out = rebuild.lock().take().unwrap().join().unwrap().unwrap();
        assert_eq!(out.rebuilt, vec!["Items"]);
        assert!(rebuilt.load(Ordering::SeqCst));
        assert_eq!(engine.sql_count(items()).unwrap(), 1);
    }

    #[test]
    fn after_stage_sees_the_update_count() {
        let engine = engine();
        insert(&engine, "a", 1).unwrap();
        insert(&engine, "b", 1).unwrap();

        let counts = Arc::new(parking_lot::Mutex::new(vec![]));
        let seen = counts.clone();
        engine.events().register(move |event: &mut DataEvent| {
            if let DataEventKind::TableModify { update_count, .. } = &event.kind {
                if event.is_after() {
                    seen.lock().push(*update_count);
                }
            }
        });

        let mut update = Update::new("Items");
        update.add_constant("Qty", 3);
        assert_eq!(engine.update_data_with_response(update).unwrap(), 2);
        assert_eq!(*counts.lock(), vec![Some(2)]);
    }
}
