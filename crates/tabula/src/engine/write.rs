//! Writes through views, and row state maintenance.

use super::QueryEngine;
use crate::{
    exec::now_millis,
    transaction,
    view::{View, ViewColumn},
    Result,
};

use std::sync::Arc;
use tabula_core::{
    bail,
    event::{DataEvent, DataEventKind},
    schema::Table,
    stmt::{Delete, Expr, Insert, Select, Update, Value},
    Connection, Error,
};

/// Column values of one row, split by the physical table storing them.
#[derive(Debug, Default)]
struct Split {
    main: Vec<(String, Value)>,
    extension: Vec<(String, Value)>,
}

impl QueryEngine {
    /// Inserts a row through `view`. Before-stage handlers may add column
    /// values or veto the insert. Returns the id of the new row.
    pub fn insert_view_row(&self, view: &str, columns: Vec<String>, row: Vec<Value>) -> Result<i64> {
        let _schema = self.system.schema_in_use();
        let (view, table) = self.writable(view)?;

        let mut event = DataEvent::view_insert(&view.name, columns, row);
        self.post_before(&mut event)?;
        let split = self.split(&view, &table, &event)?;

        let mut conn = self.connect()?;
        self.activate(&mut *conn, &[table.name.as_str()])?;

        let id = self.ids.next_id(&mut *conn, &table.name, &table.id_name)?;
        let version = now_millis();

        transaction::transaction(&mut *conn, |conn| {
            let mut insert = Insert::new(&table.name);
            insert
                .add_constant(&table.id_name, id)
                .add_constant(&table.version_name, version);
            for (field, value) in split.main.iter().cloned() {
                insert.add_constant(field, value);
            }
            self.update_with(conn, insert.into())?;

            if !split.extension.is_empty() {
                self.insert_extension(conn, &table, id, version, &split.extension)?;
            }
            Ok(())
        })?;

        if let DataEventKind::ViewInsert { id: slot, .. } = &mut event.kind {
            *slot = Some(id);
        }
        event.set_after();
        self.events.post(&mut event);
        Ok(id)
    }

    /// Writes changed values of row `id`, provided it still has `version`.
    /// Returns the new version.
    pub fn update_view_row(
        &self,
        view: &str,
        id: i64,
        version: i64,
        columns: Vec<String>,
        row: Vec<Value>,
    ) -> Result<i64> {
        let _schema = self.system.schema_in_use();
        let (view, table) = self.writable(view)?;

        let mut event = DataEvent::view_update(&view.name, id, version, columns, row);
        self.post_before(&mut event)?;
        let split = self.split(&view, &table, &event)?;

        let mut conn = self.connect()?;
        self.activate(&mut *conn, &[table.name.as_str()])?;

        let next = now_millis().max(version + 1);

        transaction::transaction(&mut *conn, |conn| {
            let mut update = Update::new(&table.name);
            update.add_constant(&table.version_name, next);
            for (field, value) in split.main.iter().cloned() {
                update.add_constant(field, value);
            }
            update
                .and_filter(Expr::eq(Expr::name(&table.id_name), Value::I64(id)))
                .and_filter(Expr::eq(Expr::name(&table.version_name), Value::I64(version)));

            if self.update_with(conn, update.into())? == 0 {
                return Err(Error::validation(vec![format!(
                    "row {id} of {} was changed or deleted by someone else",
                    table.name
                )]));
            }

            if !split.extension.is_empty() {
                let mut update = Update::new(table.extension_name());
                update.add_constant(&table.version_name, next);
                for (field, value) in split.extension.iter().cloned() {
                    update.add_constant(field, value);
                }
                update.and_filter(Expr::eq(Expr::name(&table.id_name), Value::I64(id)));

                if self.update_with(conn, update.into())? == 0 {
                    self.insert_extension(conn, &table, id, next, &split.extension)?;
                }
            }
            Ok(())
        })?;

        event.set_after();
        self.events.post(&mut event);
        Ok(next)
    }

    /// Deletes rows of the view's source table. Satellite rows go with
    /// them through their cascading foreign keys.
    pub fn delete_view_rows(&self, view: &str, ids: &[i64]) -> Result<u64> {
        let _schema = self.system.schema_in_use();
        let (view, table) = self.writable(view)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut event = DataEvent::view_delete(&view.name, ids.to_vec());
        self.post_before(&mut event)?;
        let DataEventKind::ViewDelete { ids, .. } = &event.kind else {
            bail!("view delete event changed kind");
        };

        let mut delete = Delete::new(&table.name);
        delete.and_filter(Expr::in_list(
            Expr::name(&table.id_name),
            ids.iter().copied().map(Value::I64).collect(),
        ));

        let mut conn = self.connect()?;
        self.activate(&mut *conn, &[table.name.as_str()])?;
        let count = self.update_with(&mut *conn, delete.into())?;

        event.set_after();
        self.events.post(&mut event);
        Ok(count)
    }

    /// Replaces the bits of `state` for row `id`: the bits of `principals`
    /// are set, all others cleared.
    pub fn set_row_state(&self, table: &str, id: i64, state: &str, principals: &[i64]) -> Result<u64> {
        let _schema = self.system.schema_in_use();
        let table = self.system.catalog().table_or_err(table)?.clone();
        let Some(state) = table.state(state) else {
            return Err(Error::schema_definition(&table.name, format!("no state {state}")));
        };

        let state_columns = self.state_columns();
        let masks = state.masks(principals, state_columns);
        let values: Vec<(String, Value)> = state
            .columns(state_columns)
            .into_iter()
            .map(|column| {
                let mask = masks.iter().find(|(c, _)| *c == column).map(|(_, mask)| *mask);
                (column, Value::from(mask))
            })
            .collect();

        let state_table = table.state_name();
        let mut conn = self.connect()?;
        self.activate(&mut *conn, &[table.name.as_str()])?;

        transaction::transaction(&mut *conn, |conn| {
            let mut update = Update::new(&state_table);
            for (column, value) in values.iter().cloned() {
                update.add_constant(column, value);
            }
            update.and_filter(Expr::eq(Expr::name(&table.id_name), Value::I64(id)));

            let count = self.update_with(conn, update.into())?;
            if count > 0 {
                return Ok(count);
            }

            let mut insert = Insert::new(&state_table);
            insert.add_constant(&table.id_name, id);
            for (column, value) in values.iter().cloned() {
                insert.add_constant(column, value);
            }
            self.update_with(conn, insert.into())
        })
    }

    /// Copies every row of `table` whose `column` equals `from`, with
    /// `column` set to `to`. The copies get new ids. Returns the number of
    /// rows copied.
    pub fn copy_data(&self, table: &str, column: &str, from: Value, to: Value) -> Result<u64> {
        let _schema = self.system.schema_in_use();
        if from.is_null() || to.is_null() {
            bail!("copying rows of {table} needs non-null values");
        }
        if from == to {
            bail!("copying rows of {table}: values must be different");
        }

        let table = self.system.catalog().table_or_err(table)?.clone();
        let column = table.field_or_err(column)?.name.clone();
        let fields: Vec<String> = table
            .fields()
            .filter(|field| field.is_stored_in_owner())
            .map(|field| field.name.clone())
            .collect();
        if !fields.contains(&column) {
            bail!("field {}.{column} is not stored in the table", table.name);
        }

        let mut select = Select::new();
        for field in &fields {
            select.add_field(Expr::field(&table.name, field), Some(field.clone()));
        }
        select
            .add_from(&table.name, None)
            .and_filter(Expr::eq(Expr::field(&table.name, &column), from));
        select.add_order(Expr::field(&table.name, &table.id_name), false);

        let mut conn = self.connect()?;
        self.activate(&mut *conn, &[table.name.as_str()])?;
        let (names, rows) = self.run(&mut *conn, select)?.into_rows()?;

        let mut copied = 0;
        for row in rows {
            let mut insert = Insert::new(&table.name);
            insert.add_constant(&column, to.clone());
            for (name, value) in names.iter().zip(row) {
                if !name.eq_ignore_ascii_case(&column) && !value.is_null() {
                    insert.add_constant(name, value);
                }
            }
            self.insert_with(&mut *conn, insert)?;
            copied += 1;
        }
        tracing::debug!(table = %table.name, copied, "copied rows");
        Ok(copied)
    }

    /// The view and its source table, when the view accepts writes.
    fn writable(&self, view: &str) -> Result<(Arc<View>, Arc<Table>)> {
        let catalog = self.system.catalog();
        let view = catalog.view_or_err(view)?.clone();
        if view.read_only {
            return Err(Error::validation(vec![format!("view {} is read-only", view.name)]));
        }
        let table = catalog.table_or_err(&view.source)?.clone();
        Ok((view, table))
    }

    /// Maps the written columns of `event` to fields of the source table.
    /// A name is a view column at the source level or, for values added by
    /// handlers, a field of the table.
    fn split(&self, view: &View, table: &Table, event: &DataEvent) -> Result<Split> {
        let (columns, added) = match &event.kind {
            DataEventKind::ViewInsert { columns, added, .. }
            | DataEventKind::ViewUpdate { columns, added, .. } => (columns, added),
            _ => bail!("event carries no row values"),
        };

        let mut split = Split::default();
        let names = columns.iter().chain(added.iter().map(|(name, _)| name));

        for name in names {
            let field = match view.column(name) {
                Some(column) if is_source_field(view, column) => column.field.as_deref(),
                Some(column) => {
                    return Err(Error::validation(vec![format!(
                        "column {} of view {} cannot be written",
                        column.name, view.name
                    )]))
                }
                None => None,
            };
            let field = match field {
                Some(field) => table.field_or_err(field)?,
                None => table.field(name).ok_or_else(|| Error::unknown_column(&view.name, name))?,
            };

            if field.is_computed() || field.translatable {
                return Err(Error::validation(vec![format!(
                    "field {}.{} cannot be written",
                    table.name, field.name
                )]));
            }

            let value = event.column_value(name).cloned().unwrap_or_default();
            let value = self.system.clamp_value(&table.name, &field.name, value);
            let target = if field.extended {
                &mut split.extension
            } else {
                &mut split.main
            };
            match target.iter_mut().find(|(f, _)| *f == field.name) {
                Some(slot) => slot.1 = value,
                None => target.push((field.name.clone(), value)),
            }
        }
        Ok(split)
    }

    fn insert_extension(
        &self,
        conn: &mut dyn Connection,
        table: &Table,
        id: i64,
        version: i64,
        values: &[(String, Value)],
    ) -> Result<u64> {
        let mut insert = Insert::new(table.extension_name());
        insert
            .add_constant(&table.id_name, id)
            .add_constant(&table.version_name, version);
        for (field, value) in values.iter().cloned() {
            insert.add_constant(field, value);
        }
        self.update_with(conn, insert.into())
    }
}

/// Columns read straight from a field of the source table.
fn is_source_field(view: &View, column: &ViewColumn) -> bool {
    column.parent.is_none()
        && column.field.is_some()
        && column.locale.is_none()
        && !column.computed
        && !column.is_aggregate()
        && column.table.eq_ignore_ascii_case(&view.source)
}
