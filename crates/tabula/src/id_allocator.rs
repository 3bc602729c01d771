//! Hands out row ids in chunks reserved from the `Sequences` table.
//!
//! Each table has one row in `Sequences` holding the last id reserved for
//! it. An allocation bumps that value by the chunk size and serves the ids
//! in between from memory, so `n` ids cost at most `ceil(n / chunk)` round
//! trips. Several processes may share the table: the bump happens in a
//! transaction, so reservations never overlap.

use crate::{
    exec::{self, now_millis},
    system::Ddl,
    transaction, Result,
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use tabula_core::{
    driver::Capability,
    err,
    schema::{
        db::{Column, Table, TableRole},
        normalize, DataType, Key,
    },
    stmt::{Aggregate, ArithOp, Expr, Insert, Select, Update, Value},
    Connection,
};
use tabula_sql::Serializer;

pub const SEQUENCE_TABLE: &str = "Sequences";

const ID: &str = "ID";
const VERSION: &str = "Version";
const NAME: &str = "Name";
const LAST_VALUE: &str = "LastValue";

#[derive(Debug)]
pub struct IdAllocator {
    chunk: i64,
    serializer: Serializer,
    capability: &'static Capability,
    created: OnceCell<()>,
    windows: Mutex<HashMap<String, Window>>,
}

/// Ids `next + 1 ..= last` are free.
#[derive(Debug, Clone)]
struct Window {
    table: String,
    id_name: String,
    next: i64,
    last: i64,
}

impl Window {
    fn take(&mut self) -> Option<i64> {
        if self.next < self.last {
            self.next += 1;
            Some(self.next)
        } else {
            None
        }
    }
}

impl IdAllocator {
    pub fn new(chunk: i64, serializer: Serializer, capability: &'static Capability) -> IdAllocator {
        IdAllocator {
            chunk: chunk.max(1),
            serializer,
            capability,
            created: OnceCell::new(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// The next id of `table`. Opens its own transaction when the window is
    /// exhausted, so `conn` must not be inside one.
    pub fn next_id(&self, conn: &mut dyn Connection, table: &str, id_name: &str) -> Result<i64> {
        let mut windows = self.windows.lock();

        if let Some(id) = windows.get_mut(&normalize(table)).and_then(Window::take) {
            return Ok(id);
        }

        self.created
            .get_or_try_init(|| self.create_table(conn))?;

        let saved = windows.clone();
        let ret = transaction::transaction(conn, |conn| self.take(conn, &mut windows, table, id_name));
        if ret.is_err() {
            // The reservations were rolled back with the transaction.
            *windows = saved;
        }
        ret
    }

    /// Gives unused reservations back where no other process reserved
    /// after us.
    pub fn shutdown(&self, conn: &mut dyn Connection) -> Result<()> {
        let mut windows = self.windows.lock();

        for (_, window) in windows.drain() {
            let persisted = self.last_value(conn, &window.table)?;
            if persisted != Some(window.last) {
                continue;
            }
            let max = self.max_id(conn, &window.table, &window.id_name)?;

            let mut update = Update::new(SEQUENCE_TABLE);
            update.add_constant(LAST_VALUE, max);
            update
                .and_filter(Expr::eq(Expr::name(NAME), Value::from(window.table.as_str())))
                .and_filter(Expr::eq(Expr::name(LAST_VALUE), Value::I64(window.last)));
            exec::run(conn, &self.serializer, update)?;

            tracing::debug!(table = %window.table, last = window.last, max, "returned unused ids");
        }
        Ok(())
    }

    fn take(
        &self,
        conn: &mut dyn Connection,
        windows: &mut HashMap<String, Window>,
        table: &str,
        id_name: &str,
    ) -> Result<i64> {
        let key = normalize(table);
        if let Some(id) = windows.get_mut(&key).and_then(Window::take) {
            return Ok(id);
        }

        let last = self.reserve(conn, windows, table, id_name)?;
        let mut window = Window {
            table: table.to_string(),
            id_name: id_name.to_string(),
            next: last - self.chunk,
            last,
        };
        let id = window
            .take()
            .ok_or_else(|| err!("empty id window for {table}"))?;
        windows.insert(key, window);
        Ok(id)
    }

    /// Moves the persisted last value of `table` one chunk ahead and
    /// returns it.
    fn reserve(
        &self,
        conn: &mut dyn Connection,
        windows: &mut HashMap<String, Window>,
        table: &str,
        id_name: &str,
    ) -> Result<i64> {
        let mut update = Update::new(SEQUENCE_TABLE);
        update.set(
            LAST_VALUE,
            Expr::arith(ArithOp::Add, vec![Expr::name(LAST_VALUE), Expr::value(self.chunk)]),
        );
        update.and_filter(Expr::eq(Expr::name(NAME), Value::from(table)));

        let count = exec::run(conn, &self.serializer, update)?.into_count()?;

        if count == 0 {
            // The sequence row of the sequence table is the first row of
            // all and takes id 1.
            let (row_id, seed) = if table.eq_ignore_ascii_case(SEQUENCE_TABLE) {
                (1, 1)
            } else {
                let seed = self.max_id(conn, table, id_name)?;
                (self.take(conn, windows, SEQUENCE_TABLE, ID)?, seed)
            };

            let mut insert = Insert::new(SEQUENCE_TABLE);
            insert
                .add_constant(ID, row_id)
                .add_constant(VERSION, now_millis())
                .add_constant(NAME, table)
                .add_constant(LAST_VALUE, seed + self.chunk);
            exec::run(conn, &self.serializer, insert)?;

            tracing::debug!(table, seed, "seeded sequence");
        }

        self.last_value(conn, table)?
            .ok_or_else(|| err!("sequence row for {table} is missing"))
    }

    fn last_value(&self, conn: &mut dyn Connection, table: &str) -> Result<Option<i64>> {
        let mut select = Select::new();
        select
            .add_from(SEQUENCE_TABLE, None)
            .add_field(Expr::name(LAST_VALUE), None)
            .and_filter(Expr::eq(Expr::name(NAME), Value::from(table)));
        Ok(exec::run(conn, &self.serializer, select)?.into_scalar()?.to_i64())
    }

    fn max_id(&self, conn: &mut dyn Connection, table: &str, id_name: &str) -> Result<i64> {
        let mut select = Select::new();
        select
            .add_from(table, None)
            .add_field(Expr::aggregate(Aggregate::Max, Expr::name(id_name)), None);
        Ok(exec::run(conn, &self.serializer, select)?
            .into_scalar()?
            .to_i64()
            .unwrap_or(0))
    }

    fn create_table(&self, conn: &mut dyn Connection) -> Result<()> {
        if !conn.db_fields(SEQUENCE_TABLE)?.is_empty() {
            return Ok(());
        }
        let mut ddl = Ddl {
            conn,
            serializer: &self.serializer,
            capability: self.capability,
        };
        ddl.create(&sequence_table())
    }
}

fn sequence_table() -> Table {
    let mut table = Table::new(SEQUENCE_TABLE, SEQUENCE_TABLE, TableRole::Main);
    table.columns = vec![
        Column::new(ID, DataType::Long, true),
        Column::new(VERSION, DataType::Long, true),
        Column::new(NAME, DataType::String, true).with_precision(Some(100), None),
        Column::new(LAST_VALUE, DataType::Long, true),
    ];
    table.keys = vec![
        Key::primary(SEQUENCE_TABLE, ID),
        Key::unique(SEQUENCE_TABLE, vec![NAME.to_string()]),
    ];
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::{driver::Operation, Driver};
    use tabula_driver_sqlite::Sqlite;

    fn allocator(chunk: i64) -> IdAllocator {
        IdAllocator::new(chunk, Serializer::sqlite(), &Capability::SQLITE)
    }

    fn scalar(conn: &mut dyn Connection, sql: &str) -> Value {
        conn.exec(Operation::Query(sql.into()))
            .unwrap()
            .into_scalar()
            .unwrap()
    }

    fn setup() -> Sqlite {
        let driver = Sqlite::in_memory().unwrap();
        let mut conn = driver.connect().unwrap();
        conn.exec(Operation::Batch(
            r#"CREATE TABLE "Orders" ("ID" BIGINT NOT NULL PRIMARY KEY); INSERT INTO "Orders" VALUES (7);"#
                .into(),
        ))
        .unwrap();
        driver
    }

    #[test]
    fn ids_continue_after_the_existing_rows() {
        let driver = setup();
        let mut conn = driver.connect().unwrap();
        let ids = allocator(3);

        let got: Vec<i64> = (0..5)
            .map(|_| ids.next_id(&mut *conn, "Orders", "ID").unwrap())
            .collect();
        assert_eq!(got, vec![8, 9, 10, 11, 12]);

        assert_eq!(
            scalar(&mut *conn, r#"SELECT "LastValue" FROM "Sequences" WHERE "Name" = 'Orders'"#),
            Value::I64(13)
        );
        // The sequence table numbers its own row first.
        assert_eq!(
            scalar(&mut *conn, r#"SELECT "ID" FROM "Sequences" WHERE "Name" = 'Sequences'"#),
            Value::I64(1)
        );
        assert_eq!(
            scalar(&mut *conn, r#"SELECT "ID" FROM "Sequences" WHERE "Name" = 'Orders'"#),
            Value::I64(2)
        );
    }

    #[test]
    fn allocators_sharing_a_database_never_collide() {
        let driver = setup();
        let mut conn = driver.connect().unwrap();
        let a = allocator(4);
        let b = allocator(4);

        let mut seen = vec![];
        for i in 0..20 {
            let allocator = if i % 3 == 0 { &a } else { &b };
            seen.push(allocator.next_id(&mut *conn, "Orders", "ID").unwrap());
        }
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), seen.len());
    }

    #[test]
    fn shutdown_returns_the_unused_chunk() {
        let driver = setup();
        let mut conn = driver.connect().unwrap();
        let ids = allocator(50);

        assert_eq!(ids.next_id(&mut *conn, "Orders", "ID").unwrap(), 8);
        conn.exec(Operation::Batch(r#"INSERT INTO "Orders" VALUES (8);"#.into()))
            .unwrap();
        ids.shutdown(&mut *conn).unwrap();

        assert_eq!(
            scalar(&mut *conn, r#"SELECT "LastValue" FROM "Sequences" WHERE "Name" = 'Orders'"#),
            Value::I64(8)
        );
        assert_eq!(ids.next_id(&mut *conn, "Orders", "ID").unwrap(), 9);
    }
}
