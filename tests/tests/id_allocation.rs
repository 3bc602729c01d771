use pretty_assertions::assert_eq;
use std::sync::Arc;
use tabula::{
    schema::{
        descriptor::{FieldDescriptor, TableDescriptor},
        DataType,
    },
    stmt::Value,
    Db, EngineConfig,
};
use tabula_driver_sqlite::Sqlite;
use tests::*;

fn notes() -> TableDescriptor {
    TableDescriptor::new("Notes").field(FieldDescriptor::new("Body", DataType::Text))
}

fn builder(chunk: i64) -> tabula::db::Builder {
    let mut builder = Db::builder();
    builder
        .config(EngineConfig::default().id_chunk_size(chunk))
        .table(notes());
    builder
}

fn note(test: &Test, body: &str) -> i64 {
    test.insert("Notes", &[("Body", Value::from(body))])
}

/// Reservations made for `table`, one `UPDATE` per chunk.
fn reservations(log: &OpsLog, table: &str) -> usize {
    log.statements()
        .iter()
        .filter(|sql| sql.text.starts_with(r#"UPDATE "Sequences""#))
        .filter(|sql| sql.params.contains(&Value::from(table)))
        .count()
}

#[test]
fn ids_increase_and_cost_one_update_per_chunk() {
    let test = Test::new(&mut builder(10));

    let ids: Vec<i64> = (0..25).map(|n| note(&test, &format!("note {n}"))).collect();
    assert_eq!(ids, (1..=25).collect::<Vec<_>>());
    assert!(reservations(&test.log, "Notes") <= 3);
}

#[test]
fn explicit_ids_are_kept() {
    let test = Test::new(&mut builder(10));
    let id = test.insert("Notes", &[("ID", Value::I64(100)), ("Body", Value::from("mine"))]);
    assert_eq!(id, 100);

    // Seeding starts after the largest id present
    assert_eq!(note(&test, "next"), 101);
}

#[test]
fn handles_sharing_a_database_never_collide() {
    let path = temp_db("shared-ids");
    let first = Test::with_driver(&mut builder(5), Arc::new(Sqlite::open(&path)));
    let second = Test::with_driver(&mut builder(5), Arc::new(Sqlite::open(&path)));
    assert_ok!(first.db.reconcile(false));
    assert_ok!(second.db.reconcile(false));

    let mut ids = vec![];
    for n in 0..12 {
        let test = if n % 2 == 0 { &first } else { &second };
        ids.push(note(test, &format!("note {n}")));
    }

    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "{ids:?}");

    let (evens, odds): (Vec<_>, Vec<_>) = ids.iter().enumerate().partition(|(n, _)| n % 2 == 0);
    assert!(evens.windows(2).all(|w| w[0].1 < w[1].1));
    assert!(odds.windows(2).all(|w| w[0].1 < w[1].1));

    drop((first, second));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn shutdown_hands_back_the_unused_ids() {
    let path = temp_db("shutdown-ids");
    {
        let test = Test::with_driver(&mut builder(50), Arc::new(Sqlite::open(&path)));
        assert_eq!(note(&test, "a"), 1);
        assert_eq!(note(&test, "b"), 2);
        assert_ok!(test.db.shutdown());
    }

    let test = Test::with_driver(&mut builder(50), Arc::new(Sqlite::open(&path)));
    assert_eq!(note(&test, "c"), 3);

    drop(test);
    std::fs::remove_file(&path).unwrap();
}
