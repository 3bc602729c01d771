use pretty_assertions::assert_eq;
use std::sync::Arc;
use tabula::{
    schema::{
        descriptor::{ColumnDescriptor, ExpressionDescriptor, FieldDescriptor, TableDescriptor, ViewDescriptor},
        DataType,
    },
    stmt::Value,
    system::Diagnostic,
    Db, Descriptors, Principal, ViewRequest,
};
use tabula_driver_sqlite::Sqlite;
use tests::*;

fn customers_with_name(length: u32) -> TableDescriptor {
    TableDescriptor::new("Customers")
        .field(FieldDescriptor::new("Name", DataType::String).precision(length).not_null())
}

#[test]
fn reconcile_is_idempotent() {
    let mut builder = Db::builder();
    builder.table(customers()).table(orders());
    let test = Test::new(&mut builder);
    assert_empty!(test.db.report().rejected);

    let first = assert_ok!(test.db.reconcile(false));
    assert_eq!(first.activated, vec!["Customers", "Orders"]);
    assert!(first.rebuilt.contains(&"Customers".to_string()));
    assert!(!test.log.batches().is_empty());

    let dry = assert_ok!(test.db.reconcile(true));
    assert_empty!(dry.diagnostics);

    test.log.clear();
    let second = assert_ok!(test.db.reconcile(false));
    assert_empty!(second.rebuilt);
    assert_empty!(second.activated);
    assert_empty!(test.log.batches());
}

#[test]
fn first_use_activates_lazily() {
    let mut builder = Db::builder();
    builder.table(customers()).table(orders());
    let test = Test::new(&mut builder);
    let system = test.db.system();

    assert!(!system.is_active("Orders"));
    test.insert("Customers", &[("Name", Value::from("Ann"))]);
    assert!(system.is_active("Customers"));
    assert!(!system.is_active("Orders"));

    let count = assert_ok!(test.db.engine().get_view_size(&Principal::admin(1), "Orders", None));
    assert_eq!(count, 0);
    assert!(system.is_active("Orders"));
}

#[test]
fn widening_a_field_keeps_the_rows() {
    let mut builder = Db::builder();
    builder.table(customers_with_name(10)).table(orders());
    let test = Test::new(&mut builder);
    assert_ok!(test.db.reconcile(false));

    let ann = test.insert("Customers", &[("Name", Value::from("Ann"))]);
    test.insert("Orders", &[("Customer", Value::I64(ann)), ("Total", Value::F64(12.5))]);

    let system = test.db.system();
    let report = system.load(&Descriptors::new().table(customers_with_name(40)).table(orders()));
    assert_empty!(report.rejected);

    let dry = assert_ok!(test.db.reconcile(true));
    assert_eq!(
        dry.diagnostics,
        vec![Diagnostic {
            table: "Customers".to_string(),
            message: "FIELD Name: TYPE VARCHAR(40) != VARCHAR(10)".to_string(),
        }]
    );

    let out = assert_ok!(test.db.reconcile(false));
    assert_eq!(out.rebuilt, vec!["Customers"]);
    assert_empty!(assert_ok!(system.check_tables(&["Customers", "Orders"])));

    let rows = assert_ok!(test.db.get_view_data(&Principal::admin(1), "Customers", &ViewRequest::new()));
    assert_eq!(rows.ids(), vec![ann]);
    assert_eq!(rows.value(0, "Name"), Some("Ann"));

    // Longer names fit now
    let long = "A name longer than ten";
    let id = test.insert("Customers", &[("Name", Value::from(long))]);
    assert_eq!(
        assert_ok!(test.db.engine().get_id_by("Customers", "Name", long)),
        Some(id)
    );
    assert_empty!(assert_ok!(test.db.engine().db_tables())
        .into_iter()
        .filter(|name| name.ends_with("_BAK"))
        .collect::<Vec<_>>());
}

#[test]
fn forced_rebuilds_keep_rows() {
    let mut builder = Db::builder();
    builder.table(customers());
    let test = Test::new(&mut builder);
    test.insert("Customers", &[("Name", Value::from("Ann"))]);

    let out = assert_ok!(test.db.system().rebuild_table("Customers"));
    assert_eq!(out.rebuilt, vec!["Customers"]);
    assert_eq!(
        assert_ok!(test.db.engine().get_id_by("Customers", "Name", "Ann")),
        Some(1)
    );

    let out = assert_ok!(test.db.system().rebuild_active_tables());
    assert_eq!(out.activated, vec!["Customers"]);
}

#[test]
fn broken_objects_are_rejected_alone() {
    init_tracing();
    let looping = ViewDescriptor::new("Loop", "Customers")
        .column(ColumnDescriptor::expression("A", ExpressionDescriptor::Name("B".into())))
        .column(ColumnDescriptor::expression(
            "B",
            ExpressionDescriptor::Macro(r#""A" || '!'"#.into()),
        ));
    let dangling = TableDescriptor::new("Invoices")
        .field(FieldDescriptor::new("Order", DataType::Long).relation("Orders"));

    let db = assert_ok!(Db::builder()
        .table(customers())
        .table(dangling)
        .view(looping)
        .build(Arc::new(Sqlite::in_memory().unwrap())));

    let report = db.report();
    assert!(report.is_rejected("Loop"));
    assert!(report.is_rejected("Invoices"));
    assert_eq!(report.tables, vec!["Customers"]);
    assert_eq!(report.views, vec!["Customers"]);

    let cycle = report.rejected.iter().find(|r| r.name == "Loop").unwrap();
    assert!(cycle.error.is_cycle_detected(), "{}", cycle.error);
}

#[test]
fn unknown_objects_are_errors() {
    let mut builder = Db::builder();
    builder.table(customers());
    let test = Test::new(&mut builder);

    let err = assert_err!(test.db.get_view_data(&Principal::admin(1), "Nope", &ViewRequest::new()));
    assert!(err.is_unknown_object());
    assert!(assert_err!(test.db.system().check_tables(&["Nope"])).is_unknown_object());
}
