use pretty_assertions::assert_eq;
use parking_lot::Mutex;
use std::sync::Arc;
use tabula::{
    event::{DataEvent, DataEventKind},
    schema::{
        descriptor::{ColumnDescriptor, FieldDescriptor, TableDescriptor, ViewDescriptor},
        DataType,
    },
    stmt::Value,
    Db, Principal, ViewRequest,
};
use tests::*;

fn contacts() -> TableDescriptor {
    TableDescriptor::new("Contacts")
        .field(FieldDescriptor::new("Name", DataType::String).precision(12).not_null())
        .field(FieldDescriptor::new("Phone", DataType::String).precision(20))
        .field(FieldDescriptor::new("Notes", DataType::Text).extended())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn read(test: &Test) -> tabula::RowSet {
    assert_ok!(test.db.get_view_data(&Principal::admin(1), "Contacts", &ViewRequest::new()))
}

#[test]
fn insert_update_delete_through_a_view() {
    let mut builder = Db::builder();
    builder.table(contacts());
    let test = Test::new(&mut builder);
    let engine = test.db.engine();

    let id = assert_ok!(engine.insert_view_row(
        "Contacts",
        strings(&["Name", "Notes"]),
        vec![Value::from("Ann"), Value::from("likes tea")],
    ));
    assert_eq!(id, 1);

    let rows = read(&test);
    let version = assert_some!(rows.row_by_id(id)).version;
    assert_eq!(rows.value(0, "Name"), Some("Ann"));
    assert_eq!(rows.value(0, "Notes"), Some("likes tea"));
    assert_eq!(rows.value(0, "Phone"), None);

    let next = assert_ok!(engine.update_view_row(
        "Contacts",
        id,
        version,
        strings(&["Phone", "Notes"]),
        vec![Value::from("555"), Value::from("coffee now")],
    ));
    assert!(next > version);

    let rows = read(&test);
    assert_eq!(rows.value(0, "Phone"), Some("555"));
    assert_eq!(rows.value(0, "Notes"), Some("coffee now"));
    assert_eq!(rows.rows[0].version, next);

    // The stale version no longer matches
    let err = assert_err!(engine.update_view_row(
        "Contacts",
        id,
        version,
        strings(&["Phone"]),
        vec![Value::from("000")],
    ));
    assert!(err.is_validation());
    assert_eq!(read(&test).value(0, "Phone"), Some("555"));

    assert_eq!(assert_ok!(engine.delete_view_rows("Contacts", &[id])), 1);
    assert!(read(&test).is_empty());
    assert!(!assert_ok!(engine.sql_exists(&tabula::schema::name::extension_table("Contacts"), None)));
}

#[test]
fn long_values_are_cut_to_the_field_precision() {
    let mut builder = Db::builder();
    builder.table(contacts());
    let test = Test::new(&mut builder);

    let id = assert_ok!(test.db.engine().insert_view_row(
        "Contacts",
        strings(&["Name"]),
        vec![Value::from("Annabel Lee-Smith")],
    ));
    assert_eq!(id, 1);
    assert_eq!(read(&test).value(0, "Name"), Some("Annabel Lee-"));
}

#[test]
fn handlers_add_values_or_veto() {
    let mut builder = Db::builder();
    builder.table(contacts()).handler(|event: &mut DataEvent| {
        if !event.is_before() {
            return;
        }
        if let DataEventKind::ViewInsert { .. } = event.kind {
            let unnamed = event
                .column_value("Name")
                .and_then(Value::to_text)
                .map_or(true, |name| name.is_empty());
            if unnamed {
                event.add_error_message("a contact needs a name");
            } else {
                event.add_column("Phone", "unknown");
            }
        }
    });
    let test = Test::new(&mut builder);
    let engine = test.db.engine();

    let id = assert_ok!(engine.insert_view_row("Contacts", strings(&["Name"]), vec![Value::from("Bob")]));
    assert_eq!(id, 1);
    assert_eq!(read(&test).value(0, "Phone"), Some("unknown"));

    test.log.clear();
    let err = assert_err!(engine.insert_view_row("Contacts", strings(&["Name"]), vec![Value::from("")]));
    assert_eq!(err.validation_messages(), Some(&strings(&["a contact needs a name"])[..]));
    assert_empty!(test.log.statements());
}

#[test]
fn after_handlers_see_the_new_id() {
    let seen = Arc::new(Mutex::new(vec![]));
    let ids = seen.clone();

    let mut builder = Db::builder();
    builder.table(contacts()).handler(move |event: &mut DataEvent| {
        if let DataEventKind::ViewInsert { id: Some(id), .. } = event.kind {
            ids.lock().push(id);
        }
    });
    let test = Test::new(&mut builder);

    let first = assert_ok!(test.db.engine().insert_view_row("Contacts", strings(&["Name"]), vec![Value::from("A")]));
    let second = assert_ok!(test.db.engine().insert_view_row("Contacts", strings(&["Name"]), vec![Value::from("B")]));
    assert_eq!(*seen.lock(), vec![first, second]);
}

#[test]
fn read_only_views_and_computed_columns_reject_writes() {
    let mut grouped = ViewDescriptor::new("ByPhone", "Contacts")
        .column(ColumnDescriptor::simple("Phone", "Phone"));
    grouped.group_by = vec!["Phone".into()];
    let mut declared = ViewDescriptor::new("Frozen", "Contacts")
        .column(ColumnDescriptor::simple("Name", "Name"));
    declared.read_only = true;
    let labeled = ViewDescriptor::new("Labeled", "Contacts")
        .column(ColumnDescriptor::simple("Name", "Name"))
        .column(ColumnDescriptor::expression(
            "Label",
            tabula::schema::descriptor::ExpressionDescriptor::Macro(r#""Name" || '!'"#.into()),
        ));

    let mut builder = Db::builder();
    builder.table(contacts()).view(grouped).view(declared).view(labeled);
    let test = Test::new(&mut builder);
    assert_empty!(test.db.report().rejected);
    let engine = test.db.engine();

    for view in ["ByPhone", "Frozen"] {
        let err = assert_err!(engine.insert_view_row(view, strings(&["Name"]), vec![Value::from("A")]));
        assert!(err.is_validation(), "{view}: {err}");
    }
    let err = assert_err!(engine.insert_view_row(
        "Labeled",
        strings(&["Name", "Label"]),
        vec![Value::from("A"), Value::from("B")],
    ));
    assert!(err.is_validation());
}

#[test]
fn copying_rows_gives_them_new_ids() {
    let mut builder = Db::builder();
    builder.table(contacts());
    let test = Test::new(&mut builder);
    for (name, phone) in [("Ann", "1"), ("Bob", "1"), ("Cid", "2")] {
        test.insert("Contacts", &[("Name", Value::from(name)), ("Phone", Value::from(phone))]);
    }
    let engine = test.db.engine();

    assert_eq!(
        assert_ok!(engine.copy_data("Contacts", "Phone", Value::from("1"), Value::from("3"))),
        2
    );
    assert_eq!(assert_ok!(engine.get_id_by("Contacts", "Phone", "2")), Some(3));

    let copies = assert_ok!(engine.get_view_size(
        &Principal::admin(1),
        "Contacts",
        Some(&tabula::Filter::equals("Phone", "3")),
    ));
    assert_eq!(copies, 2);
    assert!(engine.copy_data("Contacts", "Phone", Value::from("1"), Value::from("1")).is_err());
}
