use pretty_assertions::assert_eq;
use tabula::{
    filter::Operator,
    schema::descriptor::{ColumnDescriptor, ViewDescriptor},
    stmt::{Aggregate, BinaryOp, Expr, Value},
    view::{Order, View},
    Db, Filter, Principal, ViewRequest,
};
use tests::*;

/// Ann has two orders, Bob one and Cid none.
fn setup(builder: &mut tabula::db::Builder) -> Test {
    builder.table(customers()).table(orders());
    let test = Test::new(builder);
    assert_empty!(test.db.report().rejected);

    let ann = test.insert("Customers", &[("Name", Value::from("Ann"))]);
    let bob = test.insert("Customers", &[("Name", Value::from("Bob"))]);
    test.insert("Customers", &[("Name", Value::from("Cid"))]);
    for (customer, total) in [(ann, 10.0), (ann, 5.5), (bob, 7.0)] {
        test.insert(
            "Orders",
            &[("Customer", Value::I64(customer)), ("Total", Value::F64(total))],
        );
    }
    test.log.clear();
    test
}

fn admin() -> Principal {
    Principal::admin(1)
}

fn order_count() -> ColumnDescriptor {
    ColumnDescriptor::Aggregate {
        name: "orderCount".into(),
        aggregate: Aggregate::Count,
        label: None,
    }
}

#[test]
fn orders_per_customer() {
    let mut desc = ViewDescriptor::new("CustomerOrders", "Orders")
        .column(join(
            "Customer",
            vec![ColumnDescriptor::simple("customerName", "Name")],
        ))
        .column(order_count());
    desc.group_by = vec!["customerName".into()];

    let mut builder = Db::builder();
    builder.view(desc);
    let test = setup(&mut builder);

    let view = test.db.system().view("CustomerOrders").unwrap();
    assert!(view.read_only);

    let rows = assert_ok!(test.db.get_view_data(
        &admin(),
        "CustomerOrders",
        &ViewRequest::new().order(Order::asc("customerName")),
    ));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.value(0, "customerName"), Some("Ann"));
    assert_eq!(rows.value(0, "orderCount"), Some("2"));
    assert_eq!(rows.value(1, "customerName"), Some("Bob"));
    assert_eq!(rows.value(1, "orderCount"), Some("1"));

    // The smallest order id stands for each group
    assert_eq!(rows.ids(), vec![1, 3]);

    let sql = test.log.queries_containing("orderCount");
    assert_eq!(sql.len(), 1);
    let sql = &sql[0];
    assert_eq!(sql.matches(" JOIN ").count(), 1, "{sql}");
    assert!(sql.contains(r#"COUNT(*) AS "orderCount""#), "{sql}");
    assert!(sql.contains(r#"MIN("Orders"."ID") AS "ID""#), "{sql}");
    assert!(
        sql.contains(r#" GROUP BY "Customers_1"."Name" ORDER BY "Customers_1"."Name""#),
        "{sql}"
    );
    assert!(!sql.contains(" HAVING "), "{sql}");

    // Conditions on the count filter groups, not rows
    test.log.clear();
    let rows = assert_ok!(test.db.get_view_data(
        &admin(),
        "CustomerOrders",
        &ViewRequest::new().filter(Filter::compare("orderCount", Operator::Gt, 1)),
    ));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.value(0, "customerName"), Some("Ann"));

    let sql = &test.log.queries_containing("orderCount")[0];
    assert!(sql.contains(r#" GROUP BY "Customers_1"."Name" HAVING COUNT(*) > ?"#), "{sql}");
    assert!(!sql.contains(" WHERE "), "{sql}");
}

#[test]
fn aggregates_without_grouping_keep_rows_apart() {
    let desc = ViewDescriptor::new("OrderTotals", "Orders")
        .column(join(
            "Customer",
            vec![ColumnDescriptor::simple("customerName", "Name")],
        ))
        .column(order_count());

    let mut builder = Db::builder();
    builder.view(desc);
    let test = setup(&mut builder);

    let view = test.db.system().view("OrderTotals").unwrap();
    assert!(view.is_grouped());
    assert!(!view.read_only);

    let rows = assert_ok!(test.db.get_view_data(&admin(), "OrderTotals", &ViewRequest::new()));
    assert_eq!(rows.ids(), vec![1, 2, 3]);
    assert!(rows.rows.iter().all(|row| row.version > 0));
    assert_eq!(rows.value(2, "orderCount"), Some("1"));

    let sql = &test.log.queries_containing("orderCount")[0];
    assert!(sql.contains(r#"GROUP BY "Orders"."ID", "Orders"."Version""#), "{sql}");
}

#[test]
fn equality_values_or_other_operators_and() {
    let mut builder = Db::builder();
    let test = setup(&mut builder);

    let names = |filter: Filter| -> Vec<String> {
        let rows = assert_ok!(test.db.get_view_data(
            &admin(),
            "Customers",
            &ViewRequest::new().filter(filter).order(Order::asc("Name")),
        ));
        (0..rows.len())
            .map(|row| rows.value(row, "Name").unwrap().to_string())
            .collect()
    };

    assert_eq!(
        names(Filter::any_of("Name", vec![Value::from("Ann"), Value::from("Bob")])),
        vec!["Ann", "Bob"]
    );
    assert_eq!(
        names(Filter::ColumnValue {
            column: "Name".into(),
            op: Operator::Ne,
            values: vec![Value::from("Ann"), Value::from("Bob")],
        }),
        vec!["Cid"]
    );
    assert_eq!(names(Filter::compare("Name", Operator::Starts, "B")), vec!["Bob"]);
    assert_eq!(
        names(Filter::not(Filter::compare("Name", Operator::Contains, "i"))),
        vec!["Ann", "Bob"]
    );
    assert_empty!(names(Filter::False));
}

#[test]
fn paging_and_column_selection() {
    let mut builder = Db::builder();
    let test = setup(&mut builder);

    let request = ViewRequest::new()
        .order(Order::desc("Name"))
        .limit(2)
        .offset(1)
        .columns(["Name"]);
    let rows = assert_ok!(test.db.get_view_data(&admin(), "Customers", &request));

    assert_eq!(rows.view_name.as_deref(), Some("Customers"));
    assert_eq!(rows.columns.len(), 1);
    assert_eq!(rows.value(0, "Name"), Some("Bob"));
    assert_eq!(rows.value(1, "Name"), Some("Ann"));

    let err = assert_err!(test.db.get_view_data(
        &admin(),
        "Customers",
        &ViewRequest::new().columns(["Missing"]),
    ));
    assert!(err.is_unknown_object());
}

#[test]
fn decimals_are_formatted_to_their_scale() {
    let mut builder = Db::builder();
    let test = setup(&mut builder);

    let rows = assert_ok!(test.db.get_view_data(&admin(), "Orders", &ViewRequest::new()));
    assert_eq!(rows.value(0, "Total"), Some("10.00"));
    assert_eq!(rows.value(1, "Total"), Some("5.50"));
    assert_eq!(rows.value(0, "Customer"), Some("1"));
}

#[test]
fn view_size_and_histogram() {
    let mut builder = Db::builder();
    let test = setup(&mut builder);
    let engine = test.db.engine();

    assert_eq!(assert_ok!(engine.get_view_size(&admin(), "Orders", None)), 3);
    assert_eq!(
        assert_ok!(engine.get_view_size(&admin(), "Orders", Some(&Filter::equals("Customer", 1i64)))),
        2
    );

    let histogram = assert_ok!(engine.get_histogram(
        &admin(),
        "Orders",
        None,
        &["Customer".to_string()],
        &["Customer".to_string()],
    ));
    assert_eq!(histogram.columns, vec!["Customer", "Count"]);
    assert_eq!(histogram.column_values("Customer"), vec![Some("1"), Some("2")]);
    assert_eq!(histogram.column_values("Count"), vec![Some("2"), Some("1")]);

    assert!(engine
        .get_histogram(&admin(), "Orders", None, &[], &[])
        .is_err());
}

#[test]
fn custom_filters_come_from_providers() {
    let mut builder = Db::builder();
    builder.condition_provider(
        "atLeast",
        |view: &View, args: &[String]| -> tabula::Result<Option<Expr>> {
            let Some(min) = args.first().and_then(|arg| arg.parse::<f64>().ok()) else {
                return Ok(None);
            };
            Ok(Some(Expr::binary_op(
                Expr::field(&view.source_alias, "Total"),
                BinaryOp::Ge,
                Expr::value(min),
            )))
        },
    );
    let test = setup(&mut builder);
    let engine = test.db.engine();

    let filter = Filter::custom("atLeast", vec!["7".into()]);
    assert_eq!(assert_ok!(engine.get_view_size(&admin(), "Orders", Some(&filter))), 2);

    // Providers may decline, unknown keys are ignored
    let filter = Filter::custom("atLeast", vec!["lots".into()]);
    assert_eq!(assert_ok!(engine.get_view_size(&admin(), "Orders", Some(&filter))), 3);
    let filter = Filter::custom("unknown", vec![]);
    assert_eq!(assert_ok!(engine.get_view_size(&admin(), "Orders", Some(&filter))), 3);
}

#[test]
fn in_view_filters_read_the_other_view() {
    let mut builder = Db::builder();
    let test = setup(&mut builder);

    let filter = Filter::in_view(
        "Customer",
        "Customers",
        "ID",
        Some(Filter::equals("Name", "Bob")),
    );
    let rows = assert_ok!(test.db.get_view_data(
        &admin(),
        "Orders",
        &ViewRequest::new().filter(filter),
    ));
    assert_eq!(rows.ids(), vec![3]);
}

#[test]
fn query_handlers_see_and_edit_the_rows() {
    let mut builder = Db::builder();
    builder.handler(|event: &mut tabula::event::DataEvent| {
        if event.is_after() {
            if let Some(rows) = event.rowset_mut() {
                rows.rows.retain(|row| row.id != 2);
            }
        }
    });
    let test = setup(&mut builder);

    let rows = assert_ok!(test.db.get_view_data(&admin(), "Customers", &ViewRequest::new()));
    assert_eq!(rows.ids(), vec![1, 3]);
}
