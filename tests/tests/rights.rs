use pretty_assertions::assert_eq;
use tabula::{
    schema::{
        descriptor::{FieldDescriptor, TableDescriptor},
        DataType, State,
    },
    stmt::Value,
    Db, Principal, ViewRequest,
};
use tests::*;

const ANN: i64 = 7;
const BOB: i64 = 8;
const EDITORS: i64 = 3;

/// Rows are hidden unless a VIEW bit is set; EDIT bits take rights away.
fn documents() -> TableDescriptor {
    TableDescriptor::new("Documents")
        .field(FieldDescriptor::new("Title", DataType::String).precision(40))
        .state(State::new(State::VIEW, true, true, false))
        .state(State::new(State::EDIT, true, false, true))
}

fn setup() -> Test {
    let mut builder = Db::builder();
    builder.table(documents());
    let test = Test::new(&mut builder);

    for title in ["shared with Ann", "shared with editors", "private"] {
        test.insert("Documents", &[("Title", Value::from(title))]);
    }
    let engine = test.db.engine();
    assert_ok!(engine.set_row_state("Documents", 1, State::VIEW, &[ANN]));
    assert_ok!(engine.set_row_state("Documents", 2, State::VIEW, &[EDITORS]));
    test
}

fn visible(test: &Test, principal: &Principal) -> Vec<i64> {
    assert_ok!(test.db.get_view_data(principal, "Documents", &ViewRequest::new())).ids()
}

#[test]
fn admins_see_every_row() {
    let test = setup();
    test.log.clear();
    let admin = Principal::admin(1);

    let rows = assert_ok!(test.db.get_view_data(&admin, "Documents", &ViewRequest::new()));
    assert_eq!(rows.ids(), vec![1, 2, 3]);
    assert!(rows.rows.iter().all(|row| row.editable && row.removable));
    assert_eq!(assert_ok!(test.db.engine().get_view_size(&admin, "Documents", None)), 3);

    // No state join for administrators
    let sql = test.log.queries_containing("Documents_STATE");
    assert_empty!(sql);
}

#[test]
fn users_see_rows_shared_with_them_or_their_roles() {
    let test = setup();

    assert_eq!(visible(&test, &Principal::user(ANN, vec![])), vec![1]);
    assert_eq!(visible(&test, &Principal::user(BOB, vec![EDITORS])), vec![2]);
    assert_eq!(visible(&test, &Principal::user(ANN, vec![EDITORS])), vec![1, 2]);
    assert_empty!(visible(&test, &Principal::user(BOB, vec![])));

    let size = test
        .db
        .engine()
        .get_view_size(&Principal::user(ANN, vec![EDITORS]), "Documents", None);
    assert_eq!(assert_ok!(size), 2);
}

#[test]
fn checked_states_pass_until_a_bit_is_set() {
    let test = setup();
    let ann = Principal::user(ANN, vec![EDITORS]);

    let rows = assert_ok!(test.db.get_view_data(&ann, "Documents", &ViewRequest::new()));
    assert!(rows.rows.iter().all(|row| row.editable));

    assert_ok!(test.db.engine().set_row_state("Documents", 1, State::EDIT, &[ANN]));
    let rows = assert_ok!(test.db.get_view_data(&ann, "Documents", &ViewRequest::new()));
    assert!(!rows.row_by_id(1).unwrap().editable);
    assert!(rows.row_by_id(2).unwrap().editable);

    // The VIEW bits of row 1 were left alone
    assert_eq!(rows.ids(), vec![1, 2]);
}

#[test]
fn replacing_state_bits() {
    let test = setup();
    let engine = test.db.engine();

    assert_eq!(assert_ok!(engine.set_row_state("Documents", 1, State::VIEW, &[BOB])), 1);
    assert_empty!(visible(&test, &Principal::user(ANN, vec![])));
    assert_eq!(visible(&test, &Principal::user(BOB, vec![])), vec![1]);

    let err = assert_err!(engine.set_row_state("Documents", 1, "ARCHIVE", &[BOB]));
    assert!(err.is_schema_definition());
}
