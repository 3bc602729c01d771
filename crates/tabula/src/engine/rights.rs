//! Row-level rights.
//!
//! A table declaring rights states keeps one bitmask row per data row in
//! its state table. The engine left joins that table and turns the masks
//! of the calling principal into conditions: `VIEW` restricts the rows,
//! `EDIT` and `DELETE` come back as 0/1 columns.

use super::Principal;
use crate::view::View;

use tabula_core::{
    schema::{State, Table},
    stmt::{Aggregate, Expr, ExprFunc, JoinKind, Select},
};

/// Result columns added for the edit and delete rights.
pub(super) const EDIT_COLUMN: &str = State::EDIT;
pub(super) const DELETE_COLUMN: &str = State::DELETE;

/// What [`apply`] added to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Applied {
    pub(super) edit: bool,
    pub(super) delete: bool,

    /// Rows are editable unless the `EDIT` column says otherwise.
    pub(super) editable: bool,
    pub(super) removable: bool,
}

impl Applied {
    pub(super) const ALL: Applied = Applied {
        edit: false,
        delete: false,
        editable: true,
        removable: true,
    };
}

/// Restricts `select` to the rows `principal` may see. With `columns` set,
/// also selects the `EDIT`/`DELETE` columns.
pub(super) fn apply(
    select: &mut Select,
    view: &View,
    table: &Table,
    principal: &Principal,
    state_columns: usize,
    columns: bool,
) -> Applied {
    let mut applied = Applied::ALL;
    if let Some(state) = table.state(State::EDIT) {
        applied.editable = state.checked;
    }
    if let Some(state) = table.state(State::DELETE) {
        applied.removable = state.checked;
    }

    if principal.admin || !table.has_states() {
        return applied;
    }

    let alias = join_state(select, view, table);

    if let Some(state) = table.state(State::VIEW) {
        select.and_filter(verify(state, Some(&alias), principal, state_columns));
    }
    if !columns {
        return applied;
    }

    for (name, column, flag) in [
        (State::EDIT, EDIT_COLUMN, &mut applied.edit),
        (State::DELETE, DELETE_COLUMN, &mut applied.delete),
    ] {
        let Some(state) = table.state(name) else {
            continue;
        };
        let case = Expr::from(ExprFunc::Case {
            operand: None,
            whens: vec![(verify(state, Some(&alias), principal, state_columns), Expr::value(1i64))],
            otherwise: Some(Box::new(Expr::value(0i64))),
        });
        let expr = if view.is_grouped() {
            Expr::aggregate(Aggregate::Max, case)
        } else {
            case
        };
        select.add_field(expr, Some(column.to_string()));
        *flag = true;
    }
    applied
}

fn join_state(select: &mut Select, view: &View, table: &Table) -> String {
    let state_table = table.state_name();
    let key = format!("{state_table} {}", view.source_alias);
    let on = Expr::eq(Expr::field(&state_table, &table.id_name), view.source_id());
    select.add_join(JoinKind::Left, &state_table, &state_table, on, key)
}

/// The condition under which `state` lets `principal` through. The user
/// bit counts when the state supports users, the role bits when it supports
/// roles; either one passing is enough.
pub(super) fn verify(state: &State, alias: Option<&str>, principal: &Principal, state_columns: usize) -> Expr {
    let Some(alias) = alias else {
        // Nothing recorded: only states that pass by default pass.
        return Expr::Bool(state.checked);
    };

    let mut conditions = vec![];
    if state.users {
        conditions.push(check(state, alias, &[principal.user_id], state_columns));
    }
    if state.roles {
        conditions.push(check(state, alias, &principal.roles, state_columns));
    }
    if conditions.is_empty() {
        return Expr::Bool(state.checked);
    }
    Expr::or_from_vec(conditions)
}

/// A checked state passes unless every bit of the mask is set in some
/// column; an unchecked state passes when any bit is set. No principals
/// means no pass.
pub(super) fn check(state: &State, alias: &str, principals: &[i64], state_columns: usize) -> Expr {
    let masks = state.masks(principals, state_columns);
    if masks.is_empty() {
        return Expr::Bool(false);
    }

    let chunks: Vec<Expr> = masks
        .into_iter()
        .map(|(column, mask)| {
            let field = Expr::field(alias, column);
            let bits = Expr::bit_and(field.clone(), Expr::value(mask));
            if state.checked {
                Expr::Or(vec![Expr::is_null(field), Expr::ne(bits, Expr::value(mask))])
            } else {
                Expr::And(vec![Expr::is_not_null(field), Expr::ne(bits, Expr::value(0i64))])
            }
        })
        .collect();

    if state.checked {
        Expr::and_from_vec(chunks)
    } else {
        Expr::or_from_vec(chunks)
    }
}
