use super::View;
use crate::{catalog::ViewFinder, Result};

use tabula_core::{
    filter::{Compound, Operator},
    stmt::{BinaryOp, Expr, ExprFunc, Value},
    Error, Filter,
};

impl View {
    /// Translates `filter` into a SQL condition over this view's columns.
    ///
    /// Returns `None` when nothing restricts the rows, which happens when
    /// every branch is a custom filter without a registered provider.
    pub fn condition(&self, filter: &Filter, finder: &dyn ViewFinder) -> Result<Option<Expr>> {
        Ok(Some(match filter {
            Filter::ColumnValue { column, op, values } => {
                let lhs = self.column_expr(column)?;
                values_condition(lhs, *op, values)?
            }
            Filter::ColumnColumn { column, op, other } => {
                let lhs = self.column_expr(column)?;
                let rhs = self.column_expr(other)?;
                match op {
                    Operator::Starts => like(lhs, ExprFunc::Concat(vec![rhs, Expr::value("%")]).into()),
                    Operator::Ends => like(lhs, ExprFunc::Concat(vec![Expr::value("%"), rhs]).into()),
                    Operator::Contains => like(
                        lhs,
                        ExprFunc::Concat(vec![Expr::value("%"), rhs, Expr::value("%")]).into(),
                    ),
                    Operator::In => Expr::eq(lhs, rhs),
                    op => Expr::binary_op(lhs, binary_op(*op), rhs),
                }
            }
            Filter::ColumnIsNull(column) => Expr::is_null(self.column_expr(column)?),
            Filter::ColumnNotNull(column) => Expr::is_not_null(self.column_expr(column)?),
            Filter::Id { op, ids } => {
                let values: Vec<Value> = ids.iter().map(|id| Value::I64(*id)).collect();
                values_condition(self.id_expr(), *op, &values)?
            }
            Filter::Version { op, value } => {
                values_condition(self.source_version(), *op, &[Value::I64(*value)])?
            }
            Filter::Compound { kind, filters } => {
                let mut operands = vec![];
                for filter in filters {
                    if let Some(cond) = self.condition(filter, finder)? {
                        operands.push(cond);
                    }
                }
                if operands.is_empty() {
                    return Ok(None);
                }
                match kind {
                    Compound::And => Expr::and_from_vec(operands),
                    Compound::Or => Expr::or_from_vec(operands),
                    Compound::Not => Expr::not(Expr::and_from_vec(operands)),
                }
            }
            Filter::True => Expr::Bool(true),
            Filter::False => Expr::Bool(false),
            Filter::ColumnIn {
                column,
                in_view,
                in_column,
                in_filter,
            } => {
                let lhs = self.column_expr(column)?;
                let other = finder
                    .find_view(in_view)
                    .ok_or_else(|| Error::unknown_view(in_view))?;
                let selected = other.column_expr(in_column)?;

                let mut sub = other.query(in_filter.as_deref(), &[], Some(&[][..]), finder)?;
                sub.fields.clear();
                sub.order_by.clear();
                sub.add_field(selected, None);

                Expr::in_subquery(lhs, sub)
            }
            Filter::Custom { key, args } => match finder.condition_provider(key) {
                Some(provider) => return provider.condition(self, args),
                None => {
                    tracing::error!(view = %self.name, key = %key, "no condition provider registered; filter ignored");
                    return Ok(None);
                }
            },
        }))
    }

    /// Expression of a column, the row id or the row version.
    pub(crate) fn column_expr(&self, name: &str) -> Result<Expr> {
        if name.eq_ignore_ascii_case(&self.id_name) {
            return Ok(self.id_expr());
        }
        if name.eq_ignore_ascii_case(&self.version_name) {
            return Ok(self.source_version());
        }
        Ok(self.column_or_err(name)?.expr.clone())
    }

    /// The row id as it appears in this view's queries.
    fn id_expr(&self) -> Expr {
        self.source_id()
    }
}

/// Several values OR together for `EQ` and AND together otherwise.
fn values_condition(lhs: Expr, op: Operator, values: &[Value]) -> Result<Expr> {
    if values.is_empty() {
        return Err(Error::invalid_filter(format!(
            "operator {op:?} needs at least one value"
        )));
    }
    Ok(match op {
        Operator::In => Expr::in_list(lhs, values.to_vec()),
        Operator::Eq => Expr::or_from_vec(
            values
                .iter()
                .map(|value| compare(lhs.clone(), op, value))
                .collect(),
        ),
        _ => Expr::and_from_vec(
            values
                .iter()
                .map(|value| compare(lhs.clone(), op, value))
                .collect(),
        ),
    })
}

fn compare(lhs: Expr, op: Operator, value: &Value) -> Expr {
    let text = || escape_like(&value.to_text().unwrap_or_default());
    match op {
        Operator::Starts => like(lhs, Expr::value(format!("{}%", text()))),
        Operator::Contains => like(lhs, Expr::value(format!("%{}%", text()))),
        Operator::Ends => like(lhs, Expr::value(format!("%{}", text()))),
        Operator::In => Expr::eq(lhs, value.clone()),
        op if value.is_null() => match op {
            Operator::Ne => Expr::is_not_null(lhs),
            _ => Expr::is_null(lhs),
        },
        op => Expr::binary_op(lhs, binary_op(op), value.clone()),
    }
}

fn like(lhs: Expr, pattern: Expr) -> Expr {
    Expr::binary_op(lhs, BinaryOp::Like, pattern)
}

fn binary_op(op: Operator) -> BinaryOp {
    match op {
        Operator::Eq | Operator::In => BinaryOp::Eq,
        Operator::Ne => BinaryOp::Ne,
        Operator::Lt => BinaryOp::Lt,
        Operator::Le => BinaryOp::Le,
        Operator::Gt => BinaryOp::Gt,
        Operator::Ge => BinaryOp::Ge,
        Operator::Starts | Operator::Contains | Operator::Ends => BinaryOp::Like,
    }
}

/// Escapes LIKE wildcards with `\`.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
    }

    #[test]
    fn eq_values_or_together() {
        let cond = values_condition(
            Expr::field("t", "a"),
            Operator::Eq,
            &[Value::I64(1), Value::I64(2)],
        )
        .unwrap();
        assert!(matches!(cond, Expr::Or(ref list) if list.len() == 2));
    }

    #[test]
    fn other_operators_and_together() {
        let cond = values_condition(
            Expr::field("t", "a"),
            Operator::Ne,
            &[Value::I64(1), Value::I64(2)],
        )
        .unwrap();
        assert!(matches!(cond, Expr::And(ref list) if list.len() == 2));
    }

    #[test]
    fn null_values_compare_with_is_null() {
        let cond = compare(Expr::field("t", "a"), Operator::Eq, &Value::Null);
        assert_eq!(cond, Expr::is_null(Expr::field("t", "a")));
    }

    #[test]
    fn no_values_is_an_error() {
        assert!(values_condition(Expr::field("t", "a"), Operator::Eq, &[]).is_err());
    }
}
