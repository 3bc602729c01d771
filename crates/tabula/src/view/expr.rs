use super::{
    compile::{apply_aggregate, settle, Scope, ViewCompiler},
    ViewColumn,
};
use crate::Result;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use tabula_core::{
    schema::{descriptor::ColumnDescriptor, descriptor::ExpressionDescriptor, normalize, DataType},
    stmt::{ArithOp, Expr, ExprFunc},
    Error,
};

/// The last `"Name"` reference of a macro text.
static MACRO_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)^(.*)"(\w+)"(.*)$"#).unwrap());

/// Splits macro text around its `"Name"` references. Each reference is
/// replaced by what `resolve` returns for it, or kept as a quoted name;
/// everything else is kept verbatim.
pub(super) fn parse_macro(
    text: &str,
    resolve: &mut dyn FnMut(&str) -> Result<Option<Expr>>,
) -> Result<Expr> {
    let mut pieces = VecDeque::new();
    let mut rest = text;

    while let Some(caps) = MACRO_NAME.captures(rest) {
        let (Some(head), Some(name), Some(tail)) = (caps.get(1), caps.get(2), caps.get(3)) else {
            break;
        };
        if !tail.as_str().is_empty() {
            pieces.push_front(Expr::raw(tail.as_str()));
        }
        let name = name.as_str();
        pieces.push_front(resolve(name)?.unwrap_or_else(|| Expr::name(name)));
        rest = head.as_str();
    }
    if !rest.is_empty() {
        pieces.push_front(Expr::raw(rest));
    }

    Ok(Expr::Bulk(pieces.into()))
}

impl ViewCompiler<'_> {
    /// Compiles the expression column stored under `key`, compiling the
    /// columns it refers to first.
    pub(super) fn compile_pending(&mut self, key: &str) -> Result<Expr> {
        if let Some(column) = self.columns.get(key) {
            return Ok(column.expr.clone());
        }
        let Some(pending) = self.pending.get(key) else {
            return Err(self.error(format!("unknown column {key}")));
        };
        let desc = pending.desc;
        let scope = pending.scope.clone();

        let ColumnDescriptor::Expression {
            name,
            expression,
            ty,
            precision,
            scale,
            aggregate,
            hidden,
            label,
        } = desc
        else {
            return Err(self.error(format!("column {key} is not an expression")));
        };

        if self.visiting.iter().any(|k| k == key) {
            return Err(Error::cycle_detected(self.desc.name.trim(), name.trim()));
        }

        self.visiting.push(key.to_string());
        let compiled = self.expression(expression, &scope);
        self.visiting.pop();
        let (inner, inferred) = compiled?;

        let (expr, ty) = apply_aggregate(inner, *aggregate, ty.unwrap_or(inferred));
        let column = ViewColumn {
            name: name.trim().to_string(),
            label: label.clone(),
            expr: expr.clone(),
            aggregate: *aggregate,
            ty,
            precision: *precision,
            scale: *scale,
            nullable: true,
            hidden: *hidden,
            computed: true,
            read_only: false,
            editable: false,
            level: scope.level,
            parent: scope.parent.clone(),
            table: scope.table.name.clone(),
            field: None,
            alias: scope.alias.clone(),
            locale: None,
            default: None,
            enum_key: None,
        };
        self.pending.remove(key);
        self.columns.insert(key.to_string(), settle(column, None));
        Ok(expr)
    }

    /// A column of the view, compiled on demand.
    fn view_column(&mut self, name: &str) -> Result<Option<(Expr, DataType)>> {
        let key = normalize(name);
        if !self.columns.contains_key(&key) && !self.pending.contains_key(&key) {
            return Ok(None);
        }
        let expr = self.compile_pending(&key)?;
        let ty = self
            .columns
            .get(&key)
            .map(|column| column.ty)
            .unwrap_or(DataType::String);
        Ok(Some((expr, ty)))
    }

    fn expression(&mut self, desc: &ExpressionDescriptor, scope: &Scope) -> Result<(Expr, DataType)> {
        Ok(match desc {
            ExpressionDescriptor::Name(name) => {
                if let Some(found) = self.view_column(name)? {
                    return Ok(found);
                }
                let ty = if scope.table.is_id_or_version(name) {
                    DataType::Long
                } else {
                    scope
                        .table
                        .field(name)
                        .map(|field| field.ty)
                        .unwrap_or(DataType::String)
                };
                match self.scope_field(scope, name, None)? {
                    Some(expr) => (expr, ty),
                    None => {
                        return Err(self.error(format!("unknown name {name} in expression")));
                    }
                }
            }
            ExpressionDescriptor::Number(value) => (Expr::raw(number_text(*value)), DataType::Double),
            ExpressionDescriptor::String(text) => (Expr::value(text.as_str()), DataType::String),
            ExpressionDescriptor::Plus(list) => (self.arith(ArithOp::Add, list, scope)?, DataType::Double),
            ExpressionDescriptor::Minus(list) => (self.arith(ArithOp::Sub, list, scope)?, DataType::Double),
            ExpressionDescriptor::Multiply(list) => {
                (self.arith(ArithOp::Mul, list, scope)?, DataType::Double)
            }
            ExpressionDescriptor::Divide(list) => (self.arith(ArithOp::Div, list, scope)?, DataType::Double),
            ExpressionDescriptor::Concat(list) => {
                let (operands, _) = self.list(list, scope)?;
                (ExprFunc::Concat(operands).into(), DataType::String)
            }
            ExpressionDescriptor::Nvl(list) => {
                let (operands, ty) = self.list(list, scope)?;
                (ExprFunc::Nvl(operands).into(), ty)
            }
            ExpressionDescriptor::Cast {
                expression,
                ty,
                precision,
                scale,
            } => {
                let (expr, _) = self.expression(expression, scope)?;
                let cast = ExprFunc::Cast {
                    expr: Box::new(expr),
                    ty: *ty,
                    precision: *precision,
                    scale: *scale,
                };
                (cast.into(), *ty)
            }
            ExpressionDescriptor::Case {
                operand,
                whens,
                otherwise,
            } => {
                let operand = match operand {
                    Some(operand) => Some(Box::new(self.expression(operand, scope)?.0)),
                    None => None,
                };
                let mut ty = None;
                let mut compiled = Vec::with_capacity(whens.len());
                for when in whens {
                    let (cond, _) = self.expression(&when.when, scope)?;
                    let (then, then_ty) = self.expression(&when.then, scope)?;
                    ty.get_or_insert(then_ty);
                    compiled.push((cond, then));
                }
                let otherwise = match otherwise {
                    Some(otherwise) => {
                        let (expr, else_ty) = self.expression(otherwise, scope)?;
                        ty.get_or_insert(else_ty);
                        Some(Box::new(expr))
                    }
                    None => None,
                };
                let case = ExprFunc::Case {
                    operand,
                    whens: compiled,
                    otherwise,
                };
                (case.into(), ty.unwrap_or(DataType::String))
            }
            ExpressionDescriptor::Bulk(list) => {
                let (pieces, ty) = self.list(list, scope)?;
                (Expr::Bulk(pieces), ty)
            }
            ExpressionDescriptor::Macro(text) => {
                let expr = parse_macro(text, &mut |name| self.macro_name(scope, name))?;
                (expr, DataType::String)
            }
        })
    }

    fn arith(&mut self, op: ArithOp, list: &[ExpressionDescriptor], scope: &Scope) -> Result<Expr> {
        if list.len() < 2 {
            return Err(self.error(format!(
                "operator {} needs at least two operands",
                op.as_str()
            )));
        }
        let (operands, _) = self.list(list, scope)?;
        Ok(Expr::arith(op, operands))
    }

    /// Compiles every operand; the type is the first operand's.
    fn list(&mut self, list: &[ExpressionDescriptor], scope: &Scope) -> Result<(Vec<Expr>, DataType)> {
        if list.is_empty() {
            return Err(self.error("expression list is empty"));
        }
        let mut ty = None;
        let mut operands = Vec::with_capacity(list.len());
        for item in list {
            let (expr, item_ty) = self.expression(item, scope)?;
            ty.get_or_insert(item_ty);
            operands.push(expr);
        }
        Ok((operands, ty.unwrap_or(DataType::String)))
    }

    fn macro_name(&mut self, scope: &Scope, name: &str) -> Result<Option<Expr>> {
        if let Some((expr, _)) = self.view_column(name)? {
            return Ok(Some(expr));
        }
        self.scope_field(scope, name, None)
    }
}

fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
