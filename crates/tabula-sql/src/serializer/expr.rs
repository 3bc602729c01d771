use super::{ty::CastType, Comma, Delimited, Flavor, Ident, Params, ToSql};

use crate::stmt;

impl ToSql for &stmt::Expr {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use stmt::Expr::*;

        match self {
            Arith(expr) => {
                let op = match expr.op {
                    stmt::ArithOp::Add => " + ",
                    stmt::ArithOp::Sub => " - ",
                    stmt::ArithOp::Mul => " * ",
                    stmt::ArithOp::Div => " / ",
                };
                fmt!(f, "(" Delimited(&expr.operands, op) ")");
            }
            And(operands) => match &operands[..] {
                [] => fmt!(f, "1=1"),
                [operand] => operand.to_sql(f),
                _ => {
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            fmt!(f, " AND ");
                        }
                        fmt!(f, "(" operand ")");
                    }
                }
            },
            BinaryOp(expr) => {
                let lhs = &*expr.lhs;
                let rhs = &*expr.rhs;
                fmt!(f, lhs " " expr.op.as_str() " " rhs);

                if expr.op == stmt::BinaryOp::Like {
                    match f.serializer.flavor {
                        Flavor::Mysql => fmt!(f, " ESCAPE '\\\\'"),
                        _ => fmt!(f, " ESCAPE '\\'"),
                    }
                }
            }
            Bool(true) => fmt!(f, "1=1"),
            Bool(false) => fmt!(f, "1=0"),
            Bulk(pieces) => {
                fmt!(f, "(" Delimited(pieces, "") ")");
            }
            Field(field) => field.to_sql(f),
            Func(func) => func.to_sql(f),
            InList(expr) => {
                if expr.list.is_empty() {
                    fmt!(f, "1=0");
                } else {
                    let lhs = &*expr.expr;
                    fmt!(f, lhs " IN (" Comma(&expr.list) ")");
                }
            }
            InSubquery(expr) => {
                let lhs = &*expr.expr;
                let query = &*expr.query;
                fmt!(f, lhs " IN (" query ")");
            }
            IsNull(expr) => {
                let op = if expr.negate { " IS NOT NULL" } else { " IS NULL" };
                let lhs = &*expr.expr;
                fmt!(f, lhs op);
            }
            Not(expr) => {
                let expr = &**expr;
                fmt!(f, "NOT (" expr ")");
            }
            Or(operands) => {
                if operands.is_empty() {
                    fmt!(f, "1=0");
                } else {
                    fmt!(f, "(" Delimited(operands, " OR ") ")");
                }
            }
            Raw(text) => fmt!(f, text),
            Value(value) => value.to_sql(f),
        }
    }
}

impl ToSql for &stmt::ExprField {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if let Some(source) = &self.source {
            fmt!(f, Ident(source) ".");
        }
        fmt!(f, Ident(&self.name));
    }
}

impl ToSql for &stmt::ExprFunc {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use stmt::ExprFunc::*;

        match self {
            Aggregate { func, arg } => {
                fmt!(f, func.as_str() "(");
                match arg {
                    Some(arg) => (&**arg).to_sql(f),
                    None => fmt!(f, "*"),
                }
                fmt!(f, ")");
            }
            BitAnd(lhs, rhs) => {
                let lhs = &**lhs;
                let rhs = &**rhs;
                fmt!(f, "(" lhs " & " rhs ")");
            }
            Case {
                operand,
                whens,
                otherwise,
            } => {
                fmt!(f, "CASE");
                if let Some(operand) = operand {
                    let operand = &**operand;
                    fmt!(f, " " operand);
                }
                for (when, then) in whens {
                    fmt!(f, " WHEN " when " THEN " then);
                }
                if let Some(otherwise) = otherwise {
                    let otherwise = &**otherwise;
                    fmt!(f, " ELSE " otherwise);
                }
                fmt!(f, " END");
            }
            Cast {
                expr,
                ty,
                precision,
                scale,
            } => {
                let ty = CastType {
                    ty: *ty,
                    precision: *precision,
                    scale: *scale,
                };
                let expr = &**expr;
                fmt!(f, "CAST(" expr " AS " ty ")");
            }
            Concat(operands) => match f.serializer.flavor {
                Flavor::Mysql => fmt!(f, "CONCAT(" Comma(operands) ")"),
                Flavor::Mssql => fmt!(f, "(" Delimited(operands, " + ") ")"),
                Flavor::Postgresql | Flavor::Sqlite => {
                    fmt!(f, "(" Delimited(operands, " || ") ")")
                }
            },
            Nvl(operands) => {
                fmt!(f, "COALESCE(" Comma(operands) ")");
            }
        }
    }
}
