use super::Expr;
use crate::schema::DataType;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregate {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprFunc {
    /// `COUNT(*)` when `arg` is `None`
    Aggregate {
        func: Aggregate,
        arg: Option<Box<Expr>>,
    },

    /// Bitwise AND, rendered per dialect
    BitAnd(Box<Expr>, Box<Expr>),

    /// `CASE [operand] WHEN .. THEN .. [ELSE ..] END`
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },

    Cast {
        expr: Box<Expr>,
        ty: DataType,
        precision: Option<u32>,
        scale: Option<u32>,
    },

    /// String concatenation, rendered per dialect
    Concat(Vec<Expr>),

    /// First non-null operand (`COALESCE`)
    Nvl(Vec<Expr>),
}

impl Aggregate {
    pub fn as_str(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Avg => "AVG",
        }
    }
}

impl ExprFunc {
    pub(crate) fn collect_tables(&self, dst: &mut Vec<String>) {
        match self {
            ExprFunc::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.collect_tables(dst);
                }
            }
            ExprFunc::BitAnd(lhs, rhs) => {
                lhs.collect_tables(dst);
                rhs.collect_tables(dst);
            }
            ExprFunc::Case {
                operand,
                whens,
                otherwise,
            } => {
                if let Some(operand) = operand {
                    operand.collect_tables(dst);
                }
                for (when, then) in whens {
                    when.collect_tables(dst);
                    then.collect_tables(dst);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.collect_tables(dst);
                }
            }
            ExprFunc::Cast { expr, .. } => expr.collect_tables(dst),
            ExprFunc::Concat(list) | ExprFunc::Nvl(list) => {
                list.iter().for_each(|e| e.collect_tables(dst))
            }
        }
    }
}

impl From<ExprFunc> for Expr {
    fn from(value: ExprFunc) -> Self {
        Expr::Func(value)
    }
}
