use super::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Arithmetic over two or more operands
    Arith(ExprArith),

    /// AND a set of conditions. An empty set is true.
    And(Vec<Expr>),

    /// Binary comparison
    BinaryOp(ExprBinaryOp),

    /// Literal condition, rendered as `1=1` / `1=0`
    Bool(bool),

    /// Pieces written back to back without separators. Compiled macro
    /// expressions take this shape.
    Bulk(Vec<Expr>),

    /// A column of a FROM source, or a bare (quoted) name
    Field(ExprField),

    /// A function call
    Func(ExprFunc),

    /// `expr IN (v1, v2, ...)`
    InList(ExprInList),

    /// `expr IN (SELECT ...)`
    InSubquery(ExprInSubquery),

    /// `expr IS [NOT] NULL`
    IsNull(ExprIsNull),

    /// Negate a condition
    Not(Box<Expr>),

    /// OR a set of conditions. An empty set is false.
    Or(Vec<Expr>),

    /// SQL text emitted verbatim
    Raw(String),

    /// A constant, bound as a statement parameter
    Value(Value),
}

impl Expr {
    /// `"source"."name"`
    pub fn field(source: impl Into<String>, name: impl Into<String>) -> Expr {
        ExprField {
            source: Some(source.into()),
            name: name.into(),
        }
        .into()
    }

    /// A bare quoted name, such as a projection alias.
    pub fn name(name: impl Into<String>) -> Expr {
        ExprField {
            source: None,
            name: name.into(),
        }
        .into()
    }

    pub fn value(value: impl Into<Value>) -> Expr {
        Expr::Value(value.into())
    }

    pub fn raw(text: impl Into<String>) -> Expr {
        Expr::Raw(text.into())
    }

    pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Eq, rhs)
    }

    pub fn ne(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Ne, rhs)
    }

    pub fn binary_op(lhs: impl Into<Expr>, op: BinaryOp, rhs: impl Into<Expr>) -> Expr {
        ExprBinaryOp {
            lhs: Box::new(lhs.into()),
            op,
            rhs: Box::new(rhs.into()),
        }
        .into()
    }

    /// AND two conditions, flattening nested ANDs and skipping `None`.
    pub fn and_opt(lhs: Option<Expr>, rhs: Option<Expr>) -> Option<Expr> {
        match (lhs, rhs) {
            (None, rhs) => rhs,
            (lhs, None) => lhs,
            (Some(lhs), Some(rhs)) => Some(Expr::and_from_vec(vec![lhs, rhs])),
        }
    }

    pub fn and_from_vec(operands: Vec<Expr>) -> Expr {
        let mut flat = vec![];
        for operand in operands {
            match operand {
                Expr::And(inner) => flat.extend(inner),
                operand => flat.push(operand),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Expr::Bool(true))
        } else {
            Expr::And(flat)
        }
    }

    pub fn or_from_vec(operands: Vec<Expr>) -> Expr {
        let mut flat = vec![];
        for operand in operands {
            match operand {
                Expr::Or(inner) => flat.extend(inner),
                operand => flat.push(operand),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Expr::Bool(false))
        } else {
            Expr::Or(flat)
        }
    }

    pub fn not(expr: impl Into<Expr>) -> Expr {
        Expr::Not(Box::new(expr.into()))
    }

    pub fn is_null(expr: impl Into<Expr>) -> Expr {
        ExprIsNull {
            expr: Box::new(expr.into()),
            negate: false,
        }
        .into()
    }

    pub fn is_not_null(expr: impl Into<Expr>) -> Expr {
        ExprIsNull {
            expr: Box::new(expr.into()),
            negate: true,
        }
        .into()
    }

    pub fn in_list(expr: impl Into<Expr>, list: Vec<Value>) -> Expr {
        ExprInList {
            expr: Box::new(expr.into()),
            list,
        }
        .into()
    }

    pub fn in_subquery(expr: impl Into<Expr>, query: Select) -> Expr {
        ExprInSubquery {
            expr: Box::new(expr.into()),
            query: Box::new(query),
        }
        .into()
    }

    pub fn aggregate(func: Aggregate, arg: impl Into<Expr>) -> Expr {
        ExprFunc::Aggregate {
            func,
            arg: Some(Box::new(arg.into())),
        }
        .into()
    }

    /// `COUNT(*)`
    pub fn count_all() -> Expr {
        ExprFunc::Aggregate {
            func: Aggregate::Count,
            arg: None,
        }
        .into()
    }

    pub fn bit_and(expr: impl Into<Expr>, mask: impl Into<Expr>) -> Expr {
        ExprFunc::BitAnd(Box::new(expr.into()), Box::new(mask.into())).into()
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Func(ExprFunc::Aggregate { .. }))
    }

    pub fn as_field(&self) -> Option<&ExprField> {
        match self {
            Expr::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Collects the names of every table referenced by sub-queries nested in
    /// this expression.
    pub(crate) fn collect_tables(&self, dst: &mut Vec<String>) {
        match self {
            Expr::Arith(e) => e.operands.iter().for_each(|e| e.collect_tables(dst)),
            Expr::And(list) | Expr::Or(list) | Expr::Bulk(list) => {
                list.iter().for_each(|e| e.collect_tables(dst))
            }
            Expr::BinaryOp(e) => {
                e.lhs.collect_tables(dst);
                e.rhs.collect_tables(dst);
            }
            Expr::Func(func) => func.collect_tables(dst),
            Expr::InList(e) => e.expr.collect_tables(dst),
            Expr::InSubquery(e) => {
                e.expr.collect_tables(dst);
                e.query.collect_tables(dst);
            }
            Expr::IsNull(e) => e.expr.collect_tables(dst),
            Expr::Not(e) => e.collect_tables(dst),
            Expr::Bool(_) | Expr::Field(_) | Expr::Raw(_) | Expr::Value(_) => {}
        }
    }
}

impl core::convert::From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

impl core::convert::From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Bool(value)
    }
}
