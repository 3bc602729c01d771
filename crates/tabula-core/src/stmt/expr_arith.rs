use super::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprArith {
    pub op: ArithOp,
    pub operands: Vec<Expr>,
}

impl ArithOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

impl Expr {
    pub fn arith(op: ArithOp, operands: Vec<Expr>) -> Expr {
        ExprArith { op, operands }.into()
    }
}

impl From<ExprArith> for Expr {
    fn from(value: ExprArith) -> Self {
        Expr::Arith(value)
    }
}
