//! A dialect-independent SQL statement tree.
//!
//! Statements are built by the view compiler and the query engine and
//! rendered to dialect SQL by `tabula-sql`.

mod delete;
pub use delete::Delete;

mod expr;
pub use expr::Expr;

mod expr_arith;
pub use expr_arith::{ArithOp, ExprArith};

mod expr_binary_op;
pub use expr_binary_op::{BinaryOp, ExprBinaryOp};

mod expr_field;
pub use expr_field::ExprField;

mod expr_func;
pub use expr_func::{Aggregate, ExprFunc};

mod expr_in_list;
pub use expr_in_list::ExprInList;

mod expr_in_subquery;
pub use expr_in_subquery::ExprInSubquery;

mod expr_is_null;
pub use expr_is_null::ExprIsNull;

mod insert;
pub use insert::{Insert, InsertSource};

mod order_by;
pub use order_by::OrderBy;

mod select;
pub use select::{Select, SelectItem};

mod source;
pub use source::{From, Join, JoinKind, Source};

mod statement;
pub use statement::Statement;

mod update;
pub use update::Update;

mod value;
pub use value::Value;
