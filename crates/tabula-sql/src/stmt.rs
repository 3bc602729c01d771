mod add_constraint;
pub use add_constraint::{AddConstraint, ConstraintKind, TableConstraint};

mod column_def;
pub use column_def::ColumnDef;

mod copy_table;
pub use copy_table::CopyTable;

mod create_index;
pub use create_index::{CreateIndex, IndexTarget};

mod create_table;
pub use create_table::CreateTable;

mod create_trigger;
pub use create_trigger::CreateTrigger;

mod drop_foreign_key;
pub use drop_foreign_key::DropForeignKey;

mod drop_table;
pub use drop_table::DropTable;

mod name;
pub use name::Name;

mod pragma;
pub use pragma::Pragma;

mod rename_table;
pub use rename_table::RenameTable;

pub use tabula_core::stmt::{
    Aggregate, ArithOp, BinaryOp, Delete, Expr, ExprArith, ExprBinaryOp, ExprField, ExprFunc,
    ExprInList, ExprInSubquery, ExprIsNull, Insert, InsertSource, Join, JoinKind, OrderBy, Select,
    SelectItem, Source, Update, Value,
};

#[derive(Debug, Clone)]
pub enum Statement {
    AddConstraint(AddConstraint),
    CopyTable(CopyTable),
    CreateIndex(CreateIndex),
    CreateTable(CreateTable),
    CreateTrigger(CreateTrigger),
    Delete(Delete),
    DropForeignKey(DropForeignKey),
    DropTable(DropTable),
    Insert(Insert),
    Pragma(Pragma),
    Query(Select),
    RenameTable(RenameTable),
    Update(Update),
}

impl Statement {
    pub fn is_query(&self) -> bool {
        matches!(self, Statement::Query(_))
    }

    /// True for schema changing statements. They carry no parameters.
    pub fn is_ddl(&self) -> bool {
        !matches!(
            self,
            Statement::Delete(_) | Statement::Insert(_) | Statement::Query(_) | Statement::Update(_)
        )
    }
}

impl From<tabula_core::stmt::Statement> for Statement {
    fn from(value: tabula_core::stmt::Statement) -> Self {
        match value {
            tabula_core::stmt::Statement::Delete(stmt) => Statement::Delete(stmt),
            tabula_core::stmt::Statement::Insert(stmt) => Statement::Insert(stmt),
            tabula_core::stmt::Statement::Query(stmt) => Statement::Query(stmt),
            tabula_core::stmt::Statement::Update(stmt) => Statement::Update(stmt),
        }
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Statement::Query(value)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Statement::Insert(value)
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Statement::Update(value)
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Statement::Delete(value)
    }
}
