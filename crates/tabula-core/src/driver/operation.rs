use crate::stmt::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Execute a statement that returns rows
    Query(Sql),

    /// Execute a statement that returns an update count
    Execute(Sql),

    /// Execute several parameterless statements separated by `;`. Used for
    /// DDL, such as trigger definitions.
    Batch(String),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

/// Rendered SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sql {
    pub text: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Start a transaction
    Start,

    /// Commit a transaction
    Commit,

    /// Rollback a transaction
    Rollback,
}

impl Sql {
    pub fn new(text: impl Into<String>, params: Vec<Value>) -> Sql {
        Sql {
            text: text.into(),
            params,
        }
    }
}

impl From<&str> for Sql {
    fn from(value: &str) -> Self {
        Sql::new(value, vec![])
    }
}

impl From<String> for Sql {
    fn from(value: String) -> Self {
        Sql::new(value, vec![])
    }
}

impl From<Transaction> for Operation {
    fn from(value: Transaction) -> Operation {
        Operation::Transaction(value)
    }
}

impl Operation {
    /// The SQL text of the operation, for logging.
    pub fn text(&self) -> &str {
        match self {
            Operation::Query(sql) | Operation::Execute(sql) => &sql.text,
            Operation::Batch(text) => text,
            Operation::Transaction(Transaction::Start) => "BEGIN",
            Operation::Transaction(Transaction::Commit) => "COMMIT",
            Operation::Transaction(Transaction::Rollback) => "ROLLBACK",
        }
    }
}
