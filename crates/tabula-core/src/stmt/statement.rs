use super::{Delete, Insert, Select, Update};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Delete(Delete),
    Insert(Insert),
    Query(Select),
    Update(Update),
}

impl Statement {
    pub fn is_query(&self) -> bool {
        matches!(self, Statement::Query(_))
    }

    /// Target table of a write, `None` for queries.
    pub fn target(&self) -> Option<&str> {
        match self {
            Statement::Delete(stmt) => Some(&stmt.table),
            Statement::Insert(stmt) => Some(&stmt.table),
            Statement::Update(stmt) => Some(&stmt.table),
            Statement::Query(_) => None,
        }
    }

    /// Names of every table the statement touches, first occurrence wins.
    pub fn tables(&self) -> Vec<String> {
        let mut dst = vec![];
        match self {
            Statement::Delete(stmt) => stmt.collect_tables(&mut dst),
            Statement::Insert(stmt) => stmt.collect_tables(&mut dst),
            Statement::Query(stmt) => stmt.collect_tables(&mut dst),
            Statement::Update(stmt) => stmt.collect_tables(&mut dst),
        }
        let mut seen: Vec<String> = vec![];
        dst.retain(|name| {
            if seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                false
            } else {
                seen.push(name.clone());
                true
            }
        });
        dst
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
