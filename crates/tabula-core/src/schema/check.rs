use super::name;

/// A check constraint over a dialect expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub name: String,
    pub expression: String,
}

impl Check {
    pub fn new(table: &str, expression: impl Into<String>) -> Check {
        let expression = expression.into();
        Check {
            name: name::object_name(name::CHECK_PREFIX, table, [expression.as_str()]),
            expression,
        }
    }
}
