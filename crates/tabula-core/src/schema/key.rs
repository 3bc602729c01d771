use super::name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Primary,
    Unique,
    Index,
}

/// A primary key, unique key or index of a physical table.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub kind: KeyKind,
    pub name: String,
    pub fields: Vec<String>,

    /// Dialect expression of an expression index. `fields` is empty then.
    pub expression: Option<String>,

    /// Whether an expression index is unique.
    pub unique: bool,
}

impl Key {
    pub fn primary(table: &str, field: &str) -> Key {
        Key::new(KeyKind::Primary, table, vec![field.to_string()])
    }

    pub fn unique(table: &str, fields: Vec<String>) -> Key {
        Key::new(KeyKind::Unique, table, fields)
    }

    pub fn index(table: &str, fields: Vec<String>) -> Key {
        Key::new(KeyKind::Index, table, fields)
    }

    /// An index over a dialect expression, optionally unique.
    pub fn expression_index(table: &str, expression: String, unique: bool) -> Key {
        Key {
            kind: KeyKind::Index,
            name: name::object_name(name::INDEX_PREFIX, table, [expression.as_str()]),
            fields: vec![],
            expression: Some(expression),
            unique,
        }
    }

    fn new(kind: KeyKind, table: &str, fields: Vec<String>) -> Key {
        let prefix = match kind {
            KeyKind::Primary => name::PRIMARY_KEY_PREFIX,
            KeyKind::Unique => name::UNIQUE_KEY_PREFIX,
            KeyKind::Index => name::INDEX_PREFIX,
        };
        Key {
            kind,
            name: name::object_name(prefix, table, fields.iter().map(String::as_str)),
            fields,
            expression: None,
            unique: kind != KeyKind::Index,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.kind == KeyKind::Primary
    }

    pub fn is_unique_key(&self) -> bool {
        self.kind == KeyKind::Unique
    }

    pub fn is_index(&self) -> bool {
        self.kind == KeyKind::Index
    }
}
