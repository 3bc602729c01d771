use super::Error;

#[derive(Debug)]
pub(super) struct UnknownObject {
    what: &'static str,
    name: Box<str>,
}

impl std::error::Error for UnknownObject {}

impl core::fmt::Display for UnknownObject {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unknown {}: {}", self.what, self.name)
    }
}

impl Error {
    pub fn unknown_table(name: impl Into<String>) -> Error {
        Error::unknown_object("table", name.into())
    }

    pub fn unknown_view(name: impl Into<String>) -> Error {
        Error::unknown_object("view", name.into())
    }

    pub fn unknown_column(owner: &str, name: &str) -> Error {
        Error::unknown_object("column", format!("{owner}.{name}"))
    }

    pub fn unknown_field(table: &str, name: &str) -> Error {
        Error::unknown_object("field", format!("{table}.{name}"))
    }

    pub fn is_unknown_object(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnknownObject(_))
    }

    fn unknown_object(what: &'static str, name: String) -> Error {
        Error::from(super::ErrorKind::UnknownObject(UnknownObject {
            what,
            name: name.into(),
        }))
    }
}
