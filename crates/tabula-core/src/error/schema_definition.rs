use super::Error;

/// Error in a table or view description.
///
/// Raised at load time for duplicate names, dangling references and
/// malformed expressions. The offending object is rejected; the rest of the
/// schema keeps loading.
#[derive(Debug)]
pub(super) struct SchemaDefinition {
    object: Box<str>,
    message: Box<str>,
}

impl std::error::Error for SchemaDefinition {}

impl core::fmt::Display for SchemaDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid schema object {}: {}", self.object, self.message)
    }
}

impl Error {
    pub fn schema_definition(object: impl Into<String>, message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::SchemaDefinition(SchemaDefinition {
            object: object.into().into(),
            message: message.into().into(),
        }))
    }

    pub fn is_schema_definition(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::SchemaDefinition(_))
    }
}
