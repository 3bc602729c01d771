use super::Error;

/// Messages recorded by before-stage event handlers.
///
/// A write that ends with this error never reached the database.
#[derive(Debug)]
pub(super) struct ValidationFailed {
    messages: Vec<String>,
}

impl std::error::Error for ValidationFailed {}

impl core::fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "validation failed: {}", self.messages.join("; "))
    }
}

impl Error {
    pub fn validation(messages: Vec<String>) -> Error {
        Error::from(super::ErrorKind::Validation(ValidationFailed { messages }))
    }

    pub fn is_validation(&self) -> bool {
        self.validation_messages().is_some()
    }

    /// Messages collected by the event handlers that rejected the write.
    pub fn validation_messages(&self) -> Option<&[String]> {
        self.find(|kind| match kind {
            super::ErrorKind::Validation(err) => Some(err),
            _ => None,
        })
        .map(|err| &err.messages[..])
    }
}
