use super::Error;

/// A filter expression could not be parsed or does not fit the view.
#[derive(Debug)]
pub(super) struct InvalidFilter {
    message: Box<str>,
}

impl std::error::Error for InvalidFilter {}

impl core::fmt::Display for InvalidFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid filter: {}", self.message)
    }
}

impl Error {
    pub fn invalid_filter(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidFilter(InvalidFilter {
            message: message.into().into(),
        }))
    }

    pub fn is_invalid_filter(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidFilter(_))
    }
}
