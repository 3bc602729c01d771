use super::Error;

/// A statement failed in the database.
///
/// `message` is the user-facing text produced by the dialect's message
/// translation table; `driver_message` keeps the raw driver text.
#[derive(Debug)]
pub(super) struct QueryFailed {
    message: Box<str>,
    driver_message: Box<str>,
}

impl std::error::Error for QueryFailed {}

impl core::fmt::Display for QueryFailed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error {
    pub fn query_failed(message: impl Into<String>, driver_message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::QueryFailed(QueryFailed {
            message: message.into().into(),
            driver_message: driver_message.into().into(),
        }))
    }

    pub fn is_query_failed(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::QueryFailed(_))
    }

    /// The untranslated driver text of a query failure.
    pub fn query_failed_driver_message(&self) -> Option<&str> {
        self.find(|kind| match kind {
            super::ErrorKind::QueryFailed(err) => Some(err),
            _ => None,
        })
        .map(|err| &*err.driver_message)
    }
}
