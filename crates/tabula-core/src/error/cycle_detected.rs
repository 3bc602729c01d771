use super::Error;

/// A computed view column refers to itself, directly or through other columns.
#[derive(Debug)]
pub(super) struct CycleDetected {
    view: Box<str>,
    column: Box<str>,
}

impl std::error::Error for CycleDetected {}

impl core::fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "Parsing cycle detected. View: {} Column: {}",
            self.view, self.column
        )
    }
}

impl Error {
    pub fn cycle_detected(view: impl Into<String>, column: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::CycleDetected(CycleDetected {
            view: view.into().into(),
            column: column.into().into(),
        }))
    }

    pub fn is_cycle_detected(&self) -> bool {
        self.find(|kind| match kind {
            super::ErrorKind::CycleDetected(err) => Some(err),
            _ => None,
        })
        .is_some()
    }
}
