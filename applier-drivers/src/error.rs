/// Faults raised by the automation boundary.
///
/// A query that matches nothing is not a fault: [`crate::Browser::find_all`]
/// returns an empty list instead of [`DriverError::NoSuchElement`].
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("stale element reference")]
    StaleElement,

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("session error: {0}")]
    Session(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement)
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
