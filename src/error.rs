use chrono::NaiveDate;

/// Malformed or missing input. Always recoverable by correcting the request.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("week start {0} is not a Friday")]
    NotWeekAnchor(NaiveDate),
    #[error("week starting {0} cannot be represented")]
    WeekOutOfRange(NaiveDate),
    #[error("a report for the week of {0} already exists")]
    DuplicateWeek(NaiveDate),
    #[error("accomplished tasks must be at least {min} characters, got {found}")]
    TasksTooShort { min: usize, found: usize },
    #[error("hours worked must be within 0..=168, got {0}")]
    HoursOutOfRange(f64),
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("{0} is not a permitted recipient")]
    RecipientNotAllowed(String),
    #[error("attachment of {found} bytes exceeds the {limit} byte limit")]
    AttachmentTooLarge { limit: u64, found: u64 },
    #[error("{0} is not a supervisor")]
    NotASupervisor(String),
    #[error("{0} is not an employee")]
    NotAnEmployee(String),
    #[error("actor {0} is already registered")]
    DuplicateActor(String),
}

impl ValidationError {
    /// The request field the failure refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NotWeekAnchor(_) | Self::WeekOutOfRange(_) | Self::DuplicateWeek(_) => {
                "week_start_date"
            }
            Self::TasksTooShort { .. } => "accomplished_tasks",
            Self::HoursOutOfRange(_) => "hours_worked",
            Self::Blank(field) => *field,
            Self::RecipientNotAllowed(_) => "recipient_id",
            Self::AttachmentTooLarge { .. } => "file",
            Self::NotASupervisor(_) => "supervisor_id",
            Self::NotAnEmployee(_) | Self::DuplicateActor(_) => "id",
        }
    }
}

/// Every failure the core returns maps to exactly one of these.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation failed on {field}: {0}", field = .0.field())]
    Validation(#[from] ValidationError),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    // absent and invisible are reported identically
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("dependency failure: {0}")]
    Dependency(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Conflicts may succeed after re-fetching; dependency failures are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Dependency(_))
    }
}

impl From<sled::Error> for Error {
    fn from(value: sled::Error) -> Self {
        Self::Dependency(format!("store: {value}"))
    }
}

impl From<minicbor::decode::Error> for Error {
    fn from(value: minicbor::decode::Error) -> Self {
        Self::Dependency(format!("corrupt record: {value}"))
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for Error {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        Self::Dependency(format!("failed to encode record: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_names_the_field() {
        let err: Error = ValidationError::TasksTooShort { min: 10, found: 3 }.into();
        assert!(err.to_string().contains("accomplished_tasks"));
        assert!(!err.is_retryable());
        assert!(Error::Conflict("x".into()).is_retryable());
    }
}
