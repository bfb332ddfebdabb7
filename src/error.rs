// Error taxonomy for the estimation core and the record store
//
// NotFound   - a referenced record does not exist
// Validation - input rejected before any lookup or write
// Storage    - anything the backing store reported (propagated unchanged)

use thiserror::Error;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage failure: {0}")]
    Storage(#[source] BoxedSource),
}

impl Error {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Error::NotFound { entity, id }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::new(field, message))
    }

    pub fn storage(source: impl Into<BoxedSource>) -> Self {
        Error::Storage(source.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(Box::new(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Storage(Box::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_carries_id() {
        let err = Error::not_found("EV specification", 99999);
        assert_eq!(err.to_string(), "EV specification with id 99999 not found");
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_message() {
        let err = Error::invalid("annual_km", "must be positive");
        assert_eq!(err.to_string(), "invalid input: annual_km: must be positive");
        assert!(err.is_validation());
    }

    #[test]
    fn test_storage_wraps_rusqlite() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, Error::Storage(_)));
        assert!(err.to_string().starts_with("storage failure"));
    }
}
