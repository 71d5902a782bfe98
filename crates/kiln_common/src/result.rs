//! Common result and error types for the kiln cache.

/// The standard result type for operations that can only fail on a bug.
///
/// `Err` indicates a broken invariant between the compiler and the cache
/// (for example a constant kind the compiler never legitimately emits),
/// not a recoverable storage problem.
pub type KilnResult<T> = Result<T, InternalError>;

/// An internal error indicating an invariant violation, not a user input problem.
///
/// These errors should never occur during normal operation. If one does occur,
/// the cache for the affected target must be discarded and rebuilt.
#[derive(Debug, thiserror::Error)]
#[error("internal cache error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("something broke");
        assert_eq!(format!("{err}"), "internal cache error: something broke");
    }

    #[test]
    fn err_path() {
        let r: KilnResult<i32> = Err(InternalError::new("test error"));
        let err = r.err().unwrap();
        assert_eq!(err.message, "test error");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}
