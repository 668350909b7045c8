//! Common result and error types for the mend workspace.

/// The result type for operations that can only fail through a bug in mend.
///
/// User-facing problems (malformed manifests, ambiguous duplicates, failed
/// writes) have their own error enums in the crates that detect them.
pub type MendResult<T> = Result<T, InternalError>;

/// An internal error indicating a logic bug in mend, not a problem with the input.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
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
        let err = InternalError::new("overlapping edits");
        assert_eq!(format!("{err}"), "internal error: overlapping edits");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "edit out of bounds".to_string().into();
        assert_eq!(err.message, "edit out of bounds");
    }
}
