//! Error types for the fallback runner

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the fallback runner
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The declared language has no simulated backend
    #[error("Language {0} not supported yet")]
    UnsupportedLanguage(String),

    /// The simulated interpreter could not evaluate the program.
    /// The message is already phrased the way Python would report it.
    #[error("{0}")]
    Evaluation(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is a client error (caused by the submitted code or request)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::UnsupportedLanguage(_) | Error::Evaluation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_language_message() {
        let err = Error::UnsupportedLanguage("cobol".to_string());
        assert_eq!(err.to_string(), "Language cobol not supported yet");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_evaluation_message_is_verbatim() {
        let err = Error::Evaluation("ZeroDivisionError: division by zero".to_string());
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_internal_is_not_client_error() {
        assert!(!Error::Internal("boom".to_string()).is_client_error());
        assert!(!Error::Config("bad".to_string()).is_client_error());
    }
}
