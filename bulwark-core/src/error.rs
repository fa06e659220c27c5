// Error types for the Bulwark core

use thiserror::Error;

/// Result type for core operations
pub type FirewallResult<T> = Result<T, FirewallError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FirewallError {
    /// A request field could not be cloned into the scan representation
    #[error("Unsanitizable input at '{path}': {reason}")]
    UnsanitizableInput { path: String, reason: String },

    #[error("Module already registered: {0}")]
    DuplicateModule(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl FirewallError {
    /// Create an unsanitizable input error
    pub fn unsanitizable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsanitizableInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is an unsanitizable input error
    pub fn is_unsanitizable(&self) -> bool {
        matches!(self, Self::UnsanitizableInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsanitizable_display() {
        let err = FirewallError::unsanitizable("body.file", "binary payload");
        assert!(err.is_unsanitizable());
        assert_eq!(
            err.to_string(),
            "Unsanitizable input at 'body.file': binary payload"
        );
    }

    #[test]
    fn test_duplicate_module() {
        let err = FirewallError::DuplicateModule("xss".to_string());
        assert!(!err.is_unsanitizable());
        assert_eq!(err.to_string(), "Module already registered: xss");
    }
}
