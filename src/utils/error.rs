use thiserror::Error;

use crate::domain::model::SendRequestId;

#[derive(Error, Debug)]
pub enum GroupTextError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Dispatch request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Send request {0} already exists")]
    DuplicateSendRequest(SendRequestId),

    #[error("Send request not found: {0}")]
    SendRequestNotFound(SendRequestId),

    #[error("Invalid recipient state transition: {message}")]
    InvalidTransition { message: String },

    #[error("Dispatch error: {message}")]
    DispatchError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Dispatch,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GroupTextError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GroupTextError::ConfigError { .. }
            | GroupTextError::ConfigValidationError { .. }
            | GroupTextError::MissingConfigError { .. }
            | GroupTextError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            GroupTextError::IoError(_)
            | GroupTextError::SerializationError(_)
            | GroupTextError::StorageError { .. }
            | GroupTextError::DuplicateSendRequest(_)
            | GroupTextError::SendRequestNotFound(_) => ErrorCategory::Storage,
            GroupTextError::HttpError(_) | GroupTextError::DispatchError { .. } => {
                ErrorCategory::Dispatch
            }
            GroupTextError::InvalidTransition { .. } => ErrorCategory::Validation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Dispatch => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => "The message store could not be read or written.".to_string(),
            ErrorCategory::Dispatch => "The message could not be handed to the delivery queue.".to_string(),
            ErrorCategory::Validation => format!("Invalid input: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML configuration file and command line flags",
            ErrorCategory::Storage => "Check that the data directory exists and is writable",
            ErrorCategory::Dispatch => "Check that the dispatch endpoint is reachable, pending sends stay queued in the store",
            ErrorCategory::Validation => "Correct the input and try again",
        }
    }
}

pub type Result<T> = std::result::Result<T, GroupTextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = GroupTextError::MissingConfigError {
            field: "messaging.origin_number".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("messaging.origin_number"));
    }

    #[test]
    fn test_storage_message_hides_detail() {
        let err = GroupTextError::StorageError {
            message: "disk /var/lib/secret full".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.user_friendly_message().contains("/var/lib/secret"));
    }
}
