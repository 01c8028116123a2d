use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки инициализации логирования.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("unknown log level '{level}'")]
    InvalidLevel { level: String },

    #[error("unknown log format '{format}'")]
    InvalidFormat { format: String },

    #[error("invalid filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("global subscriber already installed: {reason}")]
    AlreadyInitialized { reason: String },
}

impl ErrorExt for LoggingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLevel { .. }
            | Self::InvalidFormat { .. }
            | Self::InvalidDirective { .. } => StatusCode::InvalidConfig,
            Self::AlreadyInitialized { .. } => StatusCode::LoggingInit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let invalid = LoggingError::InvalidLevel {
            level: "loud".to_string(),
        };
        assert_eq!(invalid.status_code(), StatusCode::InvalidConfig);
        assert_eq!(invalid.to_string(), "unknown log level 'loud'");

        let twice = LoggingError::AlreadyInitialized {
            reason: "set".to_string(),
        };
        assert_eq!(twice.status_code(), StatusCode::LoggingInit);
    }
}
