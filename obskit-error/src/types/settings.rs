use std::fmt::Display;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки загрузки настроек.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {reason}")]
    Load { reason: String },

    /// Значение прочитано, но не подходит для реестра.
    #[error("invalid setting '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl SettingsError {
    /// Оборачивает ошибку источника конфигурации.
    pub fn load(err: impl Display) -> Self {
        Self::Load {
            reason: err.to_string(),
        }
    }
}

impl ErrorExt for SettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Load { .. } => StatusCode::ConfigLoad,
            Self::Invalid { .. } => StatusCode::InvalidConfig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_wraps_reason() {
        let err = SettingsError::load("missing field");
        assert_eq!(err.to_string(), "failed to load settings: missing field");
        assert_eq!(err.status_code(), StatusCode::ConfigLoad);
        assert!(err.status_code().is_client_error());
    }

    #[test]
    fn test_invalid_names_the_key() {
        let err = SettingsError::Invalid {
            key: "id_start",
            reason: "too large".to_string(),
        };
        assert_eq!(err.to_string(), "invalid setting 'id_start': too large");
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }
}
