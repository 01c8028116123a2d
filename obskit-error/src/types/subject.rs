use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки реестра подписок.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    /// Генератор уже выдал `u64::MAX` и больше не может выдавать
    /// идентификаторы.
    #[error("subscription id space exhausted after {last}")]
    IdSpaceExhausted { last: u64 },
}

impl ErrorExt for SubjectError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::IdSpaceExhausted { .. } => StatusCode::IdSpaceExhausted,
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "subject".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        match self {
            Self::IdSpaceExhausted { last } => tags.push(("last_id", last.to_string())),
        }
        tags
    }
}
