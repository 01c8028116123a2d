use std::{env, fmt, str::FromStr};

use obskit_error::LoggingError;
use serde::{Deserialize, Serialize};

/// Допустимые уровни логирования.
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода событий.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::InvalidFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень для крейта `obskit`.
    pub level: String,
    /// Формат консольного вывода.
    pub format: LogFormat,
    /// ANSI-цвета в консоли.
    pub with_ansi: bool,
    /// Выводить target события.
    pub with_target: bool,
    /// Дополнительные директивы `EnvFilter` (например `"my_app=debug"`).
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Переопределяет поля из переменных окружения `OBSKIT_LOG_LEVEL` и
    /// `OBSKIT_LOG_FORMAT`. Некорректный формат игнорируется здесь и
    /// отлавливается в `validate`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("OBSKIT_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("OBSKIT_LOG_FORMAT") {
            match format.parse() {
                Ok(parsed) => self.format = parsed,
                Err(err) => eprintln!("Ignoring OBSKIT_LOG_FORMAT: {err}"),
            }
        }
    }

    /// Проверяет уровень и дополнительные директивы.
    pub fn validate(&self) -> Result<(), LoggingError> {
        let level = self.level.to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(LoggingError::InvalidLevel {
                level: self.level.clone(),
            });
        }
        if let Some(bad) = self.directives.iter().find(|d| d.trim().is_empty()) {
            return Err(LoggingError::InvalidDirective {
                directive: bad.clone(),
                reason: "empty directive".to_string(),
            });
        }
        Ok(())
    }

    /// Собирает строку директив для `EnvFilter`: `"obskit=<level>,..."`.
    pub fn build_filter_directive(&self) -> String {
        let mut parts = vec![format!("obskit={}", self.level.to_ascii_lowercase())];
        parts.extend(self.directives.iter().map(|d| d.trim().to_string()));
        parts.join(",")
    }
}
