pub mod config;
mod filters;
mod formatter;

pub use self::config::{LogFormat, LoggingConfig};
use obskit_error::{ErrorExt, LogLevel, LoggingError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация глобального логирования с конфигурацией.
///
/// Библиотека сама ничего не устанавливает: вызывать из приложения или
/// тестов. Повторный вызов возвращает `LoggingError::AlreadyInitialized`.
pub fn init_logging(mut config: LoggingConfig) -> Result<(), LoggingError> {
    config.apply_env_overrides();
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);
    let console_layer = formatter::build_formatter_from_config(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized {
            reason: e.to_string(),
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = %config.format,
        "Logging system initialized"
    );

    Ok(())
}

/// Пишет ошибку библиотеки в лог на уровне, который задаёт её статус-код.
pub(crate) fn log_error(
    context: &str,
    err: &dyn ErrorExt,
) {
    let status = err.status_code();
    let tags = err
        .metrics_tags()
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    let details = err.log_message();

    macro_rules! emit {
        ($level:ident) => {
            tracing::$level!(
                %status,
                error_type = %err.type_name(),
                client_error = status.is_client_error(),
                %tags,
                %details,
                "{context}: {err}"
            )
        };
    }

    match status.log_level() {
        LogLevel::Trace => emit!(trace),
        LogLevel::Warn => emit!(warn),
        LogLevel::Error => emit!(error),
    }
}
