/// Subject configuration loading.
pub mod config;
/// Optional logging bootstrap (formatting, filters).
pub mod logging;
/// Subscription registry: Subject, Callback, handles, identifiers.
pub mod subject;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use self::config::SubjectSettings;
/// Logging bootstrap.
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// Operation errors and status codes.
pub use obskit_error::{
    ErrorExt, LoggingError, ObskitResult, SettingsError, StatusCode, SubjectError,
};
/// Subject API.
pub use subject::{
    Callback, CallbackKind, IdGenerator, SharedHandle, Subject, SubscriptionId, WeakHandle,
};
