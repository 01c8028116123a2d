pub mod logging;
pub mod settings;
pub mod subject;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use logging::*;
pub use settings::*;
pub use subject::*;
