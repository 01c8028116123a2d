pub mod settings;

pub use settings::SubjectSettings;
