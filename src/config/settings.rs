use serde::{de, Deserialize, Deserializer, Serialize};

use config::{Config, Environment};
use obskit_error::{ObskitResult, SettingsError};

use crate::logging::log_error;

/// Subject configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectSettings {
    /// First identifier handed out by the subject's generator.
    ///
    /// Must be below `u64::MAX`: a generator starting at the last value can
    /// hand out a single id only.
    #[serde(deserialize_with = "deserialize_id")]
    pub id_start: u64,
    /// Wrap every notification pass in a `notify` tracing span.
    pub trace_notifications: bool,
}

impl SubjectSettings {
    /// Loads settings from defaults and `OBSKIT_*` environment variables.
    pub fn load() -> ObskitResult<Self, SettingsError> {
        Self::load_with_prefix("OBSKIT")
    }

    /// Same as [`SubjectSettings::load`] with a custom environment prefix.
    pub fn load_with_prefix(prefix: &str) -> ObskitResult<Self, SettingsError> {
        let result = Self::build(prefix).and_then(Self::validate);
        if let Err(err) = &result {
            log_error(&format!("failed to load subject settings ({prefix})"), err);
        }
        result
    }

    /// Rejects values the registry cannot work with.
    pub fn validate(self) -> ObskitResult<Self, SettingsError> {
        if self.id_start == u64::MAX {
            return Err(SettingsError::Invalid {
                key: "id_start",
                reason: format!("must be below {}", u64::MAX),
            });
        }
        Ok(self)
    }

    fn build(prefix: &str) -> ObskitResult<Self, SettingsError> {
        // Environment values stay strings: implicit parsing goes through
        // i64/f64 and rounds ids above i64::MAX.
        let cfg = Config::builder()
            .set_default("id_start", "0")
            .and_then(|b| b.set_default("trace_notifications", false))
            .map_err(SettingsError::load)?
            .add_source(Environment::with_prefix(prefix))
            .build()
            .map_err(SettingsError::load)?;

        cfg.try_deserialize().map_err(SettingsError::load)
    }
}

/// Accepts an id as an unsigned integer or as its decimal string form.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl de::Visitor<'_> for IdVisitor {
        type Value = u64;

        fn expecting(
            &self,
            f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result {
            f.write_str("an unsigned 64-bit subscription id")
        }

        fn visit_u64<E: de::Error>(
            self,
            v: u64,
        ) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(
            self,
            v: i64,
        ) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(
            self,
            v: &str,
        ) -> Result<u64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_load_defaults() {
        env::remove_var("OBSKIT_ID_START");
        env::remove_var("OBSKIT_TRACE_NOTIFICATIONS");
        let settings = SubjectSettings::load().unwrap();
        assert_eq!(settings, SubjectSettings::default());
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        env::set_var("OBSKIT_TEST_ID_START", "42");
        env::set_var("OBSKIT_TEST_TRACE_NOTIFICATIONS", "true");
        let settings = SubjectSettings::load_with_prefix("OBSKIT_TEST").unwrap();
        env::remove_var("OBSKIT_TEST_ID_START");
        env::remove_var("OBSKIT_TEST_TRACE_NOTIFICATIONS");

        assert_eq!(settings.id_start, 42);
        assert!(settings.trace_notifications);
    }

    /// Ids above `i64::MAX` must arrive exactly as configured.
    #[test]
    #[serial]
    fn test_load_id_above_i64_max_is_exact() {
        env::set_var("OBSKIT_BIG_ID_START", "9223372036854775809");
        let result = SubjectSettings::load_with_prefix("OBSKIT_BIG");
        env::remove_var("OBSKIT_BIG_ID_START");

        assert_eq!(result.map(|s| s.id_start), Ok(9_223_372_036_854_775_809));
    }

    #[test]
    #[serial]
    fn test_load_id_just_below_max() {
        env::set_var("OBSKIT_EDGE_ID_START", "18446744073709551614");
        let result = SubjectSettings::load_with_prefix("OBSKIT_EDGE");
        env::remove_var("OBSKIT_EDGE_ID_START");

        assert_eq!(result.map(|s| s.id_start), Ok(u64::MAX - 1));
    }

    /// The last id leaves no room for a second subscription.
    #[test]
    #[serial]
    fn test_load_rejects_u64_max() {
        env::set_var("OBSKIT_MAX_ID_START", "18446744073709551615");
        let result = SubjectSettings::load_with_prefix("OBSKIT_MAX");
        env::remove_var("OBSKIT_MAX_ID_START");

        assert!(matches!(
            result,
            Err(SettingsError::Invalid { key: "id_start", .. })
        ));
    }

    /// Invalid numbers must surface as a load error, not a panic.
    #[test]
    #[serial]
    fn test_load_invalid_value() {
        env::set_var("OBSKIT_BAD_ID_START", "not-a-number");
        let result = SubjectSettings::load_with_prefix("OBSKIT_BAD");
        env::remove_var("OBSKIT_BAD_ID_START");

        assert!(matches!(result, Err(SettingsError::Load { .. })));
    }

    #[test]
    #[serial]
    fn test_negative_id_is_rejected() {
        env::set_var("OBSKIT_NEG_ID_START", "-1");
        let result = SubjectSettings::load_with_prefix("OBSKIT_NEG");
        env::remove_var("OBSKIT_NEG_ID_START");

        assert!(matches!(result, Err(SettingsError::Load { .. })));
    }
}
