use std::path::Path;

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Префикс переменных окружения: `TOPICBUS_BROKER__LIFECYCLE_EVENTS=false`.
const ENV_PREFIX: &str = "TOPICBUS";

/// Поведение брокера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Публиковать ли служебные события `@sub`, `@unsub` и др.
    pub lifecycle_events: bool,
    /// Перехватывать ли панику обработчиков. При `false` паника
    /// пробрасывается из `drain`/`publish_sync`.
    pub catch_panics: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            lifecycle_events: true,
            catch_panics: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub broker: BrokerConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Значения по умолчанию, поверх них переменные окружения.
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    /// Как [`Settings::load`], но с файлом между значениями по умолчанию и
    /// окружением. Формат определяется по расширению.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Settings::default();
        Config::builder()
            .set_default("broker.lifecycle_events", defaults.broker.lifecycle_events)?
            .set_default("broker.catch_panics", defaults.broker.catch_panics)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format.as_str())?
            .set_default("logging.with_target", defaults.logging.with_target)?
            .set_default("logging.with_ansi", defaults.logging.with_ansi)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    const VARS: [&str; 3] = [
        "TOPICBUS_BROKER__LIFECYCLE_EVENTS",
        "TOPICBUS_BROKER__CATCH_PANICS",
        "TOPICBUS_LOGGING__FORMAT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        clear_env();
        let settings = Settings::load().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.broker.lifecycle_events);
        assert!(settings.broker.catch_panics);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    #[serial]
    fn test_env_overrides_defaults() {
        clear_env();
        env::set_var("TOPICBUS_BROKER__LIFECYCLE_EVENTS", "false");
        env::set_var("TOPICBUS_LOGGING__FORMAT", "json");

        let settings = Settings::load();
        clear_env();

        let settings = settings.unwrap();
        assert!(!settings.broker.lifecycle_events);
        assert!(settings.broker.catch_panics);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    /// Тест проверяет порядок источников: файл перекрывает значения по
    /// умолчанию, окружение перекрывает файл.
    #[test]
    #[serial]
    fn test_file_then_env() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[broker]\ncatch_panics = false\nlifecycle_events = false\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        env::set_var("TOPICBUS_BROKER__LIFECYCLE_EVENTS", "true");
        let settings = Settings::load_from_file(file.path());
        clear_env();

        let settings = settings.unwrap();
        assert!(!settings.broker.catch_panics);
        assert!(settings.broker.lifecycle_events);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_invalid_value_is_an_error() {
        clear_env();
        env::set_var("TOPICBUS_LOGGING__FORMAT", "xml");
        let result = Settings::load();
        clear_env();
        assert!(result.is_err());
    }
}
