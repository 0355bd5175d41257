use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guidelines::PharmacyContact;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pharmacy: PharmacyConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct PharmacyConfig {
    pub phone: String,
    pub hours: String,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let contact = PharmacyContact::default();
        Self {
            pharmacy: PharmacyConfig { phone: contact.phone, hours: contact.hours },
            session: SessionConfig { timeout_secs: 900 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("remedy.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn contact(&self) -> PharmacyContact {
        PharmacyContact { phone: self.pharmacy.phone.clone(), hours: self.pharmacy.hours.clone() }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pharmacy) = patch.pharmacy {
            if let Some(phone) = pharmacy.phone {
                self.pharmacy.phone = phone;
            }
            if let Some(hours) = pharmacy.hours {
                self.pharmacy.hours = hours;
            }
        }
        if let Some(session) = patch.session {
            if let Some(timeout_secs) = session.timeout_secs {
                self.session.timeout_secs = timeout_secs;
            }
        }
        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("REMEDY_PHARMACY_PHONE") {
            self.pharmacy.phone = value;
        }
        if let Some(value) = read_env("REMEDY_PHARMACY_HOURS") {
            self.pharmacy.hours = value;
        }
        if let Some(value) = read_env("REMEDY_SESSION_TIMEOUT_SECS") {
            self.session.timeout_secs = value.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "REMEDY_SESSION_TIMEOUT_SECS".to_string(),
                    value,
                }
            })?;
        }
        if let Some(value) = read_env("REMEDY_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("REMEDY_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pharmacy.phone.trim().is_empty() {
            return Err(ConfigError::Validation("pharmacy.phone must not be empty".to_string()));
        }
        if self.session.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "session.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pharmacy: Option<PharmacyPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Deserialize)]
struct PharmacyPatch {
    phone: Option<String>,
    hours: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionPatch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("remedy.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigError, LoadOptions, LogFormat};

    #[test]
    fn defaults_stand_alone_without_a_file() {
        let config = AppConfig::default();
        assert_eq!(config.session.timeout_secs, 900);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(!config.pharmacy.phone.is_empty());
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[pharmacy]\nphone = \"+44-20-0000\"\n\n[logging]\nlevel = \"debug\"\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
        })
        .expect("load");

        assert_eq!(config.pharmacy.phone, "+44-20-0000");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        // Untouched sections keep their defaults.
        assert_eq!(config.session.timeout_secs, 900);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
        })
        .expect_err("must fail");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[session]\ntimeout_secs = 0\n").expect("write config");

        let error = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
        })
        .expect_err("must fail validation");
        assert!(matches!(error, ConfigError::Validation(_)));
    }
}
