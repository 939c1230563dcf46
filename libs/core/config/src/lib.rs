pub mod tracing;

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment (dev = local cluster, prod = managed cluster)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env_or_default("APP_ENV", "development");

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load an environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to load an environment variable or return error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Load and parse an environment variable, falling back to `default` when unset
///
/// A set-but-unparseable value is an error rather than a silent fallback.
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated environment variable into trimmed, non-empty items
pub fn env_list(key: &str) -> Result<Vec<String>, ConfigError> {
    let raw = env_required(key)?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        return Err(ConfigError::ParseError {
            key: key.to_string(),
            details: "no values provided".to_string(),
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("MISSING_REQUIRED", || {
            let err = env_required("MISSING_REQUIRED").unwrap_err();
            assert!(err.to_string().contains("MISSING_REQUIRED"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_parse_uses_default_when_unset() {
        temp_env::with_var_unset("BATCH_SIZE_TEST", || {
            let value: usize = env_parse("BATCH_SIZE_TEST", 100).unwrap();
            assert_eq!(value, 100);
        });
    }

    #[test]
    fn test_env_parse_reads_value() {
        temp_env::with_var("BATCH_SIZE_TEST", Some(" 250 "), || {
            let value: usize = env_parse("BATCH_SIZE_TEST", 100).unwrap();
            assert_eq!(value, 250);
        });
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        temp_env::with_var("BATCH_SIZE_TEST", Some("lots"), || {
            let err = env_parse::<usize>("BATCH_SIZE_TEST", 100).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "BATCH_SIZE_TEST"));
        });
    }

    #[test]
    fn test_env_list_splits_and_trims() {
        temp_env::with_var("HOSTS_TEST", Some("10.0.0.1:9042, 10.0.0.2:9042,,"), || {
            let hosts = env_list("HOSTS_TEST").unwrap();
            assert_eq!(hosts, vec!["10.0.0.1:9042", "10.0.0.2:9042"]);
        });
    }

    #[test]
    fn test_env_list_empty_is_error() {
        temp_env::with_var("HOSTS_TEST", Some(" , "), || {
            assert!(env_list("HOSTS_TEST").is_err());
        });
    }
}
