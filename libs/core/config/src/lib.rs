//! Shared configuration plumbing for the query libraries.
//!
//! Settings are read from environment variables. Crates that own a config
//! struct implement [`FromEnv`] for it and lean on the helpers below for
//! defaults and parsing.

pub mod tracing;

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Runtime environment, selected by `APP_ENV`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Anything other than a case-insensitive `production` is development.
    pub fn from_env() -> Self {
        match env::var("APP_ENV") {
            Ok(value) if value.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
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

/// Read an environment variable, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable or fail with [`ConfigError::MissingEnvVar`]
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse an environment variable into `T`, using `default` when unset.
///
/// A variable that is set but fails to parse is an error, not a silent
/// fallback.
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
    fn test_environment_production_any_case() {
        for value in ["production", "PRODUCTION", "Production"] {
            temp_env::with_var("APP_ENV", Some(value), || {
                assert_eq!(Environment::from_env(), Environment::Production);
            });
        }
    }

    #[test]
    fn test_environment_unknown_value_is_development() {
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("QF_TEST_VAR", Some("set"), || {
            assert_eq!(env_or_default("QF_TEST_VAR", "fallback"), "set");
        });
        temp_env::with_var_unset("QF_TEST_VAR", || {
            assert_eq!(env_or_default("QF_TEST_VAR", "fallback"), "fallback");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("QF_REQUIRED", || {
            let err = env_required("QF_REQUIRED").unwrap_err();
            assert_eq!(err, ConfigError::MissingEnvVar("QF_REQUIRED".to_string()));
            assert!(err.to_string().contains("QF_REQUIRED"));
        });
    }

    #[test]
    fn test_env_parse_uses_default_when_unset() {
        temp_env::with_var_unset("QF_NUMBER", || {
            assert_eq!(env_parse("QF_NUMBER", 42_i64).unwrap(), 42);
        });
    }

    #[test]
    fn test_env_parse_reads_value() {
        temp_env::with_var("QF_NUMBER", Some(" 7 "), || {
            assert_eq!(env_parse("QF_NUMBER", 42_i64).unwrap(), 7);
        });
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        temp_env::with_var("QF_NUMBER", Some("seven"), || {
            let err = env_parse("QF_NUMBER", 42_i64).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "QF_NUMBER"));
        });
    }
}
