//! Configuration error types and validation traits.

pub mod onnx;

pub use onnx::{OrtGraphOptimizationLevel, OrtLogSeverity, OrtSessionConfig};

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error indicating that validation failed.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },
}

/// A trait for validating configuration parameters.
///
/// Implementors provide `validate` and `get_defaults`; the remaining methods are
/// reusable checks shared by every configuration type in the crate.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates that a `usize` value is positive.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to validate.
    /// * `field_name` - The name of the field being validated.
    fn validate_positive_usize(&self, value: usize, field_name: &str) -> Result<(), ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{field_name} must be greater than 0"),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a string field is not empty or whitespace.
    fn validate_non_empty(&self, value: &str, field_name: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            Err(ConfigError::InvalidConfig {
                message: format!("{field_name} must not be empty"),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a locale key such as `en`, `zh` or `pt-BR`.
    ///
    /// Only ASCII letters, digits, `-` and `_` are accepted since the key is
    /// also used as a file stem when label tables are read from disk.
    fn validate_locale(&self, locale: &str, field_name: &str) -> Result<(), ConfigError> {
        self.validate_non_empty(locale, field_name)?;
        if !locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::ValidationFailed {
                message: format!("{field_name} '{locale}' contains invalid characters"),
            });
        }
        Ok(())
    }
}

/// Extension trait for convenient validation.
pub trait ConfigValidatorExt: ConfigValidator + Sized {
    /// Validates and returns the configuration if valid.
    fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

impl<T: ConfigValidator> ConfigValidatorExt for T {}
