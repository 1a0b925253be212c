//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse into the first error, if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

/// Depth above which property expansion gets slow on large object graphs.
const DEPTH_WARNING_THRESHOLD: u32 = 8;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_session(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_session(config: &Config, result: &mut ValidationResult) {
        if config.session.connect_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "session.connect_timeout_secs",
                "connect_timeout_secs must be greater than 0",
            ));
        }

        if config.session.fetch_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "session.fetch_timeout_ms",
                "fetch_timeout_ms must be greater than 0",
            ));
        }

        if config.session.max_depth > DEPTH_WARNING_THRESHOLD {
            result.add_warning(ValidationWarning::new(
                "session.max_depth",
                format!(
                    "max_depth is very high (>{}), each level may issue one fetch per property",
                    DEPTH_WARNING_THRESHOLD
                ),
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }

        if let Some(dir) = &config.logging.dir {
            if dir.is_file() {
                result.add_error(ValidationError::new(
                    "logging.dir",
                    format!("Log directory is a file: {:?}", dir),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
