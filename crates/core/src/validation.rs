//! Field-level validation
//!
//! Collects every problem in a manifest before failing, so a single run
//! reports all offending fields.
//!
//! # Example
//!
//! ```rust
//! use buildcfg_core::validation::Validator;
//!
//! let result = Validator::new()
//!     .present("sdk.min", &Some(24u32))
//!     .ordered("sdk.min", 24, "sdk.target", 36)
//!     .validate();
//!
//! assert!(result.is_valid());
//! ```

use crate::error::{Error, ErrorCode, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Validation error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: ErrorCode,
    /// Expected value (if applicable)
    pub expected: Option<String>,
    /// Actual value (if applicable)
    pub actual: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get all warnings
    pub fn warnings(&self) -> &[ValidationError] {
        &self.warnings
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: ValidationError) {
        self.warnings.push(warning);
    }

    /// Convert to Result type
    ///
    /// The returned error takes the code of the first recorded error; the
    /// message lists all of them. Warnings are handed back on success.
    pub fn into_result(self) -> Result<Vec<ValidationError>> {
        let Some(first) = self.errors.first() else {
            return Ok(self.warnings);
        };

        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        Err(Error::new(first.code, messages.join("; ")))
    }
}

/// Fluent validator builder
pub struct Validator {
    result: ValidationResult,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    fn error(
        mut self,
        field: &str,
        code: ErrorCode,
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        self.result.add_error(ValidationError {
            field: field.to_string(),
            message,
            code,
            expected,
            actual,
        });
        self
    }

    /// Validate that an optional field was supplied
    pub fn present<T>(self, field: &str, value: &Option<T>) -> Self {
        if value.is_some() {
            return self;
        }
        self.error(
            field,
            ErrorCode::MissingField,
            "Field is required".to_string(),
            Some("a value".to_string()),
            Some("absent".to_string()),
        )
    }

    /// Validate that a string field is not blank
    pub fn required(self, field: &str, value: &str) -> Self {
        if !value.trim().is_empty() {
            return self;
        }
        self.error(
            field,
            ErrorCode::MissingField,
            "Field is required".to_string(),
            Some("non-empty value".to_string()),
            Some("empty".to_string()),
        )
    }

    /// Validate against a compiled pattern
    pub fn pattern(self, field: &str, value: &str, pattern: &Regex, description: &str) -> Self {
        if value.is_empty() || pattern.is_match(value) {
            return self;
        }
        self.error(
            field,
            ErrorCode::InvalidFormat,
            format!("Must be {}", description),
            Some(description.to_string()),
            Some(value.to_string()),
        )
    }

    /// Validate a lower bound
    pub fn at_least<T: PartialOrd + Display>(self, field: &str, value: T, min: T) -> Self {
        if value >= min {
            return self;
        }
        self.error(
            field,
            ErrorCode::InvalidRange,
            format!("Must be at least {}", min),
            Some(format!(">= {}", min)),
            Some(value.to_string()),
        )
    }

    /// Validate that `lower <= upper`
    pub fn ordered<T: PartialOrd + Display>(
        self,
        lower_field: &str,
        lower: T,
        upper_field: &str,
        upper: T,
    ) -> Self {
        if lower <= upper {
            return self;
        }
        self.error(
            lower_field,
            ErrorCode::InvalidRange,
            format!("{} exceeds {} ({})", lower, upper_field, upper),
            Some(format!("<= {}", upper)),
            Some(lower.to_string()),
        )
    }

    /// Add a custom validation
    pub fn custom<F>(self, field: &str, code: ErrorCode, f: F) -> Self
    where
        F: FnOnce() -> Option<String>,
    {
        match f() {
            Some(message) => self.error(field, code, message, None, None),
            None => self,
        }
    }

    /// Add a warning (non-blocking)
    pub fn warn_if(mut self, field: &str, condition: bool, message: &str) -> Self {
        if condition {
            self.result.add_warning(ValidationError {
                field: field.to_string(),
                message: message.to_string(),
                code: ErrorCode::ValidationError,
                expected: None,
                actual: None,
            });
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}
