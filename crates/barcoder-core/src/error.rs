//! # Error Types
//!
//! Domain-specific error types for barcoder-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  barcoder-core errors (this file)                                      │
//! │  ├── CoreError        - Price, locale and symbology parsing            │
//! │  └── ValidationError  - Payload and catalog record rules               │
//! │                                                                         │
//! │  barcoder-scan errors (separate crate)                                 │
//! │  ├── LookupError      - Catalog search failures                        │
//! │  └── ScanError        - Config, permission, camera failures            │
//! │                                                                         │
//! │  Flow: ValidationError → record skipped                                │
//! │        LookupError → FailureKind → SessionState::Failed → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these errors ever escape to the user as-is. A failed lookup is
//! rendered through [`crate::types::FailureKind`], a bad record is dropped
//! from the result set.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A catalog price could not be read as a decimal amount.
    ///
    /// ## When This Occurs
    /// - The amount overflows i64 cents (`1e21`)
    /// - The exponent is malformed or out of range
    /// - The text contains anything but digits, one `.` and a leading `-`
    #[error("Invalid price '{value}': {reason}")]
    InvalidPrice { value: String, reason: String },

    /// A decoder reported a symbology name we do not know.
    #[error("Unknown symbology: {0}")]
    UnknownSymbology(String),

    /// A number locale tag we have no formatting rules for.
    #[error("Unknown locale: {0}")]
    UnknownLocale(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised for decoded payloads and for raw catalog records before they
/// become [`crate::types::Product`]s.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Wrong JSON type or an unreadable amount.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value repeats one already seen in the same set.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidPrice {
            value: "12,50".to_string(),
            reason: "unexpected character ','".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid price '12,50': unexpected character ','"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "thumbnail".to_string(),
        };
        assert_eq!(err.to_string(), "thumbnail is required");

        let err = ValidationError::Duplicate {
            field: "id".to_string(),
            value: "MLA1".to_string(),
        };
        assert_eq!(err.to_string(), "id 'MLA1' already exists");
    }

    #[test]
    fn test_invalid_format_message() {
        let err = ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "not a number".to_string(),
        };
        assert_eq!(err.to_string(), "price has invalid format: not a number");
    }
}
