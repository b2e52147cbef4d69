//! # Validation Module
//!
//! Input validation for decoded payloads and catalog records.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Points                                  │
//! │                                                                         │
//! │  Decoder ──► ScanEvent.payload ──► validate_payload                    │
//! │                                     └── blank/oversized: event dropped │
//! │                                                                         │
//! │  Catalog ──► raw record ──► Product::try_new                           │
//! │                              ├── validate_required (id, title, ...)    │
//! │                              └── validate_price                        │
//! │                                  └── any failure: record skipped       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use barcoder_core::validation::{validate_payload, validate_required};
//!
//! assert!(validate_payload("7791234567890").is_ok());
//! assert!(validate_payload("   ").is_err());
//! assert!(validate_required("title", "Yerba").is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Price;
use crate::MAX_PAYLOAD_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a decoded barcode payload.
///
/// ## Rules
/// - Must contain something other than whitespace
/// - At most [`MAX_PAYLOAD_LEN`] characters
///
/// The payload itself is never trimmed or rewritten; QR contents may carry
/// meaningful whitespace.
pub fn validate_payload(payload: &str) -> ValidationResult<()> {
    if payload.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "payload".to_string(),
        });
    }

    if payload.chars().count() > MAX_PAYLOAD_LEN {
        return Err(ValidationError::TooLong {
            field: "payload".to_string(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    Ok(())
}

/// Validates that a text field is present and not blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a listing price.
pub fn validate_price(price: &Price) -> ValidationResult<()> {
    if price.amount.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }
    validate_required("currency", &price.currency)
}
