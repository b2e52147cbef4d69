//! # Scan Error Types
//!
//! Error types for the async scan layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Lookup      │  │     Host                │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  PermissionPrompt       │ │
//! │  │  InvalidUrl     │  │  HttpStatus     │  │  CameraUnavailable      │ │
//! │  │  ConfigLoad/Save│  │  Timeout        │  │                         │ │
//! │  │                 │  │  Malformed      │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  LookupError ──kind()──► FailureKind ──► SessionState::Failed           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookup and host errors never reach the user as errors: the controller
//! turns them into a renderable state. Only configuration errors surface at
//! startup.

use thiserror::Error;

use barcoder_core::FailureKind;

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

// =============================================================================
// Lookup Error
// =============================================================================

/// Failure of one catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Connection, DNS or TLS failure.
    #[error("Catalog request failed: {0}")]
    Network(String),

    /// Endpoint answered with a non-success status.
    #[error("Catalog returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// No answer within the bound.
    #[error("Catalog did not answer within {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// Body is not JSON or has no `results` array.
    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),
}

impl LookupError {
    /// The session-level failure this error renders as.
    pub fn kind(&self) -> FailureKind {
        match self {
            LookupError::Network(_) | LookupError::HttpStatus { .. } => FailureKind::NetworkError,
            LookupError::Timeout { .. } => FailureKind::Timeout,
            LookupError::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }
}

// =============================================================================
// Scan Error
// =============================================================================

/// Scan layer error covering configuration, lookup and host failures.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Invalid catalog URL.
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// Catalog search failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    // =========================================================================
    // Host Errors
    // =========================================================================
    /// The host permission prompt itself failed.
    #[error("Permission prompt failed: {0}")]
    PermissionPrompt(String),

    /// The capture device could not be started.
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        ScanError::HttpClient(err.to_string())
    }
}

impl From<url::ParseError> for ScanError {
    fn from(err: url::ParseError) -> Self {
        ScanError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_)
                | ScanError::InvalidUrl(_)
                | ScanError::ConfigLoadFailed(_)
                | ScanError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_kinds() {
        assert_eq!(
            LookupError::Network("refused".into()).kind(),
            FailureKind::NetworkError
        );
        assert_eq!(
            LookupError::HttpStatus { status: 503 }.kind(),
            FailureKind::NetworkError
        );
        assert_eq!(
            LookupError::Timeout { after_ms: 10_000 }.kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            LookupError::MalformedResponse("no results".into()).kind(),
            FailureKind::MalformedResponse
        );
    }

    #[test]
    fn test_config_errors() {
        assert!(ScanError::InvalidUrl("ftp://x".into()).is_config_error());
        assert!(!ScanError::CameraUnavailable("busy".into()).is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = ScanError::from(LookupError::HttpStatus { status: 500 });
        assert_eq!(err.to_string(), "Catalog returned HTTP 500");
    }
}
