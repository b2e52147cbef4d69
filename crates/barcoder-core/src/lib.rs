//! # barcoder-core: Pure Scan Logic for Barcoder
//!
//! This crate is the **heart** of Barcoder. It contains the scan-to-results
//! state machine and every domain type as pure code with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Barcoder Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Mobile Screen (React Native)                    │   │
//! │  │   Camera view ──► Spinner ──► Product grid ──► "Scan again"    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ScreenView snapshots                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 barcoder-scan (async layer)                     │   │
//! │  │   PermissionGate, ScanController, CatalogClient, CameraLease    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ barcoder-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  session  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ScanSession│  │   rules   │  │   │
//! │  │   │ Symbology │  │   Price   │  │SessionSt. │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Symbology, ScanEvent, PermissionState)
//! - [`money`] - Money type with integer arithmetic and locale formatting
//! - [`session`] - The pure scan session state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Payload and catalog record validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every transition is deterministic
//! 2. **No I/O**: Camera, network and permission prompts live in barcoder-scan
//! 3. **Integer Money**: Prices are kept in cents (i64), never floats
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use barcoder_core::session::{ScanDecision, ScanPolicy, ScanSession, SessionState};
//! use barcoder_core::types::{ScanEvent, Symbology};
//!
//! let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
//! let event = ScanEvent::new(Symbology::Ean13, "7791234567890");
//!
//! let ScanDecision::Lookup(ticket) = session.on_scan(&event) else {
//!     panic!("retail barcode should start a lookup");
//! };
//! session.resolve(&ticket, Ok(Vec::new()));
//!
//! assert!(matches!(session.state(), SessionState::Empty { .. }));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, NumberLocale, Price};
pub use session::{
    Generation, IgnoreReason, LookupTicket, Resolution, ScanDecision, ScanMode, ScanPolicy,
    ScanSession, ScreenView, SessionState,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of listings requested from the catalog per lookup.
///
/// Fixed by the catalog contract; the result grid never pages.
pub const CATALOG_PAGE_SIZE: usize = 10;

/// Longest decoded payload the session will accept.
///
/// A version 40 QR code tops out at 7089 numeric characters; anything longer
/// came from a misbehaving decoder.
pub const MAX_PAYLOAD_LEN: usize = 8192;

/// Currency assumed when a catalog record does not carry one.
pub const DEFAULT_CURRENCY: &str = "ARS";
