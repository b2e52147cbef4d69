//! # barcoder-scan: Async Scan Layer for Barcoder
//!
//! Connects the pure [`barcoder_core::ScanSession`] to the outside world: the
//! host's permission prompt, the camera, and the remote product catalog.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Scan Layer Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    ScanController (one per screen)               │  │
//! │  │                                                                  │  │
//! │  │  activate / handle_scan / scan_again / deactivate                │  │
//! │  │  Notifies a SessionObserver with every new ScreenView            │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ PermissionGate │  │  CameraLease   │  │  ProductLookup         │    │
//! │  │                │  │                │  │                        │    │
//! │  │ One shared     │  │ Camera runs    │  │ CatalogClient: reqwest │    │
//! │  │ host prompt    │  │ while held     │  │ GET ?q=..&limit=10     │    │
//! │  └───────┬────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │          ▼                   ▼                                          │
//! │   PermissionHost       CaptureDevice        (traits the host provides) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`camera`] - Capture device trait and RAII lease
//! - [`catalog`] - Lookup trait, HTTP client and response parsing
//! - [`config`] - Scanner configuration (TOML + environment)
//! - [`controller`] - The per-screen scan controller
//! - [`error`] - Scan layer error types
//! - [`permission`] - Camera permission gate
//!
//! ## Usage
//! ```rust,ignore
//! let config = ScannerConfig::load_or_default(None);
//! let lookup = Arc::new(CatalogClient::from_config(&config)?);
//! let gate = PermissionGate::new(Arc::new(MyPermissionHost));
//!
//! let controller = ScanController::from_config(&config, gate, Arc::new(MyCamera), lookup)
//!     .observer(Arc::new(MyRenderer))
//!     .build();
//!
//! controller.activate().await;
//! controller.handle_scan(ScanEvent::new(Symbology::Ean13, "7791234567890")).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod camera;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod permission;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use camera::{CameraLease, CaptureDevice};
pub use catalog::{parse_search_response, CatalogClient, ProductLookup};
pub use config::{CatalogSettings, DisplaySettings, ScannerConfig, ScannerSettings, ScreenVariant};
pub use controller::{
    ControllerStatus, NoOpObserver, ScanAction, ScanController, ScanControllerBuilder,
    SessionObserver,
};
pub use error::{LookupError, ScanError, ScanResult};
pub use permission::{PermissionGate, PermissionHost};
