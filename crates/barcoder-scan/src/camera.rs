//! # Camera Lease
//!
//! Scoped ownership of the capture device. The camera runs exactly while a
//! [`CameraLease`] is alive; dropping the lease stops it.
//!
//! ```text
//!   Idle ──────────────── lease held, decoder delivering events
//!   Searching / Results / Empty / Failed / Decoded ── no lease
//!   "scan again" ──────── lease re-acquired
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ScanResult;

/// The host's camera with its attached barcode decoder.
pub trait CaptureDevice: Send + Sync {
    /// Starts preview and decoding.
    fn start(&self) -> ScanResult<()>;

    /// Stops preview and decoding. Must be safe to call when already stopped.
    fn stop(&self);
}

/// A running camera. Stops the device on drop.
pub struct CameraLease {
    device: Arc<dyn CaptureDevice>,
}

impl CameraLease {
    /// Starts the device and wraps it in a lease.
    pub fn acquire(device: Arc<dyn CaptureDevice>) -> ScanResult<Self> {
        if let Err(e) = device.start() {
            warn!(error = %e, "Camera failed to start");
            return Err(e);
        }
        debug!("Camera started");
        Ok(CameraLease { device })
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.device.stop();
        debug!("Camera stopped");
    }
}

impl std::fmt::Debug for CameraLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CameraLease")
    }
}
