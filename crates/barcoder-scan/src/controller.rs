//! # Scan Controller
//!
//! Drives one scanner screen: capture → decode → lookup → present → reset.
//!
//! ## Controller Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScanController                                   │
//! │                                                                         │
//! │   host events                     ┌─────────────────────────────────┐   │
//! │   ───────────                     │ Mutex<CoreState>                │   │
//! │   activate()      ──────────────► │  ScanSession (barcoder-core)    │   │
//! │   handle_scan()   ──────────────► │  Option<CameraLease>            │   │
//! │   scan_again()    ──────────────► │  auto-prompt flag, timestamps   │   │
//! │   deactivate()    ──────────────► └──────────────┬──────────────────┘   │
//! │                                                  │ LookupTicket         │
//! │   ┌────────────────┐                             ▼ (lock released)      │
//! │   │ PermissionGate │               timeout(ProductLookup::lookup)       │
//! │   └────────────────┘                             │                      │
//! │                                                  ▼                      │
//! │                                   session.resolve(ticket, outcome)      │
//! │                                   Applied ─► observer.on_view(..)       │
//! │                                   Stale   ─► discarded                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session mutex is a `std::sync::Mutex` and is never held across an
//! `.await`; the lookup runs with the lock released and is matched back to
//! the session by its generation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use barcoder_core::{
    FailureKind, Generation, Resolution, ScanDecision, ScanEvent, ScanMode, ScanPolicy,
    ScanSession, ScreenView, SessionState, SymbologySet,
};

use crate::camera::{CameraLease, CaptureDevice};
use crate::catalog::ProductLookup;
use crate::config::{ScannerConfig, ScreenVariant};
use crate::permission::PermissionGate;

// =============================================================================
// Scan Action
// =============================================================================

/// What the controller does with an accepted scan.
#[derive(Clone)]
pub enum ScanAction {
    /// Search the catalog.
    Lookup(Arc<dyn ProductLookup>),
    /// Show the payload as decoded.
    PresentRaw,
}

impl ScanAction {
    fn mode(&self) -> ScanMode {
        match self {
            ScanAction::Lookup(_) => ScanMode::CatalogLookup,
            ScanAction::PresentRaw => ScanMode::PresentRaw,
        }
    }

    fn default_accepted(&self) -> SymbologySet {
        match self {
            ScanAction::Lookup(_) => SymbologySet::retail(),
            ScanAction::PresentRaw => SymbologySet::retail_and_qr(),
        }
    }
}

impl std::fmt::Debug for ScanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanAction::Lookup(_) => f.write_str("Lookup"),
            ScanAction::PresentRaw => f.write_str("PresentRaw"),
        }
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Render hook, called with the new view after every transition.
pub trait SessionObserver: Send + Sync {
    fn on_view(&self, view: &ScreenView);
}

/// Observer for hosts that poll [`ScanController::view`] instead.
pub struct NoOpObserver;

impl SessionObserver for NoOpObserver {
    fn on_view(&self, _view: &ScreenView) {}
}

// =============================================================================
// Status
// =============================================================================

/// Diagnostic snapshot of one controller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub instance_id: Uuid,
    pub view: ScreenView,
    pub generation: Generation,
    pub lookups_issued: u64,
    pub camera_active: bool,
    pub permission_prompt_pending: bool,
    pub last_transition_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Controller
// =============================================================================

struct CoreState {
    session: ScanSession,
    lease: Option<CameraLease>,
    auto_requested: bool,
    last_transition_at: Option<DateTime<Utc>>,
}

impl CoreState {
    fn touch(&mut self) {
        self.last_transition_at = Some(Utc::now());
    }
}

struct ControllerInner {
    instance_id: Uuid,
    gate: PermissionGate,
    camera: Arc<dyn CaptureDevice>,
    action: ScanAction,
    lookup_timeout: Duration,
    observer: Arc<dyn SessionObserver>,
    lookups_issued: AtomicU64,
    core: Mutex<CoreState>,
}

/// Clonable handle on one scanner screen.
#[derive(Clone)]
pub struct ScanController {
    inner: Arc<ControllerInner>,
}

/// What `handle_scan` decided while holding the lock.
enum ScanStep {
    Unchanged,
    Presented,
    Lookup(barcoder_core::LookupTicket),
}

impl ScanController {
    /// Starts building a controller around a permission gate and a camera.
    pub fn builder(
        gate: PermissionGate,
        camera: Arc<dyn CaptureDevice>,
        action: ScanAction,
    ) -> ScanControllerBuilder {
        ScanControllerBuilder {
            gate,
            camera,
            accepted: action.default_accepted(),
            action,
            lookup_timeout: Duration::from_secs(10),
            observer: None,
        }
    }

    /// Stock controller for a screen variant.
    pub fn for_variant(
        variant: ScreenVariant,
        gate: PermissionGate,
        camera: Arc<dyn CaptureDevice>,
        lookup: Arc<dyn ProductLookup>,
    ) -> ScanControllerBuilder {
        let policy = variant.policy();
        let action = match policy.mode {
            ScanMode::CatalogLookup => ScanAction::Lookup(lookup),
            ScanMode::PresentRaw => ScanAction::PresentRaw,
        };
        Self::builder(gate, camera, action).accepted(policy.accepted)
    }

    /// Controller for the configured variant and lookup timeout.
    pub fn from_config(
        config: &ScannerConfig,
        gate: PermissionGate,
        camera: Arc<dyn CaptureDevice>,
        lookup: Arc<dyn ProductLookup>,
    ) -> ScanControllerBuilder {
        Self::for_variant(config.variant(), gate, camera, lookup)
            .lookup_timeout(config.lookup_timeout())
    }

    // =========================================================================
    // Screen Lifecycle
    // =========================================================================

    /// Screen mount.
    ///
    /// Prompts for permission once per mount when not yet granted, then
    /// starts the camera if access was granted.
    pub async fn activate(&self) -> ScreenView {
        let prompt = {
            let mut core = self.lock();
            let granted = self.inner.gate.current_state().is_granted();
            let prompt = !granted && !core.auto_requested;
            if prompt {
                core.auto_requested = true;
            }
            prompt
        };

        info!(instance = %self.inner.instance_id, "Scanner screen activated");

        if prompt {
            self.publish();
            self.inner.gate.request_access().await;
        }

        self.start_camera_if_ready();
        self.publish()
    }

    /// Manual "grant permission" action.
    pub async fn grant_permission(&self) -> ScreenView {
        let state = self.inner.gate.request_access().await;
        debug!(state = %state, "Manual permission request finished");
        self.start_camera_if_ready();
        self.publish()
    }

    /// Re-reads the system permission (e.g. app back in foreground).
    ///
    /// Stops the camera if access was revoked, starts it if newly granted.
    pub async fn refresh_permission(&self) -> ScreenView {
        let state = self.inner.gate.refresh().await;
        if state.is_granted() {
            self.start_camera_if_ready();
        } else {
            let mut core = self.lock();
            if core.lease.take().is_some() {
                warn!(state = %state, "Camera permission revoked, camera stopped");
                core.touch();
            }
        }
        self.publish()
    }

    /// Screen unmount: camera released, in-flight lookup abandoned.
    pub fn deactivate(&self) -> ScreenView {
        {
            let mut core = self.lock();
            core.lease = None;
            core.session.reset();
            core.auto_requested = false;
            core.touch();
            info!(
                generation = core.session.generation(),
                "Scanner screen deactivated"
            );
        }
        self.publish()
    }

    // =========================================================================
    // Scan Cycle
    // =========================================================================

    /// Feeds one decoded barcode to the screen.
    ///
    /// Returns once the resulting state is settled; for a catalog scan that
    /// includes the lookup. Events arriving while the camera is not active
    /// are dropped.
    pub async fn handle_scan(&self, event: ScanEvent) -> ScreenView {
        let step = {
            let mut core = self.lock();
            if !self.inner.gate.current_state().is_granted() || core.lease.is_none() {
                debug!(symbology = %event.symbology, "Camera not active, dropping scan event");
                ScanStep::Unchanged
            } else {
                match core.session.on_scan(&event) {
                    ScanDecision::Ignored(reason) => {
                        debug!(symbology = %event.symbology, ?reason, "Scan event ignored");
                        ScanStep::Unchanged
                    }
                    ScanDecision::Presented => {
                        core.lease = None;
                        core.touch();
                        info!(
                            symbology = %event.symbology,
                            generation = core.session.generation(),
                            "Raw payload decoded"
                        );
                        ScanStep::Presented
                    }
                    ScanDecision::Lookup(ticket) => {
                        core.lease = None;
                        core.touch();
                        info!(
                            payload = ticket.payload(),
                            symbology = %event.symbology,
                            generation = ticket.generation(),
                            "Searching catalog"
                        );
                        ScanStep::Lookup(ticket)
                    }
                }
            }
        };

        match step {
            ScanStep::Unchanged => self.view(),
            ScanStep::Presented => self.publish(),
            ScanStep::Lookup(ticket) => {
                self.publish();
                self.run_lookup(ticket).await
            }
        }
    }

    async fn run_lookup(&self, ticket: barcoder_core::LookupTicket) -> ScreenView {
        let lookup = match &self.inner.action {
            ScanAction::Lookup(lookup) => lookup.clone(),
            ScanAction::PresentRaw => {
                error!("Lookup requested by a raw-payload screen");
                self.lock().session.reset();
                return self.publish();
            }
        };

        self.inner.lookups_issued.fetch_add(1, Ordering::Relaxed);
        let payload = ticket.payload();

        let outcome =
            match tokio::time::timeout(self.inner.lookup_timeout, lookup.lookup(payload)).await {
                Ok(Ok(products)) => Ok(products),
                Ok(Err(e)) => {
                    warn!(payload, kind = e.kind().code(), error = %e, "Catalog lookup failed");
                    Err(e.kind())
                }
                Err(_) => {
                    warn!(
                        payload,
                        kind = FailureKind::Timeout.code(),
                        timeout_ms = self.inner.lookup_timeout.as_millis() as u64,
                        "Catalog lookup timed out"
                    );
                    Err(FailureKind::Timeout)
                }
            };

        let resolution = {
            let mut core = self.lock();
            let resolution = core.session.resolve(&ticket, outcome);
            if resolution == Resolution::Applied {
                core.touch();
            }
            resolution
        };

        match resolution {
            Resolution::Applied => {
                let view = self.publish();
                if let Some(state) = view.session() {
                    info!(
                        payload,
                        generation = ticket.generation(),
                        state = state.label(),
                        count = state.products().len(),
                        "Lookup resolved"
                    );
                }
                view
            }
            Resolution::Stale => {
                warn!(
                    payload,
                    generation = ticket.generation(),
                    "Discarding stale lookup result"
                );
                self.view()
            }
        }
    }

    /// "Scan again": back to the live camera from any presentation state.
    pub fn scan_again(&self) -> ScreenView {
        {
            let mut core = self.lock();
            if !core.session.scan_again() {
                debug!(state = core.session.state().label(), "Nothing to scan again from");
                drop(core);
                return self.view();
            }
            core.touch();
            debug!(generation = core.session.generation(), "Scanning again");
            self.acquire_camera(&mut core);
        }
        self.publish()
    }

    /// The decoder reported a frame it could not read.
    pub fn report_decode_error(&self, reason: &str) -> ScreenView {
        {
            let mut core = self.lock();
            if core.lease.is_none() || !core.session.fail(FailureKind::DecodeFailed) {
                debug!(reason, "Decode error outside an active scan, ignoring");
                drop(core);
                return self.view();
            }
            core.lease = None;
            core.touch();
            warn!(reason, kind = FailureKind::DecodeFailed.code(), "Decode failed");
        }
        self.publish()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// What the screen should render now.
    pub fn view(&self) -> ScreenView {
        let core = self.lock();
        ScreenView::derive(self.inner.gate.current_state(), core.session.state())
    }

    pub fn session_state(&self) -> SessionState {
        self.lock().session.state().clone()
    }

    pub fn policy(&self) -> ScanPolicy {
        *self.lock().session.policy()
    }

    pub fn permission(&self) -> &PermissionGate {
        &self.inner.gate
    }

    pub fn status(&self) -> ControllerStatus {
        let core = self.lock();
        ControllerStatus {
            instance_id: self.inner.instance_id,
            view: ScreenView::derive(self.inner.gate.current_state(), core.session.state()),
            generation: core.session.generation(),
            lookups_issued: self.inner.lookups_issued.load(Ordering::Relaxed),
            camera_active: core.lease.is_some(),
            permission_prompt_pending: self.inner.gate.is_prompt_pending(),
            last_transition_at: core.last_transition_at,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn start_camera_if_ready(&self) {
        if !self.inner.gate.current_state().is_granted() {
            return;
        }
        let mut core = self.lock();
        if core.lease.is_none() && core.session.state().is_idle() {
            self.acquire_camera(&mut core);
        }
    }

    /// Starts the camera for an idle session; a failure lands in `Failed`.
    fn acquire_camera(&self, core: &mut CoreState) {
        if !self.inner.gate.current_state().is_granted() {
            return;
        }
        match CameraLease::acquire(self.inner.camera.clone()) {
            Ok(lease) => core.lease = Some(lease),
            Err(e) => {
                warn!(error = %e, kind = FailureKind::CameraUnavailable.code(), "Camera unavailable");
                if core.session.fail(FailureKind::CameraUnavailable) {
                    core.touch();
                }
            }
        }
    }

    /// Computes the view and hands it to the observer, outside the lock.
    fn publish(&self) -> ScreenView {
        let view = self.view();
        self.inner.observer.on_view(&view);
        view
    }

    fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("instance_id", &self.inner.instance_id)
            .field("action", &self.inner.action)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ScanController`].
pub struct ScanControllerBuilder {
    gate: PermissionGate,
    camera: Arc<dyn CaptureDevice>,
    action: ScanAction,
    accepted: SymbologySet,
    lookup_timeout: Duration,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl ScanControllerBuilder {
    /// Overrides the accepted symbologies.
    pub fn accepted(mut self, accepted: SymbologySet) -> Self {
        self.accepted = accepted;
        self
    }

    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> ScanController {
        let policy = ScanPolicy::new(self.accepted, self.action.mode());
        let instance_id = Uuid::new_v4();
        debug!(
            instance = %instance_id,
            mode = ?policy.mode,
            accepted = policy.accepted.len(),
            "Scan controller created"
        );
        if policy.accepted.is_empty() {
            warn!(instance = %instance_id, "No symbologies accepted, every scan will be dropped");
        }

        ScanController {
            inner: Arc::new(ControllerInner {
                instance_id,
                gate: self.gate,
                camera: self.camera,
                action: self.action,
                lookup_timeout: self.lookup_timeout,
                observer: self.observer.unwrap_or_else(|| Arc::new(NoOpObserver)),
                lookups_issued: AtomicU64::new(0),
                core: Mutex::new(CoreState {
                    session: ScanSession::new(policy),
                    lease: None,
                    auto_requested: false,
                    last_transition_at: None,
                }),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
