//! # Scan Session
//!
//! The pure scan-to-results state machine. No camera, no network, no clock:
//! the async layer feeds it events and lookup outcomes and renders whatever
//! [`SessionState`] it ends up in.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            unsupported symbology / blank payload (dropped)              │
//! │                       ┌──────────┐                                      │
//! │                       ▼          │                                      │
//! │                  ┌─────────┐ ────┘                                      │
//! │     ┌──────────► │  Idle   │ ───── raw mode ─────► ┌───────────┐        │
//! │     │            └────┬────┘                       │  Decoded  │        │
//! │     │                 │ lookup mode                └─────┬─────┘        │
//! │     │                 ▼                                  │              │
//! │     │          ┌────────────┐                            │              │
//! │     │          │ Searching  │  (camera stopped)          │              │
//! │     │          └──┬───┬───┬─┘                            │              │
//! │     │      ≥1 hit │   │ 0 │ error                        │              │
//! │     │             ▼   ▼   ▼                              │              │
//! │     │     Results   Empty   Failed                       │              │
//! │     │        │        │       │                          │              │
//! │     └────────┴────────┴───────┴──── scan again ──────────┘              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Generations
//! Every accepted scan, every "scan again" and every reset bumps the session
//! generation. A lookup is issued with a [`LookupTicket`] carrying the
//! generation it was started in; [`ScanSession::resolve`] applies the outcome
//! only if the session is still `Searching` in that same generation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{FailureKind, PermissionState, Product, ScanEvent, Symbology, SymbologySet};
use crate::validation::validate_payload;

/// Monotonic scan cycle counter.
pub type Generation = u64;

// =============================================================================
// Session State
// =============================================================================

/// The controller's single source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export)]
pub enum SessionState {
    /// Camera active, accepting scan events.
    #[default]
    Idle,

    /// Catalog lookup in flight.
    Searching { payload: String },

    /// Lookup returned at least one listing, in catalog order.
    Results {
        payload: String,
        products: Vec<Product>,
    },

    /// Lookup succeeded with zero matches.
    Empty { payload: String },

    /// Lookup or decode failed.
    Failed {
        payload: String,
        #[serde(rename = "errorKind")]
        error_kind: FailureKind,
    },

    /// Raw payload surfaced without a lookup.
    Decoded {
        payload: String,
        symbology: Symbology,
    },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_searching(&self) -> bool {
        matches!(self, SessionState::Searching { .. })
    }

    /// True for the states the user leaves with "scan again".
    pub fn is_presenting(&self) -> bool {
        matches!(
            self,
            SessionState::Results { .. }
                | SessionState::Empty { .. }
                | SessionState::Failed { .. }
                | SessionState::Decoded { .. }
        )
    }

    /// The payload this state is about, if any.
    pub fn payload(&self) -> Option<&str> {
        match self {
            SessionState::Idle => None,
            SessionState::Searching { payload }
            | SessionState::Results { payload, .. }
            | SessionState::Empty { payload }
            | SessionState::Failed { payload, .. }
            | SessionState::Decoded { payload, .. } => Some(payload),
        }
    }

    /// Listings shown by the result grid (empty outside `Results`).
    pub fn products(&self) -> &[Product] {
        match self {
            SessionState::Results { products, .. } => products,
            _ => &[],
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Searching { .. } => "searching",
            SessionState::Results { .. } => "results",
            SessionState::Empty { .. } => "empty",
            SessionState::Failed { .. } => "failed",
            SessionState::Decoded { .. } => "decoded",
        }
    }
}

// =============================================================================
// Scan Policy
// =============================================================================

/// What happens to a scan that passes the symbology filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Search the catalog with the payload.
    CatalogLookup,
    /// Show the decoded payload as-is.
    PresentRaw,
}

/// Per-screen configuration of the shared state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPolicy {
    pub accepted: SymbologySet,
    pub mode: ScanMode,
}

impl ScanPolicy {
    pub const fn new(accepted: SymbologySet, mode: ScanMode) -> Self {
        ScanPolicy { accepted, mode }
    }

    /// Retail codes, searched in the catalog.
    pub const fn catalog_lookup() -> Self {
        ScanPolicy::new(SymbologySet::retail(), ScanMode::CatalogLookup)
    }

    /// Retail codes and QR, shown raw.
    pub const fn present_raw() -> Self {
        ScanPolicy::new(SymbologySet::retail_and_qr(), ScanMode::PresentRaw)
    }
}

// =============================================================================
// Decisions
// =============================================================================

/// Proof that the session entered `Searching` for a given generation.
///
/// Only [`ScanSession::on_scan`] creates tickets, so a resolution can never
/// target a search that was not started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    generation: Generation,
    payload: String,
}

impl LookupTicket {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The search term to send to the catalog.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Why a scan event changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The camera should already be frozen; a late decode callback slipped in.
    NotIdle,
    /// Symbology outside the screen's accepted set.
    UnsupportedSymbology(Symbology),
    /// Blank or oversized payload.
    InvalidPayload,
}

/// Outcome of feeding a scan event to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDecision {
    /// Session is now `Searching`; the caller must run the lookup.
    Lookup(LookupTicket),
    /// Session is now `Decoded`.
    Presented,
    /// Nothing changed.
    Ignored(IgnoreReason),
}

/// Outcome of [`ScanSession::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The session moved to Results, Empty or Failed.
    Applied,
    /// The ticket belongs to an abandoned cycle; the outcome was discarded.
    Stale,
}

// =============================================================================
// Scan Session
// =============================================================================

/// The scan-to-results state machine for one screen instance.
///
/// ## Invariants
/// - At most one lookup per generation; events are ignored outside `Idle`
/// - `Results.products` is only ever replaced, never edited
/// - A resolution applies only to the generation that issued it
#[derive(Debug, Clone)]
pub struct ScanSession {
    policy: ScanPolicy,
    state: SessionState,
    generation: Generation,
}

impl ScanSession {
    pub fn new(policy: ScanPolicy) -> Self {
        ScanSession {
            policy,
            state: SessionState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Feeds one decoded barcode to the session.
    pub fn on_scan(&mut self, event: &ScanEvent) -> ScanDecision {
        if !self.state.is_idle() {
            return ScanDecision::Ignored(IgnoreReason::NotIdle);
        }
        if !self.policy.accepted.contains(event.symbology) {
            return ScanDecision::Ignored(IgnoreReason::UnsupportedSymbology(event.symbology));
        }
        if validate_payload(&event.payload).is_err() {
            return ScanDecision::Ignored(IgnoreReason::InvalidPayload);
        }

        self.generation += 1;
        let payload = event.payload.clone();

        match self.policy.mode {
            ScanMode::CatalogLookup => {
                self.state = SessionState::Searching {
                    payload: payload.clone(),
                };
                ScanDecision::Lookup(LookupTicket {
                    generation: self.generation,
                    payload,
                })
            }
            ScanMode::PresentRaw => {
                self.state = SessionState::Decoded {
                    payload,
                    symbology: event.symbology,
                };
                ScanDecision::Presented
            }
        }
    }

    /// Applies a lookup outcome issued under `ticket`.
    ///
    /// An empty product list is `Empty`, never `Failed`.
    pub fn resolve(
        &mut self,
        ticket: &LookupTicket,
        outcome: Result<Vec<Product>, FailureKind>,
    ) -> Resolution {
        let current = match &self.state {
            SessionState::Searching { payload } if ticket.generation == self.generation => {
                payload.clone()
            }
            _ => return Resolution::Stale,
        };

        self.state = match outcome {
            Ok(products) if products.is_empty() => SessionState::Empty { payload: current },
            Ok(products) => SessionState::Results {
                payload: current,
                products,
            },
            Err(error_kind) => SessionState::Failed {
                payload: current,
                error_kind,
            },
        };
        Resolution::Applied
    }

    /// Moves an idle session to `Failed` for a non-lookup failure (decoder
    /// error, camera that would not start). Returns false outside `Idle`.
    pub fn fail(&mut self, error_kind: FailureKind) -> bool {
        if !self.state.is_idle() {
            return false;
        }
        self.generation += 1;
        self.state = SessionState::Failed {
            payload: String::new(),
            error_kind,
        };
        true
    }

    /// "Scan again": back to `Idle` from any presentation state.
    ///
    /// Returns false (and changes nothing) from `Idle` or `Searching`.
    pub fn scan_again(&mut self) -> bool {
        if !self.state.is_presenting() {
            return false;
        }
        self.reset();
        true
    }

    /// Unconditional return to `Idle`, abandoning any in-flight lookup.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::Idle;
    }
}

// =============================================================================
// Screen View
// =============================================================================

/// What the scanner screen renders, derived from permission and session.
///
/// The session is only reachable through `Scanning`, so "scanning without
/// permission" cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "screen", rename_all = "snake_case")]
#[ts(export)]
pub enum ScreenView {
    /// Waiting for the host to resolve the permission prompt.
    RequestingPermission,
    /// Access refused; shows the "Grant Permission" button.
    PermissionDenied,
    /// Camera or results.
    Scanning { session: SessionState },
}

impl ScreenView {
    pub fn derive(permission: PermissionState, session: &SessionState) -> Self {
        match permission {
            PermissionState::Unknown => ScreenView::RequestingPermission,
            PermissionState::Denied => ScreenView::PermissionDenied,
            PermissionState::Granted => ScreenView::Scanning {
                session: session.clone(),
            },
        }
    }

    /// The session state, when the screen is showing one.
    pub fn session(&self) -> Option<&SessionState> {
        match self {
            ScreenView::Scanning { session } => Some(session),
            _ => None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Money, Price};

    fn product(id: &str) -> Product {
        Product::try_new(
            id,
            format!("Listing {}", id),
            Price::new(Money::from_cents(1999), "ARS"),
            format!("http://img/{}.jpg", id),
            format!("http://item/{}", id),
        )
        .unwrap()
    }

    fn ean(payload: &str) -> ScanEvent {
        ScanEvent::new(Symbology::Ean13, payload)
    }

    fn start_lookup(session: &mut ScanSession, payload: &str) -> LookupTicket {
        match session.on_scan(&ean(payload)) {
            ScanDecision::Lookup(ticket) => ticket,
            other => panic!("expected lookup, got {:?}", other),
        }
    }

    #[test]
    fn test_accepted_scan_starts_search() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let ticket = start_lookup(&mut session, "7791234567890");

        assert_eq!(ticket.payload(), "7791234567890");
        assert_eq!(ticket.generation(), session.generation());
        assert_eq!(
            session.state(),
            &SessionState::Searching {
                payload: "7791234567890".into()
            }
        );
    }

    #[test]
    fn test_events_while_not_idle_are_ignored() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let ticket = start_lookup(&mut session, "7791234567890");
        let generation = session.generation();

        for payload in ["1111111111111", "2222222222222", "7791234567890"] {
            assert_eq!(
                session.on_scan(&ean(payload)),
                ScanDecision::Ignored(IgnoreReason::NotIdle)
            );
        }
        assert_eq!(session.generation(), generation);

        session.resolve(&ticket, Ok(vec![product("A")]));
        assert_eq!(
            session.on_scan(&ean("3333333333333")),
            ScanDecision::Ignored(IgnoreReason::NotIdle)
        );
    }

    #[test]
    fn test_unsupported_symbology_leaves_state_unchanged() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        for symbology in Symbology::ALL.into_iter().filter(|s| !s.is_retail()) {
            let decision = session.on_scan(&ScanEvent::new(symbology, "anything"));
            assert_eq!(
                decision,
                ScanDecision::Ignored(IgnoreReason::UnsupportedSymbology(symbology))
            );
            assert_eq!(session.state(), &SessionState::Idle);
            assert_eq!(session.generation(), 0);
        }
    }

    #[test]
    fn test_blank_payload_is_dropped() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        assert_eq!(
            session.on_scan(&ean("   ")),
            ScanDecision::Ignored(IgnoreReason::InvalidPayload)
        );
        assert!(session.state().is_idle());
    }

    #[test]
    fn test_results_keep_catalog_order() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let ticket = start_lookup(&mut session, "7791234567890");

        let resolution = session.resolve(&ticket, Ok(vec![product("B"), product("A")]));

        assert_eq!(resolution, Resolution::Applied);
        let ids: Vec<&str> = session.state().products().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_empty_results_are_empty_not_failed() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let ticket = start_lookup(&mut session, "0000000000000");

        session.resolve(&ticket, Ok(Vec::new()));

        assert_eq!(
            session.state(),
            &SessionState::Empty {
                payload: "0000000000000".into()
            }
        );
    }

    #[test]
    fn test_lookup_failure() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let ticket = start_lookup(&mut session, "7791234567890");

        session.resolve(&ticket, Err(FailureKind::Timeout));

        assert_eq!(
            session.state(),
            &SessionState::Failed {
                payload: "7791234567890".into(),
                error_kind: FailureKind::Timeout,
            }
        );
    }

    #[test]
    fn test_scan_again_from_every_presentation_state() {
        let outcomes: Vec<Result<Vec<Product>, FailureKind>> = vec![
            Ok(vec![product("A")]),
            Ok(Vec::new()),
            Err(FailureKind::NetworkError),
        ];

        for outcome in outcomes {
            let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
            let ticket = start_lookup(&mut session, "7791234567890");
            session.resolve(&ticket, outcome);

            assert!(session.scan_again());
            assert_eq!(session.state(), &SessionState::Idle);
            assert!(session.state().payload().is_none());
            assert!(session.state().products().is_empty());
        }

        let mut raw = ScanSession::new(ScanPolicy::present_raw());
        raw.on_scan(&ScanEvent::new(Symbology::Qr, "WIFI:S:home;;"));
        assert!(raw.scan_again());
        assert_eq!(raw.state(), &SessionState::Idle);
    }

    #[test]
    fn test_scan_again_is_refused_while_searching() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        start_lookup(&mut session, "7791234567890");

        assert!(!session.scan_again());
        assert!(session.state().is_searching());
        assert!(!ScanSession::new(ScanPolicy::catalog_lookup()).scan_again());
    }

    #[test]
    fn test_stale_resolution_is_discarded() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let old = start_lookup(&mut session, "1111111111111");

        // Screen unmounted and remounted while the first search was in flight.
        session.reset();
        let fresh = start_lookup(&mut session, "2222222222222");

        assert_eq!(session.resolve(&old, Ok(vec![product("OLD")])), Resolution::Stale);
        assert_eq!(
            session.state(),
            &SessionState::Searching {
                payload: "2222222222222".into()
            }
        );

        assert_eq!(session.resolve(&fresh, Ok(vec![product("NEW")])), Resolution::Applied);
        assert_eq!(session.state().products()[0].id, "NEW");
    }

    #[test]
    fn test_stale_resolution_after_rescan_of_same_payload() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let old = start_lookup(&mut session, "7791234567890");
        session.reset();
        let _fresh = start_lookup(&mut session, "7791234567890");

        assert_eq!(session.resolve(&old, Err(FailureKind::Timeout)), Resolution::Stale);
        assert!(session.state().is_searching());
    }

    #[test]
    fn test_second_resolution_of_same_ticket_is_stale() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        let ticket = start_lookup(&mut session, "7791234567890");

        assert_eq!(session.resolve(&ticket, Ok(Vec::new())), Resolution::Applied);
        assert_eq!(
            session.resolve(&ticket, Ok(vec![product("A")])),
            Resolution::Stale
        );
        assert!(matches!(session.state(), SessionState::Empty { .. }));
    }

    #[test]
    fn test_raw_mode_presents_payload_without_lookup() {
        let mut session = ScanSession::new(ScanPolicy::present_raw());
        let decision = session.on_scan(&ScanEvent::new(Symbology::Qr, "https://example.com"));

        assert_eq!(decision, ScanDecision::Presented);
        assert_eq!(
            session.state(),
            &SessionState::Decoded {
                payload: "https://example.com".into(),
                symbology: Symbology::Qr,
            }
        );
        assert_eq!(
            session.on_scan(&ean("7791234567890")),
            ScanDecision::Ignored(IgnoreReason::NotIdle)
        );
    }

    #[test]
    fn test_fail_only_from_idle() {
        let mut session = ScanSession::new(ScanPolicy::catalog_lookup());
        assert!(session.fail(FailureKind::DecodeFailed));
        assert!(matches!(
            session.state(),
            SessionState::Failed {
                error_kind: FailureKind::DecodeFailed,
                ..
            }
        ));
        assert!(!session.fail(FailureKind::CameraUnavailable));
    }

    #[test]
    fn test_screen_view_derivation() {
        let state = SessionState::Empty {
            payload: "0000000000000".into(),
        };
        assert_eq!(
            ScreenView::derive(PermissionState::Unknown, &state),
            ScreenView::RequestingPermission
        );
        assert_eq!(
            ScreenView::derive(PermissionState::Denied, &state),
            ScreenView::PermissionDenied
        );
        assert_eq!(
            ScreenView::derive(PermissionState::Granted, &state).session(),
            Some(&state)
        );
    }

    #[test]
    fn test_session_state_wire_format() {
        let state = SessionState::Failed {
            payload: "123".into(),
            error_kind: FailureKind::MalformedResponse,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["errorKind"], "malformed_response");

        let view = ScreenView::Scanning {
            session: SessionState::Idle,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["screen"], "scanning");
        assert_eq!(json["session"]["status"], "idle");
    }
}
