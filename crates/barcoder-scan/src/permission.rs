//! # Permission Gate
//!
//! Resolves and tracks camera-access authorization. The scan controller may
//! only start the camera once the gate reports `Granted`.
//!
//! ## Prompt Sharing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller A ── request_access() ──► no prompt pending                    │
//! │                                   │  install watch channel              │
//! │                                   ▼                                     │
//! │                            host.request().await ──────┐                 │
//! │                                                       │                 │
//! │  caller B ── request_access() ──► prompt pending      │                 │
//! │                                   │  clone receiver   │                 │
//! │                                   ▼                   ▼                 │
//! │                            rx.wait_for(..) ◄──── tx.send(outcome)       │
//! │                                                                         │
//! │  Exactly one host prompt; both callers see the same outcome.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prompt errors and dismissals settle to `Denied`. If the prompting caller's
//! future is dropped mid-prompt, joiners settle to the last known state and
//! the next call prompts again.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use barcoder_core::PermissionState;

use crate::error::ScanResult;

// =============================================================================
// Host Seam
// =============================================================================

/// The host platform's privacy subsystem.
#[async_trait]
pub trait PermissionHost: Send + Sync {
    /// Reads the current authorization without prompting.
    async fn query(&self) -> ScanResult<PermissionState>;

    /// Shows the system prompt and returns the user's answer.
    async fn request(&self) -> ScanResult<PermissionState>;
}

// =============================================================================
// Gate
// =============================================================================

type PendingPrompt = watch::Receiver<Option<PermissionState>>;

#[derive(Debug, Default)]
struct GateInner {
    state: PermissionState,
    pending: Option<PendingPrompt>,
}

/// Shared handle on the camera permission.
#[derive(Clone)]
pub struct PermissionGate {
    host: Arc<dyn PermissionHost>,
    inner: Arc<Mutex<GateInner>>,
}

enum Role {
    Prompt(watch::Sender<Option<PermissionState>>),
    Join(PendingPrompt),
}

impl PermissionGate {
    /// Creates a gate in the `Unknown` state.
    pub fn new(host: Arc<dyn PermissionHost>) -> Self {
        PermissionGate {
            host,
            inner: Arc::new(Mutex::new(GateInner::default())),
        }
    }

    /// Last known authorization.
    pub fn current_state(&self) -> PermissionState {
        self.lock().state
    }

    /// True while a host prompt is on screen.
    pub fn is_prompt_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Asks for camera access, sharing any prompt already on screen.
    pub async fn request_access(&self) -> PermissionState {
        let role = {
            let mut inner = self.lock();
            if inner.state.is_granted() {
                return PermissionState::Granted;
            }
            match &inner.pending {
                Some(rx) => Role::Join(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    inner.pending = Some(rx);
                    Role::Prompt(tx)
                }
            }
        };

        match role {
            Role::Join(mut rx) => {
                debug!("Joining pending permission prompt");
                let joined = rx.wait_for(Option::is_some).await.map(|outcome| *outcome);
                match joined {
                    Ok(Some(state)) => state,
                    _ => self.current_state(),
                }
            }
            Role::Prompt(tx) => {
                let mut settle = Settle {
                    inner: &self.inner,
                    outcome: None,
                };

                info!("Requesting camera permission");
                let resolved = match self.host.request().await {
                    Ok(PermissionState::Granted) => PermissionState::Granted,
                    Ok(other) => {
                        debug!(answer = %other, "Permission not granted");
                        PermissionState::Denied
                    }
                    Err(e) => {
                        warn!(error = %e, "Permission prompt failed, treating as denied");
                        PermissionState::Denied
                    }
                };

                settle.outcome = Some(resolved);
                drop(settle);
                tx.send_replace(Some(resolved));

                info!(state = %resolved, "Camera permission resolved");
                resolved
            }
        }
    }

    /// Re-reads the host's authorization without prompting.
    ///
    /// A query error keeps the last known state.
    pub async fn refresh(&self) -> PermissionState {
        match self.host.query().await {
            Ok(state) => {
                let mut inner = self.lock();
                if inner.state != state {
                    info!(from = %inner.state, to = %state, "Camera permission changed");
                }
                inner.state = state;
                state
            }
            Err(e) => {
                warn!(error = %e, "Permission query failed, keeping last known state");
                self.current_state()
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("state", &self.current_state())
            .field("prompt_pending", &self.is_prompt_pending())
            .finish()
    }
}

/// Clears the pending prompt when the prompting future finishes or is dropped.
struct Settle<'a> {
    inner: &'a Mutex<GateInner>,
    outcome: Option<PermissionState>,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = self.outcome {
            inner.state = state;
        }
        inner.pending = None;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ScanError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Host whose prompt blocks until released and answers with a fixed result.
    pub(crate) struct FakeHost {
        pub answer: Mutex<Result<PermissionState, String>>,
        pub current: Mutex<PermissionState>,
        pub release: Notify,
        pub hold: bool,
        pub requests: AtomicUsize,
    }

    impl FakeHost {
        pub fn answering(answer: PermissionState) -> Self {
            FakeHost {
                answer: Mutex::new(Ok(answer)),
                current: Mutex::new(PermissionState::Unknown),
                release: Notify::new(),
                hold: false,
                requests: AtomicUsize::new(0),
            }
        }

        pub fn held(answer: PermissionState) -> Self {
            FakeHost {
                hold: true,
                ..FakeHost::answering(answer)
            }
        }

        pub fn failing() -> Self {
            FakeHost {
                answer: Mutex::new(Err("prompt crashed".into())),
                ..FakeHost::answering(PermissionState::Unknown)
            }
        }

        pub fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PermissionHost for FakeHost {
        async fn query(&self) -> ScanResult<PermissionState> {
            Ok(*self.current.lock().unwrap())
        }

        async fn request(&self) -> ScanResult<PermissionState> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.hold {
                self.release.notified().await;
            }
            self.answer
                .lock()
                .unwrap()
                .clone()
                .map_err(ScanError::PermissionPrompt)
        }
    }

    #[tokio::test]
    async fn test_starts_unknown() {
        let gate = PermissionGate::new(Arc::new(FakeHost::answering(PermissionState::Granted)));
        assert_eq!(gate.current_state(), PermissionState::Unknown);
        assert!(!gate.is_prompt_pending());
    }

    #[tokio::test]
    async fn test_grant_and_no_op_when_granted() {
        let host = Arc::new(FakeHost::answering(PermissionState::Granted));
        let gate = PermissionGate::new(host.clone());

        assert_eq!(gate.request_access().await, PermissionState::Granted);
        assert_eq!(gate.request_access().await, PermissionState::Granted);

        assert_eq!(host.requests(), 1);
        assert_eq!(gate.current_state(), PermissionState::Granted);
    }

    #[tokio::test]
    async fn test_denied_can_be_retried() {
        let host = Arc::new(FakeHost::answering(PermissionState::Denied));
        let gate = PermissionGate::new(host.clone());

        assert_eq!(gate.request_access().await, PermissionState::Denied);

        *host.answer.lock().unwrap() = Ok(PermissionState::Granted);
        assert_eq!(gate.request_access().await, PermissionState::Granted);
        assert_eq!(host.requests(), 2);
    }

    #[tokio::test]
    async fn test_prompt_error_settles_to_denied() {
        let gate = PermissionGate::new(Arc::new(FakeHost::failing()));
        assert_eq!(gate.request_access().await, PermissionState::Denied);
        assert_eq!(gate.current_state(), PermissionState::Denied);
    }

    #[tokio::test]
    async fn test_dismissed_prompt_is_denied() {
        let gate = PermissionGate::new(Arc::new(FakeHost::answering(PermissionState::Unknown)));
        assert_eq!(gate.request_access().await, PermissionState::Denied);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_prompt() {
        let host = Arc::new(FakeHost::held(PermissionState::Granted));
        let gate = PermissionGate::new(host.clone());

        let callers: Vec<_> = (0..5)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.request_access().await })
            })
            .collect();

        while host.requests() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(gate.is_prompt_pending());
        host.release.notify_one();

        for caller in callers {
            assert_eq!(caller.await.unwrap(), PermissionState::Granted);
        }
        assert_eq!(host.requests(), 1);
        assert!(!gate.is_prompt_pending());
    }

    #[tokio::test]
    async fn test_dropped_prompt_releases_joiners() {
        let host = Arc::new(FakeHost::held(PermissionState::Granted));
        let gate = PermissionGate::new(host.clone());

        let prompter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_access().await })
        };
        while host.requests() == 0 {
            tokio::task::yield_now().await;
        }

        let joiner = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_access().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        prompter.abort();
        assert!(prompter.await.is_err());

        assert_eq!(joiner.await.unwrap(), PermissionState::Unknown);
        assert!(!gate.is_prompt_pending());

        host.release.notify_one();
        assert_eq!(gate.request_access().await, PermissionState::Granted);
        assert_eq!(host.requests(), 2);
    }

    #[tokio::test]
    async fn test_refresh_reads_host_state() {
        let host = Arc::new(FakeHost::answering(PermissionState::Denied));
        let gate = PermissionGate::new(host.clone());
        gate.request_access().await;

        *host.current.lock().unwrap() = PermissionState::Granted;
        assert_eq!(gate.refresh().await, PermissionState::Granted);
        assert_eq!(gate.current_state(), PermissionState::Granted);
        assert_eq!(host.requests(), 1);
    }
}
