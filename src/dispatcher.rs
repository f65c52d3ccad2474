use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{DispatchConfig, TokenPlacement};
use crate::credential::Credential;
use crate::errors::Error;
use crate::refresher::TokenRefresher;
use crate::request::{PendingRequest, ReplyHandle, RequestDescriptor};
use crate::telemetry::{DrainOutcome, RefreshTelemetry};
use crate::transport::{TransportClient, TransportReply};

/// Credential and pending queue share one serialization point. The lock is
/// only ever held for bookkeeping, never across an `.await`.
struct AuthState {
    credential: Credential,
    pending: VecDeque<PendingRequest>,
}

struct DispatcherInner {
    state: Mutex<AuthState>,
    transport: Arc<dyn TransportClient>,
    refresher: Arc<dyn TokenRefresher>,
    config: DispatchConfig,
}

/// Request layer that attaches the session token to every outgoing call,
/// coalesces concurrent authentication failures into a single refresh, and
/// replays parked requests once the refresh settles.
///
/// Callers only ever observe success, a passthrough transport error, or an
/// authentication-exhaustion error; intermediate 401s and refresh activity
/// are recovered locally.
#[derive(Clone)]
pub struct AuthorizingDispatcher {
    inner: Arc<DispatcherInner>,
}

impl AuthorizingDispatcher {
    pub fn new(
        credential: Credential,
        config: DispatchConfig,
        transport: Arc<dyn TransportClient>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                state: Mutex::new(AuthState {
                    credential,
                    pending: VecDeque::new(),
                }),
                transport,
                refresher,
                config,
            }),
        }
    }

    /// Issues the request and resolves with its final outcome. A missing
    /// token or a 401 parks the request until the shared refresh settles;
    /// the future then resolves with the replayed result.
    pub async fn dispatch(&self, descriptor: RequestDescriptor) -> Result<TransportReply, Error> {
        let (tx, rx) = oneshot::channel();
        let entry = PendingRequest::new(descriptor, tx);
        if let Some((token, entry)) = DispatcherInner::admit(&self.inner, entry) {
            DispatcherInner::issue(
                Arc::downgrade(&self.inner),
                Arc::clone(&self.inner.transport),
                self.inner.config.token_placement.clone(),
                token,
                entry,
            )
            .await;
        }
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::InternalUnavailable),
        }
    }

    /// Like [`dispatch`](Self::dispatch) but returns immediately with a
    /// handle to the eventual outcome. Admission (park vs. issue) happens
    /// before this returns, so calls made in sequence are parked in sequence;
    /// the transport call itself runs on a task that holds the dispatcher
    /// only weakly, so tearing the dispatcher down settles the handle with
    /// [`Error::InternalUnavailable`] instead of leaving it stuck.
    pub fn dispatch_detached(&self, descriptor: RequestDescriptor) -> ReplyHandle {
        let (tx, rx) = oneshot::channel();
        let entry = PendingRequest::new(descriptor, tx);
        if let Some((token, entry)) = DispatcherInner::admit(&self.inner, entry) {
            let inner = Arc::downgrade(&self.inner);
            let transport = Arc::clone(&self.inner.transport);
            let placement = self.inner.config.token_placement.clone();
            tokio::spawn(DispatcherInner::issue(
                inner, transport, placement, token, entry,
            ));
        }
        ReplyHandle::new(rx)
    }

    /// Snapshot of the shared credential, for observability.
    pub fn credential(&self) -> Credential {
        self.inner.state.lock().credential.clone()
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Clears the refresh retry budget so a later request may attempt a
    /// fresh cycle after exhaustion.
    pub fn reset_retries(&self) {
        self.inner.state.lock().credential.reset_retries();
    }
}

impl DispatcherInner {
    /// The dispatch decision, taken under the lock: park the request while a
    /// refresh is outstanding, park it and trigger a refresh when there is no
    /// token yet, or hand back the token to issue with.
    fn admit(inner: &Arc<Self>, entry: PendingRequest) -> Option<(String, PendingRequest)> {
        let mut state = inner.state.lock();
        if state.credential.refresh_in_progress() {
            state.pending.push_back(entry);
            return None;
        }
        match state.credential.token() {
            None => {
                state.pending.push_back(entry);
                Self::ensure_refresh(inner, &mut state);
                None
            }
            Some(token) => Some((token.to_string(), entry)),
        }
    }

    /// Submits an authorized request and settles the entry, except on 401,
    /// which parks it for replay. Holds the dispatcher weakly so an in-flight
    /// completion cannot keep a torn-down session alive.
    async fn issue(
        inner: Weak<Self>,
        transport: Arc<dyn TransportClient>,
        placement: TokenPlacement,
        token: String,
        entry: PendingRequest,
    ) {
        let request = entry.descriptor.authorized(&token, &placement);
        match transport.submit(&request).await {
            Ok(reply) if reply.status == StatusCode::UNAUTHORIZED => {
                debug!(url = %entry.descriptor.url, "401 received; parking request for refresh");
                match inner.upgrade() {
                    Some(strong) => Self::park_unauthorized(&strong, entry),
                    None => entry.fail(Error::InternalUnavailable),
                }
            }
            Ok(reply) if !reply.status.is_success() => {
                entry.fail(Error::Transport(reply.status, reply.text()));
            }
            Ok(reply) => entry.succeed(reply),
            Err(err) => entry.fail(err),
        }
    }

    fn park_unauthorized(inner: &Arc<Self>, entry: PendingRequest) {
        let mut state = inner.state.lock();
        state.pending.push_back(entry);
        Self::ensure_refresh(inner, &mut state);
    }

    /// Single-flight guard: the in-progress flag is checked and set under the
    /// same lock, so concurrent triggers coalesce into one driver task.
    fn ensure_refresh(inner: &Arc<Self>, state: &mut AuthState) {
        if state.credential.refresh_in_progress() {
            return;
        }
        state.credential.set_refresh_in_progress(true);
        tokio::spawn(Self::drive_refresh(Arc::downgrade(inner)));
    }

    /// One refresh cycle: attempt the external refresher until it succeeds
    /// or the retry budget is spent. On success the queue is drained
    /// atomically and replayed in insertion order; on exhaustion every
    /// parked request fails with the underlying cause. Holds the dispatcher
    /// weakly while the refresher runs, so teardown mid-refresh drops the
    /// queue and settles parked callers with `InternalUnavailable`.
    async fn drive_refresh(inner: Weak<Self>) {
        let telemetry = RefreshTelemetry::new("credential-refresh");
        let mut last_error: Option<String> = None;
        loop {
            let (refresher, attempt) = {
                let Some(strong) = inner.upgrade() else { return };
                let mut state = strong.state.lock();
                if state.credential.retry_count() >= strong.config.max_retries {
                    let attempts = state.credential.retry_count();
                    state.credential.set_refresh_in_progress(false);
                    let parked = std::mem::take(&mut state.pending);
                    drop(state);
                    telemetry.emit_exhausted(attempts, parked.len());
                    let cause = last_error
                        .take()
                        .unwrap_or_else(|| "refresh retry budget already spent".to_string());
                    for entry in parked {
                        entry.fail(Error::AuthExhausted(attempts, cause.clone()));
                    }
                    return;
                }
                state.credential.record_attempt();
                let attempt = state.credential.retry_count();
                (Arc::clone(&strong.refresher), attempt)
            };

            telemetry.emit_start(attempt);
            match refresher.refresh().await {
                Ok(token) => {
                    let Some(strong) = inner.upgrade() else { return };
                    let parked = {
                        let mut state = strong.state.lock();
                        state.credential.install_token(token);
                        std::mem::take(&mut state.pending)
                    };
                    telemetry.emit_success(attempt, parked.len());
                    Self::replay(&strong, parked).await;
                    return;
                }
                Err(err) => {
                    telemetry.emit_retry(attempt, &err);
                    last_error = Some(err.to_string());
                }
            }
        }
    }

    /// Re-dispatches drained entries in insertion order. Each re-entry is an
    /// ordinary dispatch: a replayed request that draws another 401 parks
    /// itself again and triggers the next cycle, and the entries behind it
    /// park on the in-progress flag.
    async fn replay(inner: &Arc<Self>, parked: VecDeque<PendingRequest>) {
        let started = Instant::now();
        let total = parked.len();
        let mut reissued = 0usize;
        for entry in parked {
            if let Some((token, entry)) = Self::admit(inner, entry) {
                Self::issue(
                    Arc::downgrade(inner),
                    Arc::clone(&inner.transport),
                    inner.config.token_placement.clone(),
                    token,
                    entry,
                )
                .await;
                reissued += 1;
            }
        }
        DrainOutcome {
            parked: total,
            reissued,
            total_delay: started.elapsed(),
        }
        .log();
    }
}
