use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::FailureReason;
use crate::models::{Credential, LoginSession, PollOutcome, PollerConfig, PollerState};
use crate::service::LoginTransport;

type HandoffSlot = Option<oneshot::Sender<Credential>>;

/// Serialises terminal commits against cancellation.
///
/// Anything that ends a session (credential handoff, terminal failure,
/// cancellation) happens while holding the same lock, so once `cancel`
/// returns no credential can be emitted for the session. The gate also owns
/// the state channel's only sender.
#[derive(Debug)]
pub(crate) struct CommitGate {
    token: CancellationToken,
    handoff: Mutex<HandoffSlot>,
    state: watch::Sender<PollerState>,
}

impl CommitGate {
    fn new(handoff: oneshot::Sender<Credential>, state: watch::Sender<PollerState>) -> Self {
        Self {
            token: CancellationToken::new(),
            handoff: Mutex::new(Some(handoff)),
            state,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HandoffSlot> {
        self.handoff.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn cancel(&self) {
        let mut slot = self.lock();
        self.token.cancel();
        // Closes the credential channel so waiters see `None`
        slot.take();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Publish a non-terminal state; never overwrites a terminal one
    fn publish(&self, next: PollerState) {
        let _slot = self.lock();
        self.state.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Move to a terminal state, handing off `credential` if given.
    /// `false` if cancellation got there first.
    fn finish(&self, terminal: PollerState, credential: Option<Credential>) -> bool {
        let mut slot = self.lock();
        if self.token.is_cancelled() {
            return false;
        }
        let handoff = slot.take();
        if let (Some(handoff), Some(credential)) = (handoff, credential) {
            if handoff.send(credential).is_err() {
                log::warn!("LoginFlow: nobody is waiting for the credential");
            }
        }
        self.state.send_replace(terminal);
        true
    }

    /// Complete the session with a credential obtained outside the poll
    /// loop. Stops the loop; `false` if the session already ended.
    pub(crate) fn complete_with(&self, credential: Credential) -> bool {
        let mut slot = self.lock();
        if self.token.is_cancelled() {
            return false;
        }
        let Some(handoff) = slot.take() else {
            return false;
        };
        if handoff.send(credential).is_err() {
            log::warn!("LoginFlow: nobody is waiting for the credential");
        }
        // Terminal state goes out before the loop can wake on the token
        self.state.send_replace(PollerState::Succeeded);
        self.token.cancel();
        true
    }
}

/// Cloneable handle that stops a poller from anywhere (UI callbacks, teardown)
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<CommitGate>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Background poller for one login session.
///
/// Created in `Idle`; `start` consumes it, so a poller can never be restarted
/// or shared. A new session needs a new poller.
pub struct Poller {
    transport: Arc<dyn LoginTransport>,
    session: LoginSession,
    config: PollerConfig,
    gate: Arc<CommitGate>,
    state: watch::Receiver<PollerState>,
    credential: oneshot::Receiver<Credential>,
}

impl Poller {
    pub fn new(
        transport: Arc<dyn LoginTransport>,
        session: LoginSession,
        config: PollerConfig,
    ) -> Self {
        let (state_tx, state) = watch::channel(PollerState::Idle);
        let (credential_tx, credential) = oneshot::channel();

        Self {
            transport,
            session,
            config,
            gate: Arc::new(CommitGate::new(credential_tx, state_tx)),
            state,
            credential,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    /// Spawn the poll loop on the current tokio runtime
    pub fn start(self) -> PollerHandle {
        let Poller {
            transport,
            session,
            config,
            gate,
            state,
            credential,
        } = self;

        let task = tokio::spawn(run_poll_loop(transport, session, config, Arc::clone(&gate)));

        PollerHandle {
            state,
            gate,
            credential: Some(credential),
            task,
        }
    }
}

/// Owner's view of a running poller. Dropping it cancels the poller.
pub struct PollerHandle {
    state: watch::Receiver<PollerState>,
    gate: Arc<CommitGate>,
    credential: Option<oneshot::Receiver<Credential>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    /// Read-only state channel for observers
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.clone()
    }

    pub fn cancel(&self) {
        self.gate.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.gate))
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.is_cancelled()
    }

    pub(crate) fn gate(&self) -> &CommitGate {
        &self.gate
    }

    /// Wait for the credential.
    ///
    /// Resolves once: later calls return `None`, as does a session that ended
    /// without success.
    pub async fn credential(&mut self) -> Option<Credential> {
        let receiver = self.credential.take()?;
        receiver.await.ok()
    }

    /// Wait until the poller reaches a terminal state
    pub async fn finished(&mut self) -> PollerState {
        if let Ok(state) = self.state.wait_for(PollerState::is_terminal).await {
            return state.clone();
        }
        self.state.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.gate.cancel();
    }
}

async fn run_poll_loop(
    transport: Arc<dyn LoginTransport>,
    session: LoginSession,
    config: PollerConfig,
    gate: Arc<CommitGate>,
) {
    let deadline = config.session_lifetime.map(|lifetime| Instant::now() + lifetime);
    let mut attempts: u32 = 0;
    let mut consecutive_errors: u32 = 0;

    gate.publish(PollerState::Polling { attempts });
    log::info!("LoginFlow: polling {} every {:?}", session.poll_endpoint, config.interval);

    loop {
        if gate.is_cancelled() {
            break;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::error!("LoginFlow: session expired after {} attempts", attempts);
            let terminal = PollerState::FailedTerminally(FailureReason::Expired);
            if gate.finish(terminal, None) {
                return;
            }
            break;
        }

        let outcome = tokio::select! {
            biased;
            _ = gate.token.cancelled() => break,
            outcome = transport.poll(&session) => outcome,
        };
        attempts += 1;

        match outcome {
            PollOutcome::Pending => {
                consecutive_errors = 0;
                log::debug!("LoginFlow: not authorized yet (attempt {})", attempts);
            }
            PollOutcome::TransportError(e) => {
                consecutive_errors += 1;
                log::warn!("LoginFlow: poll error (attempt {}): {}", attempts, e);
                if config
                    .max_consecutive_errors
                    .is_some_and(|max| consecutive_errors >= max)
                {
                    log::error!("LoginFlow: giving up after {} errors", consecutive_errors);
                    let reason = FailureReason::TooManyErrors(consecutive_errors);
                    if gate.finish(PollerState::FailedTerminally(reason), None) {
                        return;
                    }
                    break;
                }
            }
            PollOutcome::Authorized(credential) => {
                if gate.finish(PollerState::Succeeded, Some(credential)) {
                    log::info!("LoginFlow: authorized after {} attempts", attempts);
                    return;
                }
                log::debug!("LoginFlow: discarding authorization that arrived after cancel");
                break;
            }
            PollOutcome::Invalidated(reason) => {
                log::error!("LoginFlow: session invalidated: {}", reason);
                let terminal = PollerState::FailedTerminally(FailureReason::Invalidated(reason));
                if gate.finish(terminal, None) {
                    return;
                }
                break;
            }
        }

        if gate.is_cancelled() {
            break;
        }
        gate.publish(PollerState::Polling { attempts });

        tokio::select! {
            biased;
            _ = gate.token.cancelled() => break,
            _ = tokio::time::sleep(config.interval) => {}
        }
    }

    log::info!("LoginFlow: polling stopped after {} attempts", attempts);
    // No-op when the session was completed from outside the loop
    gate.publish(PollerState::Cancelled);
}
