//! Scripted transport for exercising the poller without a server

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::InitiationError;
use crate::models::{LoginSession, PollOutcome};
use crate::service::LoginTransport;

pub(crate) fn session() -> LoginSession {
    LoginSession {
        base_url: "https://x".to_string(),
        login_url: "https://x/flow/abc".to_string(),
        poll_token: "T1".to_string(),
        poll_endpoint: "https://x/login/v2/poll".to_string(),
    }
}

/// Answers polls from a script, then `Pending` forever
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<PollOutcome>>,
    delay: Duration,
    initiate_error: Option<InitiationError>,
    ticks: Option<mpsc::UnboundedSender<usize>>,
    calls: AtomicUsize,
    initiations: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<PollOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Also report the number of each completed poll
    pub(crate) fn with_ticks(script: Vec<PollOutcome>) -> (Self, mpsc::UnboundedReceiver<usize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut transport = Self::new(script);
        transport.ticks = Some(tx);
        (transport, rx)
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing_initiation(mut self, error: InitiationError) -> Self {
        self.initiate_error = Some(error);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn initiations(&self) -> usize {
        self.initiations.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoginTransport for ScriptedTransport {
    async fn initiate(&self, _base_url: &str) -> Result<LoginSession, InitiationError> {
        self.initiations.fetch_add(1, Ordering::SeqCst);
        match &self.initiate_error {
            Some(error) => Err(error.clone()),
            None => Ok(session()),
        }
    }

    async fn poll(&self, _session: &LoginSession) -> PollOutcome {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PollOutcome::Pending);
        if let Some(ticks) = &self.ticks {
            let _ = ticks.send(call);
        }
        outcome
    }
}
