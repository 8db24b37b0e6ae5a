use std::sync::Arc;

use tokio::sync::watch;

use crate::error::InitiationError;
use crate::models::{Credential, LoginSession, PollerConfig, PollerState, PresentationMode};
use crate::poller::{CancelHandle, Poller, PollerHandle};
use crate::presentation::{BackAction, PresentationState};
use crate::redirect::parse_login_redirect;
use crate::service::LoginTransport;

/// One running login: the session, its poller and the visible surface.
///
/// The flow owns the poller; code display and embedded browser are only
/// views onto `login_url`. Dropping the flow cancels polling.
pub struct LoginFlow {
    session: LoginSession,
    poller: PollerHandle,
    presentation: PresentationState,
}

impl LoginFlow {
    /// Initiate a session at `base_url` and start polling it.
    ///
    /// On error nothing is polled; the caller shows the failure and the user
    /// restarts the flow.
    pub async fn begin(
        transport: Arc<dyn LoginTransport>,
        base_url: &str,
        config: PollerConfig,
    ) -> Result<Self, InitiationError> {
        let session = match transport.initiate(base_url).await {
            Ok(session) => session,
            Err(e) => {
                log::error!("LoginFlow: failed to initiate login at {}: {}", base_url, e);
                return Err(e);
            }
        };
        log::info!("LoginFlow: session started, login URL {}", session.login_url);

        let poller = Poller::new(transport, session.clone(), config).start();

        Ok(Self {
            session,
            poller,
            presentation: PresentationState::default(),
        })
    }

    pub fn session(&self) -> &LoginSession {
        &self.session
    }

    /// URL to render as a code or load in the embedded browser
    pub fn login_url(&self) -> &str {
        &self.session.login_url
    }

    pub fn mode(&self) -> PresentationMode {
        self.presentation.mode()
    }

    pub fn switch_mode(&mut self) -> PresentationMode {
        self.presentation.switch()
    }

    /// Handle a back press; leaving the flow cancels the poller
    pub fn back(&mut self, browser_can_go_back: bool) -> BackAction {
        let action = self.presentation.back(browser_can_go_back);
        if action == BackAction::ExitFlow {
            log::info!("LoginFlow: user left the login screen");
            self.poller.cancel();
        }
        action
    }

    pub fn state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.poller.subscribe()
    }

    pub fn cancel(&self) {
        self.poller.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.poller.cancel_handle()
    }

    /// Report a navigation of the embedded browser.
    ///
    /// A login redirect completes the session directly; `true` if it did.
    pub fn browser_navigated(&self, url: &str) -> bool {
        let Some(credential) = parse_login_redirect(url) else {
            return false;
        };
        let completed = self.poller.gate().complete_with(credential);
        if completed {
            log::info!("LoginFlow: login completed in the embedded browser");
        } else {
            log::debug!("LoginFlow: ignoring login redirect for a finished session");
        }
        completed
    }

    /// Wait for the credential; resolves at most once with `Some`
    pub async fn credential(&mut self) -> Option<Credential> {
        self.poller.credential().await
    }

    pub async fn finished(&mut self) -> PollerState {
        self.poller.finished().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollOutcome;
    use crate::testing::ScriptedTransport;
    use std::time::Duration;

    fn config() -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(250),
            max_consecutive_errors: None,
            session_lifetime: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initiation_failure_never_polls() {
        let transport = Arc::new(
            ScriptedTransport::new(Vec::new())
                .failing_initiation(InitiationError::Network("connection refused".to_string())),
        );

        let result = LoginFlow::begin(transport.clone(), "https://x", config()).await;

        assert!(matches!(result, Err(InitiationError::Network(_))));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.initiations(), 1);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_switch_leaves_poller_alone() {
        let (transport, mut ticks) = ScriptedTransport::with_ticks(Vec::new());
        let transport = Arc::new(transport);
        let mut flow = LoginFlow::begin(transport.clone(), "https://x", config())
            .await
            .unwrap();
        let session = flow.session().clone();

        assert_eq!(ticks.recv().await, Some(1));
        let before = flow.state();
        for _ in 0..5 {
            flow.switch_mode();
        }
        assert_eq!(flow.mode(), PresentationMode::EmbeddedBrowser);
        assert_eq!(flow.state(), before);
        assert_eq!(flow.session(), &session);
        assert!(!flow.cancel_handle().is_cancelled());

        // Still a single loop at the same cadence
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(transport.calls(), 5);
        assert_eq!(transport.max_in_flight(), 1);
        assert_eq!(transport.initiations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_from_browser_keeps_polling() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let mut flow = LoginFlow::begin(transport, "https://x", config()).await.unwrap();

        flow.switch_mode();
        assert_eq!(flow.back(true), BackAction::BrowserHistoryBack);
        assert_eq!(flow.back(false), BackAction::ShowCode);
        assert!(!flow.cancel_handle().is_cancelled());

        assert_eq!(flow.back(false), BackAction::ExitFlow);
        assert_eq!(flow.finished().await, PollerState::Cancelled);
        assert_eq!(flow.credential().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_redirect_completes_once() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let mut flow = LoginFlow::begin(transport.clone(), "https://x", config())
            .await
            .unwrap();

        assert!(!flow.browser_navigated("https://x/login/v2/grant"));
        assert!(flow.browser_navigated("nc://login/server:https://x&user:alice&password:pw"));
        assert!(!flow.browser_navigated("nc://login/server:https://x&user:bob&password:pw"));

        assert_eq!(
            flow.credential().await,
            Some(Credential::new("https://x", "alice", "pw"))
        );
        assert_eq!(flow.finished().await, PollerState::Succeeded);
        let calls = transport.calls();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_after_poll_success_is_ignored() {
        let transport = Arc::new(ScriptedTransport::new(vec![PollOutcome::Authorized(
            Credential::new("https://x", "alice", "pw"),
        )]));
        let mut flow = LoginFlow::begin(transport, "https://x", config()).await.unwrap();

        assert_eq!(flow.finished().await, PollerState::Succeeded);
        assert!(!flow.browser_navigated("nc://login/server:https://x&user:bob&password:pw"));
        assert_eq!(flow.credential().await.unwrap().login_name, "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_after_cancel_is_ignored() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let mut flow = LoginFlow::begin(transport, "https://x", config()).await.unwrap();

        flow.cancel();
        assert!(!flow.browser_navigated("nc://login/server:https://x&user:alice&password:pw"));
        assert_eq!(flow.finished().await, PollerState::Cancelled);
        assert_eq!(flow.credential().await, None);
    }
}
