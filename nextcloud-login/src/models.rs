use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FailureReason, PollTransportError};

/// Response from the Nextcloud login flow initialization endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginFlowInit {
    pub poll: PollEndpoint,
    pub login: String,
}

/// Polling endpoint information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollEndpoint {
    pub token: String,
    pub endpoint: String,
}

/// Response from successful login polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginFlowResult {
    pub server: String,
    pub login_name: String,
    pub app_password: String,
}

/// One attempt to authenticate against a server.
///
/// The poll token is single-use and belongs to exactly one login URL. A
/// session is owned by the poller that polls it; presentation layers only
/// read `login_url`.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub base_url: String,
    pub login_url: String,
    pub poll_token: String,
    pub poll_endpoint: String,
}

impl LoginSession {
    pub(crate) fn from_init(base_url: &str, init: LoginFlowInit) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            login_url: init.login,
            poll_token: init.poll.token,
            poll_endpoint: init.poll.endpoint,
        }
    }
}

impl fmt::Debug for LoginSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSession")
            .field("base_url", &self.base_url)
            .field("login_url", &self.login_url)
            .field("poll_token", &"<redacted>")
            .field("poll_endpoint", &self.poll_endpoint)
            .finish()
    }
}

/// Long-lived app credential issued after a successful login
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub server: String,
    pub login_name: String,
    pub app_password: String,
}

impl Credential {
    pub fn new(
        server: impl Into<String>,
        login_name: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            login_name: login_name.into(),
            app_password: app_password.into(),
        }
    }
}

impl From<LoginFlowResult> for Credential {
    fn from(result: LoginFlowResult) -> Self {
        Self {
            server: result.server,
            login_name: result.login_name,
            app_password: result.app_password,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("server", &self.server)
            .field("login_name", &self.login_name)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

/// Result of a single poll request
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Not authorized yet
    Pending,
    /// The user granted access on the other device
    Authorized(Credential),
    /// The request failed; retried on the next tick
    TransportError(PollTransportError),
    /// The server consumed the session without handing out a credential
    Invalidated(String),
}

/// State of the background poller, published to observers
#[derive(Debug, Clone, PartialEq)]
pub enum PollerState {
    /// Created but not started
    Idle,
    /// Waiting for the user; `attempts` poll requests completed so far
    Polling { attempts: u32 },
    /// Credential handed off
    Succeeded,
    /// Stopped on request
    Cancelled,
    /// Gave up
    FailedTerminally(FailureReason),
}

impl PollerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollerState::Succeeded | PollerState::Cancelled | PollerState::FailedTerminally(_)
        )
    }
}

/// Which surface the login screen currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationMode {
    /// Scannable code for a second device
    #[default]
    CodeDisplay,
    /// Login page loaded in place
    EmbeddedBrowser,
}

/// HTTP settings for the login client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("NextcloudLogin/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Timing and give-up settings for the poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Wait between the end of one poll and the start of the next
    pub interval: Duration,
    /// Consecutive transport errors tolerated before giving up; `None` retries forever
    pub max_consecutive_errors: Option<u32>,
    /// Server-side lifetime of a login flow; `None` polls until cancelled
    pub session_lifetime: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            max_consecutive_errors: Some(120),
            // Nextcloud drops pending login flows after 20 minutes
            session_lifetime: Some(Duration::from_secs(20 * 60)),
        }
    }
}
