use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{InitiationError, PollTransportError};
use crate::models::{ClientConfig, LoginFlowInit, LoginFlowResult, LoginSession, PollOutcome};

/// The two requests the login flow needs from a server.
///
/// `NextcloudLoginClient` talks HTTP; tests substitute scripted transports.
#[async_trait]
pub trait LoginTransport: Send + Sync {
    /// Start a new login session. No retries.
    async fn initiate(&self, base_url: &str) -> Result<LoginSession, InitiationError>;

    /// Ask once whether `session` has been authorized.
    async fn poll(&self, session: &LoginSession) -> PollOutcome;
}

/// Nextcloud Login Flow v2 over HTTP
#[derive(Debug, Clone)]
pub struct NextcloudLoginClient {
    client: reqwest::Client,
}

impl NextcloudLoginClient {
    /// Create a client; the underlying connection pool is shared by clones
    pub fn new(config: &ClientConfig) -> Result<Self, InitiationError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| InitiationError::Network(format!("Client build failed: {}", e)))?;

        Ok(Self { client })
    }

    /// Login-session endpoint for a server base URL
    pub fn login_endpoint(base_url: &str) -> String {
        format!("{}/index.php/login/v2", base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LoginTransport for NextcloudLoginClient {
    async fn initiate(&self, base_url: &str) -> Result<LoginSession, InitiationError> {
        let url = Self::login_endpoint(base_url);
        log::debug!("Initiating login flow at {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| InitiationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InitiationError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| InitiationError::Network(e.to_string()))?;
        let init: LoginFlowInit = serde_json::from_slice(&body)
            .map_err(|e| InitiationError::Decode(e.to_string()))?;

        if init.login.trim().is_empty() {
            return Err(InitiationError::Decode("empty login URL".to_string()));
        }
        if init.poll.token.is_empty() || init.poll.endpoint.is_empty() {
            return Err(InitiationError::Decode(
                "missing poll token or endpoint".to_string(),
            ));
        }

        Ok(LoginSession::from_init(base_url, init))
    }

    async fn poll(&self, session: &LoginSession) -> PollOutcome {
        let response = match self
            .client
            .post(&session.poll_endpoint)
            .form(&[("token", session.poll_token.as_str())])
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return PollOutcome::TransportError(PollTransportError::Network(e.to_string())),
        };

        match response.status() {
            StatusCode::OK => {
                // The server forgets the flow once it has answered 200, so a
                // body we cannot read means the session is gone.
                let body = match response.bytes().await {
                    Ok(body) => body,
                    Err(e) => return PollOutcome::Invalidated(e.to_string()),
                };
                match serde_json::from_slice::<LoginFlowResult>(&body) {
                    Ok(result) => PollOutcome::Authorized(result.into()),
                    Err(e) => PollOutcome::Invalidated(format!("Failed to parse result: {}", e)),
                }
            }
            StatusCode::NOT_FOUND => PollOutcome::Pending,
            status => PollOutcome::TransportError(PollTransportError::Status(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_endpoint_trims_trailing_slash() {
        assert_eq!(
            NextcloudLoginClient::login_endpoint("https://cloud.example.com/"),
            "https://cloud.example.com/index.php/login/v2"
        );
        assert_eq!(
            NextcloudLoginClient::login_endpoint("https://cloud.example.com/nextcloud"),
            "https://cloud.example.com/nextcloud/index.php/login/v2"
        );
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(NextcloudLoginClient::new(&ClientConfig::default()).is_ok());
    }
}
