use thiserror::Error;

/// Starting a login session failed. Surfaced once; the user restarts the flow.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InitiationError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server returned status: {0}")]
    Status(u16),
    #[error("Invalid login flow response: {0}")]
    Decode(String),
}

/// A single poll request failed. Treated as "still pending".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollTransportError {
    #[error("Poll request failed: {0}")]
    Network(String),
    #[error("Unexpected status code: {0}")]
    Status(u16),
}

/// Why a poller stopped without a credential
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    #[error("Login session was invalidated: {0}")]
    Invalidated(String),
    #[error("Gave up after {0} consecutive poll errors")]
    TooManyErrors(u32),
    #[error("Login session expired")]
    Expired,
}
