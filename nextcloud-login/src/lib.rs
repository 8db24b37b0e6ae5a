//! # Nextcloud Login
//!
//! Nextcloud Login Flow v2 for devices that cannot complete a browser login
//! themselves, such as TVs.
//!
//! This crate provides:
//! - Session initiation against `/index.php/login/v2`
//! - A background poller with explicit cancellation
//! - Presentation state for code display vs. embedded browser
//! - Exactly-once credential handoff
//!
//! ## Separation of Concerns
//!
//! This crate focuses solely on obtaining an app password. It does **not**:
//! - Render the login URL (QR code or web view are up to the application)
//! - Verify or store the account (handled by the application)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nextcloud_login::{ClientConfig, LoginFlow, NextcloudLoginClient, PollerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(NextcloudLoginClient::new(&ClientConfig::default())?);
//! let mut flow = LoginFlow::begin(client, "https://cloud.example.com", PollerConfig::default()).await?;
//!
//! println!("Scan to log in: {}", flow.login_url());
//! if let Some(credential) = flow.credential().await {
//!     println!("Logged in as {}", credential.login_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod flow;
pub mod models;
pub mod poller;
pub mod presentation;
pub mod redirect;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::{FailureReason, InitiationError, PollTransportError};
pub use flow::LoginFlow;
pub use models::{
    ClientConfig, Credential, LoginFlowInit, LoginFlowResult, LoginSession, PollEndpoint,
    PollOutcome, PollerConfig, PollerState, PresentationMode,
};
pub use poller::{CancelHandle, Poller, PollerHandle};
pub use presentation::{BackAction, PresentationState};
pub use redirect::parse_login_redirect;
pub use service::{LoginTransport, NextcloudLoginClient};
