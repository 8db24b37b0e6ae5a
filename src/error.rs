use std::fmt;

use nextcloud_login::InitiationError;

/// Central error type for the Talk TV app
#[derive(Debug)]
pub enum AppError {
    /// Database error (rusqlite)
    Database(rusqlite::Error),
    /// Filesystem error
    Filesystem(std::io::Error),
    /// Invalid configuration file or value
    Config(String),
    /// Invalid user input (e.g. server address)
    Validation(String),
    /// Request to the server failed
    Network(String),
    /// Starting the login flow failed
    Login(InitiationError),
    /// Server reachable but not usable with this app
    Verification(String),
    /// General error
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Filesystem(e) => write!(f, "Filesystem error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Login(e) => write!(f, "Login error: {}", e),
            AppError::Verification(msg) => write!(f, "Verification failed: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Filesystem(e)
    }
}

impl From<InitiationError> for AppError {
    fn from(e: InitiationError) -> Self {
        AppError::Login(e)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// User-facing messages for the UI
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) => "A database error occurred. Please try again.".to_string(),
            AppError::Filesystem(_) => {
                "Error accessing files. Please check app permissions.".to_string()
            }
            AppError::Config(msg) => format!("Invalid configuration: {}", msg),
            AppError::Validation(msg) => msg.clone(),
            AppError::Network(_) | AppError::Login(_) => {
                "Could not reach the server. Please check the address and try again.".to_string()
            }
            AppError::Verification(msg) => msg.clone(),
            AppError::Other(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_errors_share_generic_message() {
        let network = AppError::from(InitiationError::Network("refused".to_string()));
        let status = AppError::from(InitiationError::Status(500));
        assert_eq!(network.user_message(), status.user_message());
        assert!(!network.user_message().contains("refused"));
    }

    #[test]
    fn test_display_includes_cause() {
        let err = AppError::Verification("Talk is not installed".to_string());
        assert_eq!(err.to_string(), "Verification failed: Talk is not installed");
    }
}
