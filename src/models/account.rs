use chrono::NaiveDateTime;
use nextcloud_login::Credential;

/// Result of a successful account verification, ready to be stored
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedAccount {
    pub server_url: String,
    pub user_id: String,
    pub login_name: String,
    pub display_name: String,
    pub app_password: String,
    pub server_version: Option<String>,
    pub talk_version: Option<String>,
}

impl VerifiedAccount {
    pub fn credential(&self) -> Credential {
        Credential::new(
            self.server_url.clone(),
            self.login_name.clone(),
            self.app_password.clone(),
        )
    }
}

impl std::fmt::Debug for VerifiedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedAccount")
            .field("server_url", &self.server_url)
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("server_version", &self.server_version)
            .field("talk_version", &self.talk_version)
            .finish_non_exhaustive()
    }
}

/// Stored account
#[derive(Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub uuid: String,
    pub server_url: String,
    pub user_id: String,
    pub login_name: String,
    pub display_name: String,
    pub app_password: String,
    pub server_version: Option<String>,
    pub talk_version: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// `Alice (cloud.example.com)`
    pub fn label(&self) -> String {
        let host = self
            .server_url
            .split("://")
            .nth(1)
            .unwrap_or(&self.server_url);
        format!("{} ({})", self.display_name, host)
    }

    pub fn added_on(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("server_url", &self.server_url)
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}
