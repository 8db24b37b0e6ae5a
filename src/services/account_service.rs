use crate::config::AppConfig;
use crate::database;
use crate::error::AppError;
use crate::models::{Account, VerifiedAccount};
use nextcloud_login::Credential;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// `/status.php`
#[derive(Debug, Deserialize)]
struct ServerStatus {
    installed: bool,
    maintenance: bool,
    #[serde(default)]
    versionstring: Option<String>,
}

/// OCS envelope: `{ "ocs": { "meta": ..., "data": ... } }`
#[derive(Debug, Deserialize)]
struct OcsResponse<T> {
    ocs: OcsBody<T>,
}

#[derive(Debug, Deserialize)]
struct OcsBody<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CapabilitiesData {
    capabilities: Capabilities,
}

#[derive(Debug, Deserialize)]
struct Capabilities {
    spreed: Option<TalkCapability>,
}

#[derive(Debug, Deserialize)]
struct TalkCapability {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    id: String,
    #[serde(alias = "display-name")]
    displayname: Option<String>,
}

fn http_client(config: &AppConfig) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(10))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| AppError::Network(format!("Client build failed: {}", e)))
}

async fn ocs_get<T: DeserializeOwned>(
    client: &reqwest::Client,
    credential: &Credential,
    path: &str,
) -> Result<T, AppError> {
    let url = format!("{}{}", credential.server.trim_end_matches('/'), path);
    let response = client
        .get(&url)
        .basic_auth(&credential.login_name, Some(&credential.app_password))
        .header("OCS-APIRequest", "true")
        .header("Accept", "application/json")
        .query(&[("format", "json")])
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(AppError::Verification(
            "The server did not accept the new app password".to_string(),
        ));
    }
    if !status.is_success() {
        return Err(AppError::Network(format!("{} returned status {}", path, status)));
    }

    let body: OcsResponse<T> = response
        .json()
        .await
        .map_err(|e| AppError::Network(format!("Failed to parse {}: {}", path, e)))?;
    Ok(body.ocs.data)
}

/// Check that the server behind `credential` can be used and whose account it is
pub async fn verify_credential(
    config: &AppConfig,
    credential: &Credential,
) -> Result<VerifiedAccount, AppError> {
    let client = http_client(config)?;
    let server = credential.server.trim_end_matches('/');

    log::info!("Verifying account {} on {}", credential.login_name, server);

    let status: ServerStatus = client
        .get(format!("{}/status.php", server))
        .header("Accept", "application/json")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .map_err(|e| AppError::Network(format!("Failed to parse status.php: {}", e)))?;
    if !status.installed {
        return Err(AppError::Verification(
            "The server is not fully installed".to_string(),
        ));
    }
    if status.maintenance {
        return Err(AppError::Verification(
            "The server is in maintenance mode. Please try again later.".to_string(),
        ));
    }

    let capabilities: CapabilitiesData =
        ocs_get(&client, credential, "/ocs/v2.php/cloud/capabilities").await?;
    let talk = capabilities.capabilities.spreed.ok_or_else(|| {
        AppError::Verification("Nextcloud Talk is not installed on this server".to_string())
    })?;

    let profile: UserProfile = ocs_get(&client, credential, "/ocs/v2.php/cloud/user").await?;
    log::info!("Account {} verified (Talk {:?})", profile.id, talk.version);

    Ok(VerifiedAccount {
        server_url: server.to_string(),
        display_name: profile
            .displayname
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| profile.id.clone()),
        user_id: profile.id,
        login_name: credential.login_name.clone(),
        app_password: credential.app_password.clone(),
        server_version: status.versionstring,
        talk_version: talk.version,
    })
}

/// Verify the credential and store the account
pub async fn verify_and_store(
    config: &AppConfig,
    credential: &Credential,
) -> Result<Account, AppError> {
    let verified = verify_credential(config, credential).await?;
    let conn = database::init_database()?;
    let id = save_account(&conn, &verified)?;
    find_account_by_id(&conn, id)?
        .ok_or_else(|| AppError::Other(format!("Account {} vanished after saving", id)))
}

const ACCOUNT_COLUMNS: &str = "id, uuid, server_url, user_id, login_name, display_name, \
     app_password, server_version, talk_version, created_at, updated_at";

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        uuid: row.get(1)?,
        server_url: row.get(2)?,
        user_id: row.get(3)?,
        login_name: row.get(4)?,
        display_name: row.get(5)?,
        app_password: row.get(6)?,
        server_version: row.get(7)?,
        talk_version: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Saves a verified account; logging in again to the same account replaces
/// its app password
pub fn save_account(conn: &Connection, account: &VerifiedAccount) -> Result<i64, AppError> {
    if let Some(existing) = find_account(conn, &account.server_url, &account.user_id)? {
        conn.execute(
            "UPDATE accounts
             SET login_name = ?1, display_name = ?2, app_password = ?3, server_version = ?4, talk_version = ?5
             WHERE id = ?6",
            (
                &account.login_name,
                &account.display_name,
                &account.app_password,
                &account.server_version,
                &account.talk_version,
                existing.id,
            ),
        )?;
        log::info!("Updated account {}", existing.id);
        Ok(existing.id)
    } else {
        conn.execute(
            "INSERT INTO accounts (uuid, server_url, user_id, login_name, display_name, app_password, server_version, talk_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            (
                uuid::Uuid::new_v4().to_string(),
                &account.server_url,
                &account.user_id,
                &account.login_name,
                &account.display_name,
                &account.app_password,
                &account.server_version,
                &account.talk_version,
            ),
        )?;
        let id = conn.last_insert_rowid();
        log::info!("Stored new account {}", id);
        Ok(id)
    }
}

pub fn find_account(
    conn: &Connection,
    server_url: &str,
    user_id: &str,
) -> Result<Option<Account>, AppError> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE server_url = ?1 AND user_id = ?2",
        ACCOUNT_COLUMNS
    );
    Ok(conn
        .query_row(&sql, (server_url, user_id), account_from_row)
        .optional()?)
}

pub fn find_account_by_id(conn: &Connection, id: i64) -> Result<Option<Account>, AppError> {
    let sql = format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS);
    Ok(conn.query_row(&sql, [id], account_from_row).optional()?)
}

/// All stored accounts, most recently used first
pub fn load_accounts(conn: &Connection) -> Result<Vec<Account>, AppError> {
    let sql = format!(
        "SELECT {} FROM accounts ORDER BY updated_at DESC, id DESC",
        ACCOUNT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}

pub fn delete_account(conn: &Connection, id: i64) -> Result<(), AppError> {
    let deleted = conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(AppError::Other(format!("Account {} not found", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verified(user_id: &str, app_password: &str) -> VerifiedAccount {
        VerifiedAccount {
            server_url: "https://cloud.example.com".to_string(),
            user_id: user_id.to_string(),
            login_name: user_id.to_string(),
            display_name: user_id.to_uppercase(),
            app_password: app_password.to_string(),
            server_version: Some("30.0.1".to_string()),
            talk_version: Some("20.0.0".to_string()),
        }
    }

    #[test]
    fn test_save_and_load_accounts() {
        let conn = database::init_test_database();

        let alice = save_account(&conn, &verified("alice", "pw1")).unwrap();
        let bob = save_account(&conn, &verified("bob", "pw2")).unwrap();
        assert_ne!(alice, bob);

        let accounts = load_accounts(&conn).unwrap();
        assert_eq!(accounts.len(), 2);

        let loaded = find_account(&conn, "https://cloud.example.com", "alice")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.display_name, "ALICE");
        assert_eq!(loaded.app_password, "pw1");
    }

    #[test]
    fn test_save_same_account_replaces_password() {
        let conn = database::init_test_database();

        let first = save_account(&conn, &verified("alice", "old")).unwrap();
        let second = save_account(&conn, &verified("alice", "new")).unwrap();
        assert_eq!(first, second);

        let accounts = load_accounts(&conn).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].app_password, "new");
    }

    #[test]
    fn test_delete_account() {
        let conn = database::init_test_database();
        let id = save_account(&conn, &verified("alice", "pw")).unwrap();

        delete_account(&conn, id).unwrap();
        assert!(find_account_by_id(&conn, id).unwrap().is_none());
        assert!(delete_account(&conn, id).is_err());
    }

    async fn mount_server(server: &MockServer, maintenance: bool, talk: bool) {
        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "installed": true,
                "maintenance": maintenance,
                "needsDbUpgrade": false,
                "version": "30.0.1.2",
                "versionstring": "30.0.1",
                "productname": "Nextcloud"
            })))
            .mount(server)
            .await;

        let capabilities = if talk {
            json!({ "spreed": { "version": "20.0.0", "features": ["audio", "video"] } })
        } else {
            json!({ "files": {} })
        };
        Mock::given(method("GET"))
            .and(path("/ocs/v2.php/cloud/capabilities"))
            .and(header("OCS-APIRequest", "true"))
            .and(query_param("format", "json"))
            .and(basic_auth("alice", "pw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ocs": { "meta": { "status": "ok" }, "data": { "capabilities": capabilities } }
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/ocs/v2.php/cloud/user"))
            .and(basic_auth("alice", "pw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ocs": { "meta": { "status": "ok" }, "data": { "id": "alice", "displayname": "Alice Liddell" } }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_verify_credential() {
        let server = MockServer::start().await;
        mount_server(&server, false, true).await;

        let credential = Credential::new(format!("{}/", server.uri()), "alice", "pw");
        let account = verify_credential(&AppConfig::default(), &credential)
            .await
            .unwrap();

        assert_eq!(account.server_url, server.uri());
        assert_eq!(account.user_id, "alice");
        assert_eq!(account.display_name, "Alice Liddell");
        assert_eq!(account.server_version.as_deref(), Some("30.0.1"));
        assert_eq!(account.talk_version.as_deref(), Some("20.0.0"));
        assert_eq!(account.credential(), Credential::new(server.uri(), "alice", "pw"));
    }

    #[tokio::test]
    async fn test_verify_rejects_maintenance() {
        let server = MockServer::start().await;
        mount_server(&server, true, true).await;

        let credential = Credential::new(server.uri(), "alice", "pw");
        let result = verify_credential(&AppConfig::default(), &credential).await;
        assert!(matches!(result, Err(AppError::Verification(_))));
    }

    #[tokio::test]
    async fn test_verify_requires_talk() {
        let server = MockServer::start().await;
        mount_server(&server, false, false).await;

        let credential = Credential::new(server.uri(), "alice", "pw");
        let result = verify_credential(&AppConfig::default(), &credential).await;
        assert!(matches!(result, Err(AppError::Verification(msg)) if msg.contains("Talk")));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_password() {
        let server = MockServer::start().await;
        mount_server(&server, false, true).await;
        Mock::given(method("GET"))
            .and(path("/ocs/v2.php/cloud/capabilities"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let credential = Credential::new(server.uri(), "alice", "wrong");
        let result = verify_credential(&AppConfig::default(), &credential).await;
        assert!(matches!(result, Err(AppError::Verification(_))));
    }
}
