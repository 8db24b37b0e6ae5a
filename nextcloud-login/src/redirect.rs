//! Legacy login redirect, `nc://login/server:<url>&user:<name>&password:<pw>`.
//!
//! The login page navigates here when it is driven from inside the app, so
//! the embedded browser can complete a session without waiting for a poll.

use url::form_urlencoded;

use crate::models::Credential;

const REDIRECT_PREFIX: &str = "nc://login/";

/// Extract the credential from a login redirect, if `url` is one
pub fn parse_login_redirect(url: &str) -> Option<Credential> {
    let params = url.strip_prefix(REDIRECT_PREFIX)?;

    let mut server = None;
    let mut user = None;
    let mut password = None;
    for param in params.split('&') {
        if let Some(value) = param.strip_prefix("server:") {
            server = Some(decode(value));
        } else if let Some(value) = param.strip_prefix("user:") {
            user = Some(decode(value));
        } else if let Some(value) = param.strip_prefix("password:") {
            password = Some(decode(value));
        }
    }

    let (server, user, password) = (server?, user?, password?);
    if server.is_empty() || user.is_empty() || password.is_empty() {
        return None;
    }
    Some(Credential::new(server, user, password))
}

fn decode(value: &str) -> String {
    let escaped = value.replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}
