//! Access-token resolution for the mail API.
//!
//! Lookup order:
//! 1. `$MAILSIFT_ACCESS_TOKEN`
//! 2. The token file (`api.token_file` in the config), refreshed once via
//!    Google's token endpoint if it has expired and client credentials are
//!    available in the environment.
//!
//! Obtaining the first token (the browser consent flow) is not handled here.

use std::path::Path;

use chrono::{DateTime, Utc};
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MailsiftError, Result};

/// Environment variable holding a ready-to-use bearer token.
pub const ACCESS_TOKEN_ENV: &str = "MAILSIFT_ACCESS_TOKEN";
/// OAuth client id used for refreshing.
pub const CLIENT_ID_ENV: &str = "GOOGLE_OAUTH2_CLIENT_GMAIL_TOOLS_ID";
/// OAuth client secret used for refreshing.
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_OAUTH2_CLIENT_GMAIL_TOOLS_SECRET";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Seconds before the recorded expiry at which a token counts as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Contents of the token file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// `true` if the token has a known expiry that is (nearly) past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at - chrono::Duration::seconds(EXPIRY_SKEW_SECS) <= now)
    }
}

/// OAuth client credentials for the refresh grant.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    /// Read the client id and secret from the environment, if both are set.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var(CLIENT_ID_ENV).ok()?;
        let client_secret = std::env::var(CLIENT_SECRET_ENV).ok()?;
        Some(Self {
            client_id,
            client_secret,
        })
    }
}

/// Resolve a bearer token, or fail with remediation instructions.
pub fn resolve_access_token(token_file: &Path) -> Result<String> {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            info!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(token.trim().to_string());
        }
    }

    token_from_file(token_file, ClientCredentials::from_env().as_ref())
}

/// Resolve a token from the token file, refreshing it if needed and possible.
pub fn token_from_file(
    token_file: &Path,
    client: Option<&ClientCredentials>,
) -> Result<String> {
    let Some(stored) = load_token(token_file)? else {
        return Err(missing_credential(token_file));
    };

    if !stored.is_expired(Utc::now()) {
        return Ok(stored.access_token);
    }

    let (Some(refresh_token), Some(client)) = (stored.refresh_token.as_deref(), client) else {
        warn!(path = %token_file.display(), "Stored access token has expired");
        return Err(MailsiftError::MissingCredential {
            hint: format!(
                "The token in '{}' has expired. Set {} and {} so it can be refreshed, \
                 or replace the file with a fresh token.",
                token_file.display(),
                CLIENT_ID_ENV,
                CLIENT_SECRET_ENV
            ),
        });
    };

    let updated = refresh(client, refresh_token)?;
    save_token(token_file, &updated)?;
    info!(path = %token_file.display(), "Refreshed access token");
    Ok(updated.access_token)
}

/// Load the token file. A missing file is `Ok(None)`.
pub fn load_token(path: &Path) -> Result<Option<StoredToken>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MailsiftError::io(path, e)),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| MailsiftError::InvalidToken {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write the token file, creating its parent directory.
pub fn save_token(path: &Path, token: &StoredToken) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MailsiftError::io(parent, e))?;
    }
    let contents =
        serde_json::to_string_pretty(token).map_err(|e| MailsiftError::InvalidToken {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    std::fs::write(path, contents).map_err(|e| MailsiftError::io(path, e))
}

/// Build the OAuth client for Google's endpoints.
fn build_client(creds: &ClientCredentials) -> Result<BasicClient> {
    let auth_url = AuthUrl::new(AUTH_URL.to_string())
        .map_err(|e| MailsiftError::TokenRefresh(format!("invalid auth url: {e}")))?;
    let token_url = TokenUrl::new(TOKEN_URL.to_string())
        .map_err(|e| MailsiftError::TokenRefresh(format!("invalid token url: {e}")))?;

    Ok(BasicClient::new(
        ClientId::new(creds.client_id.clone()),
        Some(ClientSecret::new(creds.client_secret.clone())),
        auth_url,
        Some(token_url),
    )
    .set_auth_type(oauth2::AuthType::RequestBody))
}

/// Exchange a refresh token for a new access token.
///
/// Google usually does not rotate the refresh token; the old one is kept
/// unless the response carries a new one.
fn refresh(creds: &ClientCredentials, refresh_token: &str) -> Result<StoredToken> {
    let client = build_client(creds)?;
    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .request(http_client)
        .map_err(|e| MailsiftError::TokenRefresh(e.to_string()))?;

    Ok(StoredToken {
        access_token: response.access_token().secret().to_string(),
        refresh_token: Some(
            response
                .refresh_token()
                .map(|t| t.secret().to_string())
                .unwrap_or_else(|| refresh_token.to_string()),
        ),
        expires_at: response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d),
    })
}

fn missing_credential(token_file: &Path) -> MailsiftError {
    MailsiftError::MissingCredential {
        hint: format!(
            "Set {} to an OAuth2 access token with the gmail.readonly scope, \
             or write {{\"access_token\": \"...\", \"refresh_token\": \"...\"}} to '{}'.",
            ACCESS_TOKEN_ENV,
            token_file.display()
        ),
    }
}
