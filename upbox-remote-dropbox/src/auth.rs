//! OAuth2 glue: refresh-token exchange and the one-time interactive
//! authorization flow. The refresh token is never persisted here; the
//! operator keeps it for subsequent runs.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::info;
use upbox_core::RemoteError;

const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";
const AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";

/// App credentials plus the long-lived refresh token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    4 * 60 * 60
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Exchanges the refresh token for short-lived access tokens and caches
/// them until shortly before expiry.
pub(crate) struct TokenSource {
    creds: Credentials,
    http: reqwest::Client,
    cached: tokio::sync::Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(creds: Credentials, http: reqwest::Client) -> Self {
        Self {
            creds,
            http,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, RemoteError> {
        let mut cached = self.cached.lock().await;
        if let Some(tok) = cached.as_ref() {
            if Instant::now() < tok.expires_at {
                return Ok(tok.access_token.clone());
            }
        }

        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &self.creds.refresh_token),
                ("client_id", &self.creds.app_key),
                ("client_secret", &self.creds.app_secret),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::new(format!("token refresh failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::new(format!(
                "token refresh rejected ({status}): {body}"
            )));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::new(format!("token refresh failed: {e}")))?;

        // Refresh one minute early so in-flight requests never race expiry.
        let ttl = Duration::from_secs(token.expires_in.saturating_sub(60).max(1));
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + ttl,
        });
        Ok(access_token)
    }
}

/// One-time authorization exchange: prints the consent URL, reads the code
/// from stdin and trades it for a refresh token.
pub async fn authorize_interactively(app_key: &str, app_secret: &str) -> Result<String> {
    let url =
        format!("{AUTHORIZE_URL}?client_id={app_key}&token_access_type=offline&response_type=code");
    info!("1. Go to: {url}");
    info!("2. Click \"Allow\" (you might have to log in first).");
    info!("3. Copy the authorization code.");
    print!("Enter the authorization code here: ");
    std::io::stdout().flush()?;

    let code = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok::<_, std::io::Error>(line.trim().to_string())
    })
    .await??;
    if code.is_empty() {
        return Err(anyhow!("no authorization code entered"));
    }

    let resp = reqwest::Client::new()
        .post(TOKEN_URL)
        .form(&[
            ("code", code.as_str()),
            ("grant_type", "authorization_code"),
            ("client_id", app_key),
            ("client_secret", app_secret),
        ])
        .send()
        .await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("authorization exchange failed ({status}): {body}"));
    }

    #[derive(Deserialize)]
    struct AuthResponse {
        refresh_token: String,
    }
    Ok(resp.json::<AuthResponse>().await?.refresh_token)
}
