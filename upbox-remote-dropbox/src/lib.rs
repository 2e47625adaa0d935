//! Dropbox backend for upbox: implements the core `RemoteStore` contract
//! over the HTTP API, including session uploads for large files.

mod auth;

pub use auth::{authorize_interactively, Credentials};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use upbox_core::{RemoteError, RemoteMetadata, RemoteStore, SessionId, WriteMode};

const API_URL: &str = "https://api.dropboxapi.com/2";
const CONTENT_URL: &str = "https://content.dropboxapi.com/2";

pub struct DropboxRemote {
    http: reqwest::Client,
    tokens: auth::TokenSource,
}

impl DropboxRemote {
    pub fn new(creds: Credentials) -> Self {
        let http = reqwest::Client::new();
        let tokens = auth::TokenSource::new(creds, http.clone());
        Self { http, tokens }
    }

    /// Content-endpoint call: JSON argument in the `Dropbox-API-Arg` header,
    /// raw bytes in the body.
    async fn call_content(
        &self,
        endpoint: &str,
        arg: serde_json::Value,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, RemoteError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .post(format!("{CONTENT_URL}/{endpoint}"))
            .bearer_auth(token)
            .header("Dropbox-API-Arg", escape_non_ascii(&arg.to_string()))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    RemoteError::new(format!("transport failure: {e}"))
}

/// Extract the backend's user-facing message from an error response.
async fn api_error(resp: reqwest::Response) -> RemoteError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error_summary: String,
        user_message: Option<String>,
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.user_message.unwrap_or(e.error_summary))
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });
    RemoteError::new(message)
}

/// HTTP header values must stay ASCII; non-ASCII characters in the JSON
/// argument are sent as \uXXXX escapes (surrogate pairs above the BMP).
fn escape_non_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut units = [0u16; 2];
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units).iter() {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

fn mode_tag(mode: WriteMode) -> &'static str {
    match mode {
        WriteMode::Add => "add",
        WriteMode::Overwrite => "overwrite",
    }
}

/// Epoch seconds to the ISO-8601 form the API expects, already whole-second.
fn format_client_modified(secs: u64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

#[derive(Deserialize)]
struct FileMetadataBody {
    name: String,
    path_display: Option<String>,
    size: Option<u64>,
}

impl FileMetadataBody {
    fn into_metadata(self, requested_path: &str) -> RemoteMetadata {
        RemoteMetadata {
            name: self.name,
            path_display: self.path_display.unwrap_or_else(|| requested_path.to_string()),
            size: self.size.unwrap_or(0),
        }
    }
}

#[async_trait]
impl RemoteStore for DropboxRemote {
    async fn create_folder(&self, path: &str) -> Result<RemoteMetadata, RemoteError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .post(format!("{API_URL}/files/create_folder_v2"))
            .bearer_auth(token)
            .json(&json!({ "path": path, "autorename": false }))
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        #[derive(Deserialize)]
        struct FolderBody {
            metadata: FileMetadataBody,
        }
        let body: FolderBody = resp.json().await.map_err(transport_error)?;
        debug!(path, "remote folder created");
        Ok(body.metadata.into_metadata(path))
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        path: &str,
        mode: WriteMode,
        client_modified: u64,
    ) -> Result<RemoteMetadata, RemoteError> {
        let mut arg = json!({
            "path": path,
            "mode": mode_tag(mode),
            "autorename": false,
            "mute": true,
        });
        if let Some(ts) = format_client_modified(client_modified) {
            arg["client_modified"] = json!(ts);
        }
        let resp = self.call_content("files/upload", arg, data).await?;
        let body: FileMetadataBody = resp.json().await.map_err(transport_error)?;
        Ok(body.into_metadata(path))
    }

    async fn session_start(&self, chunk: Vec<u8>) -> Result<SessionId, RemoteError> {
        let resp = self
            .call_content("files/upload_session/start", json!({ "close": false }), chunk)
            .await?;

        #[derive(Deserialize)]
        struct StartBody {
            session_id: String,
        }
        let body: StartBody = resp.json().await.map_err(transport_error)?;
        Ok(SessionId(body.session_id))
    }

    async fn session_append(
        &self,
        session: &SessionId,
        offset: u64,
        chunk: Vec<u8>,
    ) -> Result<(), RemoteError> {
        let arg = json!({
            "cursor": { "session_id": session.0, "offset": offset },
            "close": false,
        });
        self.call_content("files/upload_session/append_v2", arg, chunk)
            .await?;
        Ok(())
    }

    async fn session_finish(
        &self,
        session: &SessionId,
        offset: u64,
        chunk: Vec<u8>,
        path: &str,
        mode: WriteMode,
    ) -> Result<RemoteMetadata, RemoteError> {
        let arg = json!({
            "cursor": { "session_id": session.0, "offset": offset },
            "commit": {
                "path": path,
                "mode": mode_tag(mode),
                "autorename": false,
                "mute": true,
            },
        });
        let resp = self
            .call_content("files/upload_session/finish", arg, chunk)
            .await?;
        let body: FileMetadataBody = resp.json().await.map_err(transport_error)?;
        Ok(body.into_metadata(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_modified_is_iso8601_whole_seconds() {
        assert_eq!(
            format_client_modified(0).as_deref(),
            Some("1970-01-01T00:00:00Z")
        );
        assert_eq!(
            format_client_modified(1431445838).as_deref(),
            Some("2015-05-12T15:50:38Z")
        );
    }

    #[test]
    fn mode_tags_match_wire_values() {
        assert_eq!(mode_tag(WriteMode::Add), "add");
        assert_eq!(mode_tag(WriteMode::Overwrite), "overwrite");
    }

    #[test]
    fn header_escape_leaves_ascii_untouched() {
        let arg = json!({"path": "/videos/a.mkv"}).to_string();
        assert_eq!(escape_non_ascii(&arg), arg);
    }

    #[test]
    fn header_escape_encodes_non_ascii_as_unicode_escapes() {
        assert_eq!(escape_non_ascii("café"), "caf\\u00e9");
        // Above the BMP: surrogate pair.
        assert_eq!(escape_non_ascii("🎬"), "\\ud83c\\udfac");
    }

    #[test]
    fn error_body_prefers_user_message() {
        let body = r#"{"error_summary":"path/conflict/file/","user_message":"A file already exists."}"#;
        #[derive(Deserialize)]
        struct ErrorBody {
            error_summary: String,
            user_message: Option<String>,
        }
        let parsed: ErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.user_message.unwrap_or(parsed.error_summary),
            "A file already exists."
        );
    }
}
