//! Gmail REST API v1 store.
//!
//! Talks to `https://gmail.googleapis.com/gmail/v1/users/me` with a bearer
//! token over blocking `reqwest`.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{MailsiftError, Result};
use crate::model::part::{Header, PartBody, RawMessage, RawPart};
use crate::parser::payload::decode_base64url;

use super::MessageStore;

/// Default API root for the authenticated user's mailbox.
pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Largest page the list endpoint accepts.
const MAX_PAGE_SIZE: u32 = 500;

// ── Wire types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<ListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    payload: Option<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<WireHeader>,
    #[serde(default)]
    body: WireBody,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct WireHeader {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBody {
    attachment_id: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    raw: String,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    #[serde(default)]
    data: String,
}

impl From<WirePart> for RawPart {
    fn from(part: WirePart) -> Self {
        let headers = part
            .headers
            .into_iter()
            .map(|h| Header::new(h.name, h.value))
            .collect();

        if !part.parts.is_empty() {
            let children = part.parts.into_iter().map(RawPart::from).collect();
            return RawPart::container(part.mime_type, headers, children);
        }

        let body = match (part.body.data, part.body.attachment_id) {
            (Some(data), _) => PartBody::Inline(data),
            (None, Some(attachment_id)) => PartBody::Attachment(attachment_id),
            (None, None) => PartBody::Empty,
        };
        RawPart::leaf(part.mime_type, headers, body)
    }
}

impl From<WireMessage> for RawMessage {
    fn from(msg: WireMessage) -> Self {
        let payload = msg
            .payload
            .map(RawPart::from)
            .unwrap_or_else(|| RawPart::leaf("", Vec::new(), PartBody::Empty));
        Self {
            id: msg.id,
            thread_id: msg.thread_id,
            snippet: msg.snippet,
            payload,
        }
    }
}

// ── Client ──────────────────────────────────────────────────────

/// Blocking client for the Gmail v1 REST API.
pub struct GmailStore {
    base_url: String,
    access_token: String,
    client: Client,
}

impl GmailStore {
    /// Create a store against [`DEFAULT_BASE_URL`].
    pub fn new(access_token: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(access_token, DEFAULT_BASE_URL, timeout)
    }

    /// Create a store pointing at a custom API root.
    pub fn with_base_url(access_token: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mailsift/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MailsiftError::remote("failed to build HTTP client", e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            client,
        })
    }

    /// Return the configured API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Mail API request");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .map_err(|e| MailsiftError::remote(format!("{what} request failed"), e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MailsiftError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(MailsiftError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .map_err(|e| MailsiftError::remote(format!("failed to parse {what} response"), e))
    }
}

impl MessageStore for GmailStore {
    fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;

        while (ids.len() as u32) < max_results {
            let page_size = (max_results - ids.len() as u32).min(MAX_PAGE_SIZE);
            let mut params = vec![("maxResults", page_size.to_string())];
            if !query.is_empty() {
                params.push(("q", query.to_string()));
            }
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: ListResponse = self.get_json("/messages", &params, "list messages")?;
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        ids.truncate(max_results as usize);
        Ok(ids)
    }

    fn get_message(&self, id: &str) -> Result<RawMessage> {
        let wire: WireMessage = self.get_json(
            &format!("/messages/{id}"),
            &[("format", "full".to_string())],
            "get message",
        )?;
        Ok(wire.into())
    }

    fn get_raw_message(&self, id: &str) -> Result<Vec<u8>> {
        let wire: RawResponse = self.get_json(
            &format!("/messages/{id}"),
            &[("format", "raw".to_string())],
            "get raw message",
        )?;
        decode_base64url(&wire.raw)
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        let wire: AttachmentResponse = self.get_json(
            &format!("/messages/{message_id}/attachments/{attachment_id}"),
            &[],
            "get attachment",
        )?;
        Ok(wire.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::part::PartContent;

    const FULL_MESSAGE: &str = r#"{
        "id": "18d2a1b2c3d4e5f6",
        "threadId": "18d2a1b2c3d4e5f6",
        "snippet": "Your invoice is ready",
        "payload": {
            "partId": "",
            "mimeType": "multipart/related",
            "headers": [
                {"name": "Subject", "value": "Invoice #42"},
                {"name": "From", "value": "Billing <billing@example.com>"}
            ],
            "body": {"size": 0},
            "parts": [
                {
                    "partId": "0",
                    "mimeType": "text/html",
                    "headers": [],
                    "body": {"size": 12, "data": "PGI-aGk8L2I-"}
                },
                {
                    "partId": "1",
                    "mimeType": "image/png",
                    "filename": "logo.png",
                    "headers": [{"name": "Content-ID", "value": "<logo>"}],
                    "body": {"size": 2048, "attachmentId": "ANGjdJ8"}
                }
            ]
        }
    }"#;

    #[test]
    fn test_wire_message_conversion() {
        let wire: WireMessage = serde_json::from_str(FULL_MESSAGE).unwrap();
        let msg: RawMessage = wire.into();

        assert_eq!(msg.id, "18d2a1b2c3d4e5f6");
        assert_eq!(msg.snippet, "Your invoice is ready");
        assert_eq!(msg.payload.mime_type, "multipart/related");
        assert_eq!(msg.payload.headers[0], Header::new("Subject", "Invoice #42"));

        let children = msg.payload.children();
        assert_eq!(children.len(), 2);
        assert_eq!(
            children[0].content,
            PartContent::Leaf(PartBody::Inline("PGI-aGk8L2I-".into()))
        );
        assert_eq!(
            children[1].content,
            PartContent::Leaf(PartBody::Attachment("ANGjdJ8".into()))
        );
    }

    #[test]
    fn test_missing_payload_becomes_empty_leaf() {
        let wire: WireMessage = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        let msg: RawMessage = wire.into();
        assert_eq!(msg.payload.body(), Some(&PartBody::Empty));
        assert!(msg.thread_id.is_empty());
    }

    #[test]
    fn test_list_response_without_messages() {
        let page: ListResponse = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(page.messages.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_base_url_strips_slash() {
        let store = GmailStore::with_base_url(
            "tok",
            "https://gmail.test/v1/users/me/",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(store.base_url(), "https://gmail.test/v1/users/me");
    }
}
