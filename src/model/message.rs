//! Parsed message record and inline image references.

use std::collections::BTreeMap;

/// An inline image referenced from the HTML body by `cid:`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageRef {
    /// MIME type of the image part (always starts with `image/`).
    pub mime_type: String,

    /// Image bytes, still base64(url)-encoded. `None` until fetched.
    pub data: Option<String>,

    /// Out-of-line attachment id, if the provider did not inline the data.
    pub attachment_id: Option<String>,
}

impl ImageRef {
    /// `true` if the data still has to be fetched by attachment id.
    pub fn needs_fetch(&self) -> bool {
        self.attachment_id.is_some() && self.data.is_none()
    }
}

/// A message reduced to the fields the filter and export stages use.
///
/// Built once by [`crate::parser::payload::parse_message`] and never mutated
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedMessage {
    /// Provider message id.
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub to: String,

    /// `Date:` header exactly as sent. Not validated.
    pub date: String,

    /// `Message-ID:` header.
    pub message_id: String,

    /// Provider-supplied preview text.
    pub snippet: String,

    /// First `text/plain` leaf, depth-first, or empty.
    pub body_text: String,

    /// First `text/html` leaf, depth-first, or empty.
    pub body_html: String,

    /// Inline images keyed by Content-ID (angle brackets stripped).
    pub inline_images: BTreeMap<String, ImageRef>,
}

impl ParsedMessage {
    /// Subject for display, with a placeholder when empty.
    pub fn display_subject(&self) -> &str {
        if self.subject.is_empty() {
            "(No Subject)"
        } else {
            &self.subject
        }
    }
}
