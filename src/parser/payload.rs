//! MIME payload traversal: body extraction and inline image discovery.
//!
//! All functions here are pure and never fail. A part whose data cannot be
//! decoded contributes nothing; the rest of the tree is still visited.

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::debug;

use crate::error::{MailsiftError, Result};
use crate::model::message::{ImageRef, ParsedMessage};
use crate::model::part::{PartBody, PartContent, RawMessage, RawPart};

use super::header::{decode_encoded_words, extract_header};

/// Base64url as the mail API emits it: padding may or may not be present.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Standard alphabet, accepted as a fallback for providers that ignore base64url.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode base64url data, tolerating missing padding and embedded whitespace.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    URL_SAFE_LENIENT
        .decode(&compact)
        .or_else(|_| STANDARD_LENIENT.decode(&compact))
        .map_err(|e| MailsiftError::Decode(e.to_string()))
}

/// Return the decoded text of the first leaf of type `target_mime_type`.
///
/// Traversal is depth-first, pre-order, in document order, and stops at
/// the first non-empty match. The MIME type comparison is exact. Returns an
/// empty string when nothing matches.
pub fn extract_body(root: &RawPart, target_mime_type: &str) -> String {
    match &root.content {
        PartContent::Container(children) => children
            .iter()
            .map(|child| extract_body(child, target_mime_type))
            .find(|text| !text.is_empty())
            .unwrap_or_default(),
        PartContent::Leaf(body) => {
            if root.mime_type != target_mime_type {
                return String::new();
            }
            match body {
                PartBody::Inline(data) => decode_text(data),
                PartBody::Attachment(_) | PartBody::Empty => String::new(),
            }
        }
    }
}

/// Collect every inline image in the tree, keyed by Content-ID.
///
/// A part qualifies when it carries a `Content-ID` header and its MIME type
/// starts with `image/`. Data is kept in its original base64 form. Parts
/// whose data lives behind an attachment id are returned with `data: None`
/// so the caller knows to fetch them.
pub fn extract_inline_images(root: &RawPart) -> BTreeMap<String, ImageRef> {
    let mut images = BTreeMap::new();
    collect_images(root, &mut images);
    images
}

fn collect_images(part: &RawPart, images: &mut BTreeMap<String, ImageRef>) {
    let header = extract_header(&part.headers, "Content-ID");
    let content_id = strip_content_id(&header);

    if !content_id.is_empty() && part.mime_type.starts_with("image/") {
        match part.body() {
            Some(PartBody::Attachment(attachment_id)) => {
                images.insert(
                    content_id.to_string(),
                    ImageRef {
                        mime_type: part.mime_type.clone(),
                        data: None,
                        attachment_id: Some(attachment_id.clone()),
                    },
                );
            }
            Some(PartBody::Inline(data)) => {
                images.insert(
                    content_id.to_string(),
                    ImageRef {
                        mime_type: part.mime_type.clone(),
                        data: Some(data.clone()),
                        attachment_id: None,
                    },
                );
            }
            Some(PartBody::Empty) | None => {}
        }
    }

    for child in part.children() {
        collect_images(child, images);
    }
}

/// Strip one leading `<` and one trailing `>` from a Content-ID value.
pub fn strip_content_id(value: &str) -> &str {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('<').unwrap_or(trimmed);
    trimmed.strip_suffix('>').unwrap_or(trimmed)
}

/// Build a [`ParsedMessage`] from a structured message.
///
/// Inline images that still need fetching are left with `data: None`;
/// resolving them is the fetch pipeline's job.
pub fn parse_message(raw: &RawMessage) -> ParsedMessage {
    let headers = &raw.payload.headers;

    ParsedMessage {
        id: raw.id.clone(),
        thread_id: raw.thread_id.clone(),
        subject: decode_encoded_words(&extract_header(headers, "Subject")),
        from: decode_encoded_words(&extract_header(headers, "From")),
        to: decode_encoded_words(&extract_header(headers, "To")),
        date: extract_header(headers, "Date"),
        message_id: extract_header(headers, "Message-ID"),
        snippet: raw.snippet.clone(),
        body_text: extract_body(&raw.payload, "text/plain"),
        body_html: extract_body(&raw.payload, "text/html"),
        inline_images: extract_inline_images(&raw.payload),
    }
}

/// Base64url-decode a body and interpret it as UTF-8, replacing bad sequences.
fn decode_text(data: &str) -> String {
    match decode_base64url(data) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!(error = %e, "Skipping undecodable body part");
            String::new()
        }
    }
}
