//! Fetch pipeline: list ids, get each message, parse it, resolve inline images.
//!
//! Per-message and per-attachment failures do not abort the run. They are
//! logged and returned next to the messages that did arrive.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{MailsiftError, Result};
use crate::model::message::{ImageRef, ParsedMessage};
use crate::parser::payload::parse_message;
use crate::store::MessageStore;

/// What went wrong while fetching one item.
#[derive(Debug)]
pub struct FetchFailure {
    /// Message id the failure belongs to.
    pub message_id: String,
    /// Attachment id, for inline images that could not be fetched.
    pub attachment_id: Option<String>,
    pub error: MailsiftError,
}

/// Result of [`fetch_messages`].
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Successfully fetched messages, in listing order.
    pub messages: Vec<ParsedMessage>,
    /// Messages or inline images that could not be fetched.
    pub failures: Vec<FetchFailure>,
}

impl FetchReport {
    /// Number of whole messages that were skipped.
    pub fn skipped_messages(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.attachment_id.is_none())
            .count()
    }
}

/// Fetch and parse up to `max_results` messages matching `query`.
///
/// A failed listing call is returned as an error since there is nothing to
/// continue with. Everything after that is fail-soft.
///
/// The progress callback receives `(current, total)`.
pub fn fetch_messages(
    store: &dyn MessageStore,
    query: &str,
    max_results: u32,
    progress: &dyn Fn(usize, usize),
) -> Result<FetchReport> {
    let ids = store.list_message_ids(query, max_results)?;
    debug!(count = ids.len(), query = query, "Listed message ids");

    let mut report = FetchReport::default();
    let total = ids.len();

    for (i, id) in ids.iter().enumerate() {
        progress(i, total);
        match fetch_message(store, id) {
            Ok((message, image_failures)) => {
                report.messages.push(message);
                report.failures.extend(image_failures);
            }
            Err(error) => {
                warn!(id = %id, error = %error, "Failed to fetch message");
                report.failures.push(FetchFailure {
                    message_id: id.clone(),
                    attachment_id: None,
                    error,
                });
            }
        }
    }
    progress(total, total);

    Ok(report)
}

/// Fetch one message, parse it and resolve its inline images.
///
/// Images whose attachment fetch fails stay unresolved (`data: None`) and
/// are reported alongside the message.
pub fn fetch_message(
    store: &dyn MessageStore,
    id: &str,
) -> Result<(ParsedMessage, Vec<FetchFailure>)> {
    let raw = store.get_message(id)?;
    let parsed = parse_message(&raw);
    let (inline_images, failures) = resolve_inline_images(store, id, &parsed.inline_images);

    Ok((
        ParsedMessage {
            inline_images,
            ..parsed
        },
        failures,
    ))
}

/// Fill in data for every image that only carries an attachment id.
pub fn resolve_inline_images(
    store: &dyn MessageStore,
    message_id: &str,
    images: &BTreeMap<String, ImageRef>,
) -> (BTreeMap<String, ImageRef>, Vec<FetchFailure>) {
    let mut resolved = BTreeMap::new();
    let mut failures = Vec::new();

    for (cid, image) in images {
        let mut image = image.clone();
        if let (true, Some(attachment_id)) = (image.needs_fetch(), image.attachment_id.clone()) {
            match store.get_attachment(message_id, &attachment_id) {
                Ok(data) => image.data = Some(data),
                Err(error) => {
                    warn!(
                        id = %message_id,
                        attachment = %attachment_id,
                        error = %error,
                        "Failed to fetch inline image"
                    );
                    failures.push(FetchFailure {
                        message_id: message_id.to_string(),
                        attachment_id: Some(attachment_id),
                        error,
                    });
                }
            }
        }
        resolved.insert(cid.clone(), image);
    }

    (resolved, failures)
}
