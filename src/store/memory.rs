//! In-process store backed by fixture data.
//!
//! Used by the integration tests and benchmarks in place of the network,
//! and handy for replaying a captured mailbox.

use std::collections::HashMap;

use crate::error::{MailsiftError, Result};
use crate::model::part::RawMessage;

use super::MessageStore;

/// A [`MessageStore`] holding messages, raw bytes and attachments in memory.
///
/// Listing ignores the query and returns messages in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    order: Vec<String>,
    messages: HashMap<String, RawMessage>,
    raw: HashMap<String, Vec<u8>>,
    attachments: HashMap<(String, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a structured message. Its id is appended to the listing order.
    pub fn insert_message(&mut self, message: RawMessage) {
        if !self.messages.contains_key(&message.id) {
            self.order.push(message.id.clone());
        }
        self.messages.insert(message.id.clone(), message);
    }

    /// Register the raw RFC 822 bytes for a message id.
    pub fn insert_raw(&mut self, id: &str, bytes: impl Into<Vec<u8>>) {
        self.raw.insert(id.to_string(), bytes.into());
    }

    /// Register base64url attachment data.
    pub fn insert_attachment(&mut self, message_id: &str, attachment_id: &str, data: &str) {
        self.attachments.insert(
            (message_id.to_string(), attachment_id.to_string()),
            data.to_string(),
        );
    }

    /// List an id that has no structured message behind it.
    ///
    /// Fetching it fails with `NotFound`, which is how tests simulate a
    /// message disappearing between list and get.
    pub fn insert_dangling_id(&mut self, id: &str) {
        self.order.push(id.to_string());
    }
}

impl MessageStore for MemoryStore {
    fn list_message_ids(&self, _query: &str, max_results: u32) -> Result<Vec<String>> {
        Ok(self
            .order
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    fn get_message(&self, id: &str) -> Result<RawMessage> {
        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| MailsiftError::NotFound(format!("message {id}")))
    }

    fn get_raw_message(&self, id: &str) -> Result<Vec<u8>> {
        self.raw
            .get(id)
            .cloned()
            .ok_or_else(|| MailsiftError::NotFound(format!("raw message {id}")))
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        self.attachments
            .get(&(message_id.to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                MailsiftError::NotFound(format!("attachment {attachment_id} of {message_id}"))
            })
    }
}
