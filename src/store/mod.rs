//! Message store abstraction and its implementations.
//!
//! The rest of the crate only talks to [`MessageStore`]; the authenticated
//! HTTP client is created once in the binary and passed down explicitly.

pub mod auth;
pub mod gmail;
pub mod memory;

use crate::error::Result;
use crate::model::part::RawMessage;

/// Remote mailbox operations consumed by the fetch pipeline and exporters.
///
/// Every call is a single blocking attempt. Implementations do not retry.
pub trait MessageStore {
    /// List up to `max_results` message ids matching a provider search query.
    ///
    /// An empty query matches everything.
    fn list_message_ids(&self, query: &str, max_results: u32) -> Result<Vec<String>>;

    /// Fetch the structured form of a message (headers and MIME tree).
    fn get_message(&self, id: &str) -> Result<RawMessage>;

    /// Fetch the raw RFC 822 bytes of a message.
    fn get_raw_message(&self, id: &str) -> Result<Vec<u8>>;

    /// Fetch an attachment's data, base64url-encoded as the provider returns it.
    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String>;
}
