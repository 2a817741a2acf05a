//! Export messages as individual `.eml` files.
//!
//! An `.eml` file is the raw RFC 822 message exactly as the store returns it.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{MailsiftError, Result};
use crate::model::message::ParsedMessage;
use crate::store::MessageStore;

/// Maximum length of the subject portion of a filename, in characters.
const MAX_SUBJECT_LEN: usize = 50;

/// Outcome of [`export_multiple_eml`].
#[derive(Debug, Default)]
pub struct EmlReport {
    /// Files written, in message order.
    pub written: Vec<PathBuf>,
    /// Messages whose raw form could not be fetched, with the reason.
    pub skipped: Vec<(String, MailsiftError)>,
}

/// Export a single message as an `.eml` file.
///
/// Returns the path of the created file. An existing file is overwritten.
pub fn export_eml(
    store: &dyn MessageStore,
    message: &ParsedMessage,
    output_dir: &Path,
) -> Result<PathBuf> {
    let raw = store.get_raw_message(&message.id)?;

    let path = output_dir.join(eml_filename(message));
    std::fs::write(&path, raw).map_err(|e| MailsiftError::io(&path, e))?;
    info!(path = %path.display(), "Saved");
    Ok(path)
}

/// Export multiple messages as `.eml` files.
///
/// Creates `output_dir` if needed. A message whose raw bytes cannot be
/// fetched is skipped and reported; a failed write aborts.
///
/// The progress callback receives `(current, total)`.
pub fn export_multiple_eml(
    store: &dyn MessageStore,
    messages: &[ParsedMessage],
    output_dir: &Path,
    progress: &dyn Fn(usize, usize),
) -> Result<EmlReport> {
    std::fs::create_dir_all(output_dir).map_err(|e| MailsiftError::io(output_dir, e))?;
    let mut report = EmlReport::default();
    let total = messages.len();

    for (i, message) in messages.iter().enumerate() {
        progress(i, total);
        match export_eml(store, message, output_dir) {
            Ok(path) => report.written.push(path),
            Err(e @ MailsiftError::Io { .. }) => return Err(e),
            Err(e) => {
                warn!(id = %message.id, error = %e, "Failed to fetch raw message");
                report.skipped.push((message.id.clone(), e));
            }
        }
    }
    progress(total, total);

    Ok(report)
}

/// Generate the filename for an EML export.
///
/// Format: `{sanitized subject}_{first 8 chars of id}.eml`.
pub fn eml_filename(message: &ParsedMessage) -> String {
    let subject = sanitize_filename(&message.subject, MAX_SUBJECT_LEN);
    let id_prefix: String = message.id.chars().take(8).collect();
    format!("{subject}_{id_prefix}.eml")
}

/// Sanitize a string for use in filenames.
///
/// Keeps alphanumerics, spaces, hyphens and underscores, turns spaces into
/// underscores, truncates to `max_len` characters and strips trailing
/// underscores. Falls back to `"email"` when nothing is left.
pub fn sanitize_filename(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .filter(|&c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
        .map(|c| if c == ' ' { '_' } else { c })
        .take(max_len)
        .collect();

    let trimmed = sanitized.trim_end_matches('_');
    if trimmed.is_empty() {
        "email".to_string()
    } else {
        trimmed.to_string()
    }
}
