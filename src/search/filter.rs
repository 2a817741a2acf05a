//! In-memory filters and sorting over parsed messages.
//!
//! All functions return a new `Vec` and preserve the input order unless
//! they sort.

use regex::RegexBuilder;

use crate::error::{MailsiftError, Result};
use crate::model::message::ParsedMessage;

/// Where and how to look for keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordFilter {
    /// Look in the subject.
    pub search_subject: bool,
    /// Look in the plain-text body, the HTML body and the snippet.
    pub search_body: bool,
    pub case_sensitive: bool,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self {
            search_subject: true,
            search_body: true,
            case_sensitive: false,
        }
    }
}

impl KeywordFilter {
    /// Build from the CLI's `--subject-only` / `--body-only` flags.
    pub fn from_flags(subject_only: bool, body_only: bool, case_sensitive: bool) -> Self {
        Self {
            search_subject: !body_only,
            search_body: !subject_only,
            case_sensitive,
        }
    }
}

/// Keep messages where ANY keyword is a substring of the selected fields.
///
/// The selected fields are joined with single spaces and searched as one
/// string. An empty keyword list returns the input unchanged.
pub fn filter_by_keywords(
    messages: &[ParsedMessage],
    keywords: &[String],
    options: KeywordFilter,
) -> Vec<ParsedMessage> {
    if keywords.is_empty() {
        return messages.to_vec();
    }

    let needles: Vec<String> = if options.case_sensitive {
        keywords.to_vec()
    } else {
        keywords.iter().map(|k| k.to_lowercase()).collect()
    };

    messages
        .iter()
        .filter(|msg| {
            let haystack = search_text(msg, options);
            needles.iter().any(|needle| haystack.contains(needle.as_str()))
        })
        .cloned()
        .collect()
}

/// Concatenate the fields a keyword search looks at.
fn search_text(msg: &ParsedMessage, options: KeywordFilter) -> String {
    let mut text = String::new();
    if options.search_subject {
        text.push_str(&msg.subject);
        text.push(' ');
    }
    if options.search_body {
        text.push_str(&msg.body_text);
        text.push(' ');
        text.push_str(&msg.body_html);
        text.push(' ');
        text.push_str(&msg.snippet);
    }

    if options.case_sensitive {
        text
    } else {
        text.to_lowercase()
    }
}

/// Keep messages whose `From` header matches `pattern` (unanchored, case-insensitive).
pub fn filter_by_sender(messages: &[ParsedMessage], pattern: &str) -> Result<Vec<ParsedMessage>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| MailsiftError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

    Ok(messages
        .iter()
        .filter(|msg| re.is_match(&msg.from))
        .cloned()
        .collect())
}

/// Keep messages whose raw `Date` header lies within `[start, end]`.
///
/// Comparison is lexicographic on the header text, not calendar-aware:
/// `"9 Jan"` sorts after `"10 Feb"`. Either bound may be omitted.
pub fn filter_by_date_range(
    messages: &[ParsedMessage],
    start: Option<&str>,
    end: Option<&str>,
) -> Vec<ParsedMessage> {
    messages
        .iter()
        .filter(|msg| {
            let date = msg.date.as_str();
            !start.is_some_and(|s| !s.is_empty() && date < s)
                && !end.is_some_and(|e| !e.is_empty() && date > e)
        })
        .cloned()
        .collect()
}

/// Stable sort on the raw `Date` header string.
pub fn sort_by_date(messages: &[ParsedMessage], reverse: bool) -> Vec<ParsedMessage> {
    let mut sorted = messages.to_vec();
    if reverse {
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
    } else {
        sorted.sort_by(|a, b| a.date.cmp(&b.date));
    }
    sorted
}
