//! Export messages into a single self-contained HTML document.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::error::{MailsiftError, Result};
use crate::model::message::{ImageRef, ParsedMessage};
use crate::parser::header::parse_date;
use crate::parser::payload::decode_base64url;

/// Ordering applied before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Sort by the parsed `Date` header. Otherwise keep the input order.
    pub sort_chronological: bool,
    /// Newest first instead of oldest first.
    pub newest_first: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            sort_chronological: true,
            newest_first: false,
        }
    }
}

const STYLE: &str = r#"        body {
            font-family: Arial, sans-serif;
            max-width: 1200px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f5f5f5;
        }
        .email-container {
            background-color: white;
            margin-bottom: 20px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
            overflow: hidden;
        }
        .email-header {
            background-color: #f8f9fa;
            padding: 15px 20px;
            border-bottom: 1px solid #dee2e6;
        }
        .email-subject {
            font-size: 18px;
            font-weight: bold;
            margin-bottom: 8px;
            color: #212529;
        }
        .email-meta {
            font-size: 13px;
            color: #6c757d;
            margin: 3px 0;
        }
        .email-body {
            padding: 20px;
            line-height: 1.6;
        }
        .email-body pre {
            white-space: pre-wrap;
        }
        .label {
            font-weight: 600;
            margin-right: 5px;
        }
        h1 {
            color: #212529;
            border-bottom: 3px solid #007bff;
            padding-bottom: 10px;
        }
        .summary {
            background-color: white;
            padding: 15px 20px;
            border-radius: 8px;
            margin-bottom: 20px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
"#;

/// Write `messages` as one HTML document to `output_file`.
///
/// Overwrites an existing file. Returns the path written.
pub fn export_html(
    messages: &[ParsedMessage],
    output_file: &Path,
    options: HtmlOptions,
) -> Result<PathBuf> {
    let ordered = if options.sort_chronological {
        sort_chronologically(messages, options.newest_first)
    } else {
        messages.to_vec()
    };

    let html = render_html(&ordered, Local::now());

    if let Some(parent) = output_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| MailsiftError::io(parent, e))?;
        }
    }
    std::fs::write(output_file, html).map_err(|e| MailsiftError::io(output_file, e))?;
    info!(path = %output_file.display(), count = ordered.len(), "Saved HTML");
    Ok(output_file.to_path_buf())
}

/// Sort by the parsed `Date` header.
///
/// Empty or unparsable dates count as the earliest possible instant, so
/// they come first in ascending order and last when `newest_first`. The
/// sort is stable.
pub fn sort_chronologically(messages: &[ParsedMessage], newest_first: bool) -> Vec<ParsedMessage> {
    let mut keyed: Vec<(Option<DateTime<chrono::Utc>>, &ParsedMessage)> = messages
        .iter()
        .map(|m| (parse_date(&m.date), m))
        .collect();

    if newest_first {
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
    } else {
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
    }

    keyed.into_iter().map(|(_, m)| m.clone()).collect()
}

/// Render the full document. Messages are emitted in the given order.
pub fn render_html(messages: &[ParsedMessage], generated_at: DateTime<Local>) -> String {
    let mut out = String::with_capacity(8 * 1024 + messages.len() * 4 * 1024);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("    <meta charset=\"UTF-8\">\n");
    out.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    out.push_str("    <title>Gmail Export</title>\n    <style>\n");
    out.push_str(STYLE);
    out.push_str("    </style>\n</head>\n<body>\n    <h1>Gmail Export</h1>\n");
    let _ = write!(
        out,
        "    <div class=\"summary\">\n        <p><strong>Total Emails:</strong> {}</p>\n        <p><strong>Generated:</strong> {}</p>\n    </div>\n",
        messages.len(),
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    for (idx, msg) in messages.iter().enumerate() {
        let _ = write!(
            out,
            r#"
    <div class="email-container" id="email-{num}">
        <div class="email-header">
            <div class="email-subject">{subject}</div>
            <div class="email-meta"><span class="label">From:</span>{from}</div>
            <div class="email-meta"><span class="label">To:</span>{to}</div>
            <div class="email-meta"><span class="label">Date:</span>{date}</div>
        </div>
        <div class="email-body">
            {body}
        </div>
    </div>
"#,
            num = idx + 1,
            subject = html_escape(msg.display_subject()),
            from = html_escape(&msg.from),
            to = html_escape(&msg.to),
            date = html_escape(&msg.date),
            body = message_body(msg),
        );
    }

    out.push_str("\n</body>\n</html>\n");
    out
}

/// The HTML body if there is one, otherwise escaped plain text in a `<pre>`.
fn message_body(msg: &ParsedMessage) -> String {
    if !msg.body_html.is_empty() {
        return embed_inline_images(&msg.body_html, &msg.inline_images);
    }
    let text = if msg.body_text.is_empty() {
        &msg.snippet
    } else {
        &msg.body_text
    };
    format!("<pre>{}</pre>", html_escape(text))
}

/// Replace `cid:` references with `data:` URIs for images that have data.
///
/// Each reference is read up to the next quote, `)`, `>` or whitespace and
/// looked up as a whole, so `cid:img1` never touches `cid:img10`.
/// Unresolved images keep their `cid:` reference.
pub fn embed_inline_images(html: &str, images: &BTreeMap<String, ImageRef>) -> String {
    if images.is_empty() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find("cid:") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + "cid:".len()..];
        let end = after
            .find(|c: char| matches!(c, '"' | '\'' | ')' | '>') || c.is_whitespace())
            .unwrap_or(after.len());
        let cid = &after[..end];

        match images.get(cid).and_then(|image| data_uri(cid, image)) {
            Some(uri) => out.push_str(&uri),
            None => {
                out.push_str("cid:");
                out.push_str(cid);
            }
        }
        rest = &after[end..];
    }
    out.push_str(rest);
    out
}

/// Re-encode resolved image data as a standard-base64 `data:` URI.
fn data_uri(cid: &str, image: &ImageRef) -> Option<String> {
    let data = image.data.as_deref()?;
    match decode_base64url(data) {
        Ok(bytes) => Some(format!(
            "data:{};base64,{}",
            image.mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )),
        Err(e) => {
            debug!(cid = %cid, error = %e, "Leaving undecodable inline image as cid:");
            None
        }
    }
}

/// Escape text for safe interpolation into HTML element content or attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, date: &str) -> ParsedMessage {
        ParsedMessage {
            id: id.to_string(),
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_sort_unparsable_first() {
        let messages = vec![
            msg("jan3", "Wed, 3 Jan 2024 10:00:00 +0000"),
            msg("none", ""),
            msg("jan1", "Mon, 1 Jan 2024 10:00:00 +0000"),
        ];
        let ids: Vec<String> = sort_chronologically(&messages, false)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["none", "jan1", "jan3"]);

        let ids: Vec<String> = sort_chronologically(&messages, true)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["jan3", "jan1", "none"]);
    }

    #[test]
    fn test_sort_uses_calendar_not_text() {
        let messages = vec![
            msg("feb", "Sat, 10 Feb 2024 08:00:00 +0000"),
            msg("jan", "Tue, 9 Jan 2024 08:00:00 +0000"),
        ];
        let sorted = sort_chronologically(&messages, false);
        assert_eq!(sorted[0].id, "jan");
    }

    #[test]
    fn test_body_prefers_html() {
        let m = ParsedMessage {
            body_html: "<b>hi</b>".into(),
            body_text: "hi".into(),
            ..Default::default()
        };
        assert_eq!(message_body(&m), "<b>hi</b>");
    }

    #[test]
    fn test_body_falls_back_to_escaped_text() {
        let m = ParsedMessage {
            body_text: "a < b".into(),
            ..Default::default()
        };
        assert_eq!(message_body(&m), "<pre>a &lt; b</pre>");
    }

    #[test]
    fn test_body_falls_back_to_snippet() {
        let m = ParsedMessage {
            snippet: "preview only".into(),
            ..Default::default()
        };
        assert_eq!(message_body(&m), "<pre>preview only</pre>");
    }

    #[test]
    fn test_embed_inline_images() {
        let mut images = BTreeMap::new();
        images.insert(
            "logo".to_string(),
            ImageRef {
                mime_type: "image/png".into(),
                // base64url of [0xfb, 0xff]
                data: Some("-_8".into()),
                attachment_id: None,
            },
        );
        images.insert(
            "pending".to_string(),
            ImageRef {
                mime_type: "image/png".into(),
                data: None,
                attachment_id: Some("att".into()),
            },
        );

        let html = r#"<img src="cid:logo"><img src="cid:pending">"#;
        let out = embed_inline_images(html, &images);
        assert!(out.contains(r#"src="data:image/png;base64,+/8=""#));
        assert!(out.contains(r#"src="cid:pending""#));
    }

    fn png(data: Option<&str>, attachment_id: Option<&str>) -> ImageRef {
        ImageRef {
            mime_type: "image/png".into(),
            data: data.map(String::from),
            attachment_id: attachment_id.map(String::from),
        }
    }

    #[test]
    fn test_embed_prefix_ids_do_not_collide() {
        let mut images = BTreeMap::new();
        images.insert("img1".to_string(), png(Some("AAAA"), None));
        images.insert("img10".to_string(), png(Some("-_8"), None));

        let out = embed_inline_images(r#"<img src="cid:img10">"#, &images);
        assert_eq!(out, r#"<img src="data:image/png;base64,+/8=">"#);
    }

    #[test]
    fn test_embed_mixed_resolved_and_unresolved() {
        let mut images = BTreeMap::new();
        images.insert("img1".to_string(), png(Some("AAAA"), None));
        images.insert("img10".to_string(), png(Some("-_8"), None));
        images.insert("img100".to_string(), png(None, Some("att-100")));

        let html = concat!(
            r#"<img src="cid:img1"><img src='cid:img10'>"#,
            r#"<img src="cid:img100"><div style="background:url(cid:img1)">"#,
            r#"<img src="cid:unknown">"#,
        );
        let out = embed_inline_images(html, &images);
        assert_eq!(
            out,
            concat!(
                r#"<img src="data:image/png;base64,AAAA"><img src='data:image/png;base64,+/8='>"#,
                r#"<img src="cid:img100"><div style="background:url(data:image/png;base64,AAAA)">"#,
                r#"<img src="cid:unknown">"#,
            )
        );
    }

    #[test]
    fn test_embed_without_images_is_identity() {
        let html = r#"<p>see cid:logo</p>"#;
        assert_eq!(embed_inline_images(html, &BTreeMap::new()), html);
    }
}
