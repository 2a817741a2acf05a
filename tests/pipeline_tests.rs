//! Integration tests for the fetch, filter and export pipeline against an
//! in-memory store.

use std::cell::Cell;

use assert_fs::prelude::*;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use predicates::prelude::*;

use mailsift::error::MailsiftError;
use mailsift::export::{eml, html};
use mailsift::fetch;
use mailsift::model::part::{Header, PartBody, RawMessage, RawPart};
use mailsift::search::{self, KeywordFilter};
use mailsift::store::memory::MemoryStore;

fn encode(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

fn message(id: &str, subject: &str, date: &str, payload_children: Vec<RawPart>) -> RawMessage {
    RawMessage {
        id: id.to_string(),
        thread_id: format!("t-{id}"),
        snippet: format!("snippet of {id}"),
        payload: RawPart::container(
            "multipart/mixed",
            vec![
                Header::new("Subject", subject),
                Header::new("From", "Alice <alice@example.com>"),
                Header::new("To", "bob@example.com"),
                Header::new("Date", date),
            ],
            payload_children,
        ),
    }
}

fn text_part(mime: &str, text: &str) -> RawPart {
    RawPart::leaf(mime, vec![], PartBody::Inline(encode(text)))
}

fn image_part(cid: &str, body: PartBody) -> RawPart {
    RawPart::leaf(
        "image/png",
        vec![Header::new("Content-ID", format!("<{cid}>"))],
        body,
    )
}

// ─── Fetch ──────────────────────────────────────────────────────────

#[test]
fn test_fetch_resolves_inline_images() {
    let mut store = MemoryStore::new();
    store.insert_message(message(
        "m1",
        "Logo inside",
        "Mon, 1 Jan 2024 10:00:00 +0000",
        vec![
            text_part("text/html", r#"<img src="cid:logo">"#),
            image_part("logo", PartBody::Attachment("att-1".into())),
        ],
    ));
    store.insert_attachment("m1", "att-1", "iVBORw0KGgo");

    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.messages.len(), 1);

    let image = &report.messages[0].inline_images["logo"];
    assert_eq!(image.data.as_deref(), Some("iVBORw0KGgo"));
    assert!(!image.needs_fetch());
}

#[test]
fn test_fetch_skips_dangling_message() {
    let mut store = MemoryStore::new();
    store.insert_message(message("m1", "one", "", vec![text_part("text/plain", "a")]));
    store.insert_dangling_id("gone");
    store.insert_message(message("m2", "two", "", vec![text_part("text/plain", "b")]));

    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();
    let ids: Vec<&str> = report.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert_eq!(report.skipped_messages(), 1);
    assert_eq!(report.failures[0].message_id, "gone");
    assert!(matches!(
        report.failures[0].error,
        MailsiftError::NotFound(_)
    ));
}

#[test]
fn test_fetch_keeps_message_when_image_fetch_fails() {
    let mut store = MemoryStore::new();
    store.insert_message(message(
        "m1",
        "broken image",
        "",
        vec![
            text_part("text/html", r#"<img src="cid:pic">"#),
            image_part("pic", PartBody::Attachment("missing".into())),
        ],
    ));

    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();
    assert_eq!(report.messages.len(), 1);
    assert_eq!(report.skipped_messages(), 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].attachment_id.as_deref(), Some("missing"));
    assert!(report.messages[0].inline_images["pic"].needs_fetch());
}

#[test]
fn test_fetch_honours_max_results_and_reports_progress() {
    let mut store = MemoryStore::new();
    for i in 0..5 {
        store.insert_message(message(&format!("m{i}"), "x", "", vec![]));
    }

    let last = Cell::new((0, 0));
    let report = fetch::fetch_messages(&store, "", 3, &|current, total| {
        last.set((current, total));
    })
    .unwrap();
    assert_eq!(report.messages.len(), 3);
    assert_eq!(last.get(), (3, 3));
}

// ─── Filter ─────────────────────────────────────────────────────────

#[test]
fn test_filter_pipeline() {
    let mut store = MemoryStore::new();
    store.insert_message(message(
        "m1",
        "Quarterly invoice",
        "2024-01-05",
        vec![text_part("text/plain", "Please pay")],
    ));
    store.insert_message(message(
        "m2",
        "Lunch?",
        "2024-02-01",
        vec![text_part("text/plain", "The INVOICE is attached")],
    ));
    store.insert_message(message(
        "m3",
        "Holiday",
        "2024-03-01",
        vec![text_part("text/plain", "nothing here")],
    ));

    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();
    let keywords = vec!["invoice".to_string()];

    let any = search::filter_by_keywords(&report.messages, &keywords, KeywordFilter::default());
    assert_eq!(any.len(), 2);

    let subject_only = search::filter_by_keywords(
        &report.messages,
        &keywords,
        KeywordFilter::from_flags(true, false, false),
    );
    assert_eq!(subject_only.len(), 1);
    assert_eq!(subject_only[0].id, "m1");

    let since = search::filter_by_date_range(&any, Some("2024-02-01"), None);
    assert_eq!(since.len(), 1);
    assert_eq!(since[0].id, "m2");

    let by_sender = search::filter_by_sender(&any, r"alice@example\.com").unwrap();
    assert_eq!(by_sender.len(), 2);
}

// ─── EML export ─────────────────────────────────────────────────────

#[test]
fn test_export_eml_writes_raw_bytes_and_skips_missing() {
    let mut store = MemoryStore::new();
    store.insert_message(message("abcdef1234567890", "Hello, World! 2024", "", vec![]));
    store.insert_message(message("noraw00000", "No raw form", "", vec![]));
    let raw = b"From: alice@example.com\r\nSubject: Hello\r\n\r\nBody\r\n".to_vec();
    store.insert_raw("abcdef1234567890", raw.clone());

    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();

    let temp = assert_fs::TempDir::new().unwrap();
    let out = temp.child("downloads");
    let eml_report =
        eml::export_multiple_eml(&store, &report.messages, out.path(), &|_, _| {}).unwrap();

    assert_eq!(eml_report.written.len(), 1);
    assert_eq!(eml_report.skipped.len(), 1);
    assert_eq!(eml_report.skipped[0].0, "noraw00000");

    let file = out.child("Hello_World_2024_abcdef12.eml");
    file.assert(predicate::path::exists());
    assert_eq!(std::fs::read(file.path()).unwrap(), raw);

    temp.close().unwrap();
}

// ─── HTML export ────────────────────────────────────────────────────

#[test]
fn test_export_html_escapes_headers_keeps_html_body() {
    let mut store = MemoryStore::new();
    store.insert_message(message(
        "m1",
        "<script>alert(1)</script>",
        "Mon, 1 Jan 2024 10:00:00 +0000",
        vec![
            text_part("text/plain", "hi"),
            text_part("text/html", "<b>hi</b>"),
        ],
    ));
    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();

    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("nested").child("emails.html");
    html::export_html(&report.messages, file.path(), html::HtmlOptions::default()).unwrap();

    file.assert(predicate::str::contains("<b>hi</b>"));
    file.assert(predicate::str::contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    file.assert(predicate::str::contains("<script>").not());
    file.assert(predicate::str::contains("Total Emails:</strong> 1"));

    temp.close().unwrap();
}

#[test]
fn test_export_html_embeds_resolved_images() {
    let mut store = MemoryStore::new();
    store.insert_message(message(
        "m1",
        "With image",
        "",
        vec![
            text_part("text/html", r#"<img src="cid:logo">"#),
            image_part("logo", PartBody::Attachment("att-1".into())),
        ],
    ));
    store.insert_attachment("m1", "att-1", "-_8");
    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();

    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("emails.html");
    html::export_html(&report.messages, file.path(), html::HtmlOptions::default()).unwrap();

    file.assert(predicate::str::contains(r#"src="data:image/png;base64,+/8=""#));
    file.assert(predicate::str::contains("cid:logo").not());

    temp.close().unwrap();
}

#[test]
fn test_export_html_chronological_order() {
    let mut store = MemoryStore::new();
    store.insert_message(message(
        "m3",
        "third",
        "Wed, 3 Jan 2024 10:00:00 +0000",
        vec![],
    ));
    store.insert_message(message("m0", "undated", "", vec![]));
    store.insert_message(message(
        "m1",
        "first",
        "Mon, 1 Jan 2024 10:00:00 +0000",
        vec![],
    ));
    let report = fetch::fetch_messages(&store, "", 10, &|_, _| {}).unwrap();

    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("emails.html");
    html::export_html(&report.messages, file.path(), html::HtmlOptions::default()).unwrap();

    let content = std::fs::read_to_string(file.path()).unwrap();
    let pos = |subject: &str| {
        content
            .find(&format!(r#"<div class="email-subject">{subject}</div>"#))
            .unwrap()
    };
    assert!(pos("undated") < pos("first"));
    assert!(pos("first") < pos("third"));

    temp.close().unwrap();
}
