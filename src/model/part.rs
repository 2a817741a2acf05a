//! MIME part tree as delivered by the mail API.

/// A single `Name: value` header, in the order the provider sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Payload carried by a leaf part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// Base64url-encoded data included in the response.
    Inline(String),
    /// Out-of-line data that must be fetched by attachment id.
    Attachment(String),
    /// No data at all (e.g. a zero-length body).
    Empty,
}

/// Either child parts or a body, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    /// A `multipart/*` node. Only traversed, never treated as content.
    Container(Vec<RawPart>),
    Leaf(PartBody),
}

/// One node of a message's MIME structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPart {
    /// MIME type exactly as reported by the provider (e.g. `"text/html"`).
    pub mime_type: String,
    pub headers: Vec<Header>,
    pub content: PartContent,
}

impl RawPart {
    /// Build a leaf part.
    pub fn leaf(mime_type: impl Into<String>, headers: Vec<Header>, body: PartBody) -> Self {
        Self {
            mime_type: mime_type.into(),
            headers,
            content: PartContent::Leaf(body),
        }
    }

    /// Build a container part.
    pub fn container(
        mime_type: impl Into<String>,
        headers: Vec<Header>,
        children: Vec<RawPart>,
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            headers,
            content: PartContent::Container(children),
        }
    }

    /// Child parts, empty for leaves.
    pub fn children(&self) -> &[RawPart] {
        match &self.content {
            PartContent::Container(children) => children,
            PartContent::Leaf(_) => &[],
        }
    }

    /// The leaf body, `None` for containers.
    pub fn body(&self) -> Option<&PartBody> {
        match &self.content {
            PartContent::Leaf(body) => Some(body),
            PartContent::Container(_) => None,
        }
    }
}

/// A structured message as returned by the store, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: String,
    pub thread_id: String,
    /// Provider-supplied preview text.
    pub snippet: String,
    pub payload: RawPart,
}
