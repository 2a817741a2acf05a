//! Message parsing: MIME payload traversal and header decoding.

pub mod header;
pub mod payload;
