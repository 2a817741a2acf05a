//! Core data model types: the raw MIME part tree and the parsed message.

pub mod message;
pub mod part;
