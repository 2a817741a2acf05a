//! `mailsift`: fetch, filter and export Gmail messages from the command line.
//!
//! This crate provides the core library: the MIME payload parser, the
//! message store abstraction and its Gmail client, the filter pipeline, and
//! the EML/HTML exporters.

pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod search;
pub mod store;
