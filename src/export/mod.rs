//! Export functionality: raw EML files and an aggregated HTML document.

pub mod eml;
pub mod html;
