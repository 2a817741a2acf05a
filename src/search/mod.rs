//! Message selection: keyword, sender and date filters plus sorting.

pub mod filter;

pub use filter::{
    filter_by_date_range, filter_by_keywords, filter_by_sender, sort_by_date, KeywordFilter,
};
