//! Feed module for gator.
//!
//! Registered feeds and follows, plus fetching and parsing of feed
//! documents.

mod fetcher;
mod parser;
mod repository;
mod types;

pub use fetcher::{validate_url, FeedFetcher, FetchFeed};
pub use parser::{parse_feed, unescape_html};
pub use repository::{FeedFollowRepository, FeedRepository};
pub use types::{
    Feed, FeedFollow, FeedWithOwner, NewFeed, ParsedFeed, ParsedItem, MAX_DESCRIPTION_LENGTH,
};
