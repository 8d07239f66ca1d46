//! Gator - a command-line RSS aggregator
//!
//! Users register feeds and follow them; a background poller fetches the
//! least recently fetched feed on every tick and stores posts it has not
//! seen before.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod post;

pub use aggregator::{parse_interval, IngestReport, Ingestor, Poller, TickOutcome};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{
    parse_feed, Feed, FeedFetcher, FeedFollowRepository, FeedRepository, FetchFeed, NewFeed,
    ParsedFeed, ParsedItem,
};
pub use post::{NewPost, Post, PostRepository};
