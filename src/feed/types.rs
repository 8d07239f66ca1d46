//! Feed types for gator.

use chrono::{DateTime, Utc};

/// Maximum length for a stored post description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 10000;

/// A registered feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Display name given at registration.
    pub name: String,
    /// Feed URL (globally unique).
    pub url: String,
    /// User who registered the feed.
    pub user_id: i64,
    /// Last time the poller claimed this feed. `None` until first claim.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A feed joined with its owner's name, for listings.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Name of the user who registered it.
    pub user_name: String,
}

/// A user following a feed.
#[derive(Debug, Clone)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: i64,
    /// Following user.
    pub user_id: i64,
    /// Followed feed.
    pub feed_id: i64,
    /// Following user's name.
    pub user_name: String,
    /// Followed feed's name.
    pub feed_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

/// Parsed feed document, valid for one fetch cycle.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Channel title.
    pub title: String,
    /// Channel link (site URL).
    pub link: Option<String>,
    /// Channel description.
    pub description: Option<String>,
    /// Items in document order.
    pub items: Vec<ParsedItem>,
}

/// Parsed item data from a feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedItem {
    /// Item title.
    pub title: String,
    /// Link to the original article; the post's unique key.
    pub link: Option<String>,
    /// Item description.
    pub description: Option<String>,
    /// Publish date, if the feed gave one in a recognised format.
    pub published: Option<DateTime<Utc>>,
}
