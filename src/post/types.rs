//! Post types for gator.

use chrono::{DateTime, Utc};

use crate::datetime::UNKNOWN_TIMESTAMP;
use crate::feed::MAX_DESCRIPTION_LENGTH;

/// A stored feed item.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Item title.
    pub title: String,
    /// Link to the original article (globally unique).
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish time; [`UNKNOWN_TIMESTAMP`] when the feed gave none.
    pub published_at: DateTime<Utc>,
    /// Feed the post was ingested from.
    pub feed_id: i64,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A post joined with the name of its feed, for browsing.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    /// The post.
    pub post: Post,
    /// Name of the feed it came from.
    pub feed_name: String,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Feed ID.
    pub feed_id: i64,
    /// Link to the original article.
    pub url: String,
    /// Item title.
    pub title: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish time.
    pub published_at: DateTime<Utc>,
}

impl NewPost {
    /// Create a new post with an unknown publish time.
    pub fn new(feed_id: i64, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            feed_id,
            url: url.into(),
            title: title.into(),
            description: None,
            published_at: UNKNOWN_TIMESTAMP,
        }
    }

    /// Set the description, truncated to [`MAX_DESCRIPTION_LENGTH`] characters.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let desc = description.into();
        if desc.chars().count() > MAX_DESCRIPTION_LENGTH {
            self.description = Some(desc.chars().take(MAX_DESCRIPTION_LENGTH).collect());
        } else {
            self.description = Some(desc);
        }
        self
    }

    /// Set the publish time.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }
}
