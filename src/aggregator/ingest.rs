//! Turning parsed feed items into stored posts.

use tracing::{debug, info};

use crate::db::Database;
use crate::feed::{Feed, ParsedFeed};
use crate::post::{NewPost, PostRepository};
use crate::Result;

/// Outcome of ingesting one parsed feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Posts newly stored.
    pub created: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items dropped because they had no link.
    pub skipped: usize,
}

/// Stores the items of a parsed feed as posts.
pub struct Ingestor<'a> {
    db: &'a Database,
    max_items: usize,
}

impl<'a> Ingestor<'a> {
    /// Create an ingestor. `max_items` caps the items taken per feed (0 = all).
    pub fn new(db: &'a Database, max_items: usize) -> Self {
        Self { db, max_items }
    }

    /// Ingest the items of `parsed` into `feed`, in document order.
    ///
    /// An item whose URL is already stored is counted and passed over. Any
    /// other storage error stops the cycle and is returned; posts stored
    /// before it stay stored.
    pub async fn ingest(&self, feed: &Feed, parsed: ParsedFeed) -> Result<IngestReport> {
        let repo = PostRepository::new(self.db.pool());
        let mut report = IngestReport::default();

        let limit = if self.max_items == 0 {
            usize::MAX
        } else {
            self.max_items
        };

        for item in parsed.items.into_iter().take(limit) {
            let Some(link) = item.link.filter(|l| !l.trim().is_empty()) else {
                debug!(feed_id = feed.id, title = %item.title, "Skipping item without link");
                report.skipped += 1;
                continue;
            };

            let mut post = NewPost::new(feed.id, link, item.title);
            if let Some(desc) = item.description {
                post = post.with_description(desc);
            }
            if let Some(published) = item.published {
                post = post.with_published_at(published);
            }

            match repo.create(&post).await {
                Ok(_) => report.created += 1,
                Err(e) if e.is_duplicate() => report.duplicates += 1,
                Err(e) => return Err(e),
            }
        }

        if report.created > 0 {
            info!(
                feed_id = feed.id,
                url = %feed.url,
                "Feed updated: {} new post(s)",
                report.created
            );
        } else {
            debug!(feed_id = feed.id, url = %feed.url, "Feed updated: no new posts");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::UNKNOWN_TIMESTAMP;
    use crate::db::{NewUser, UserRepository};
    use crate::feed::{FeedRepository, NewFeed, ParsedItem};
    use chrono::{TimeZone, Utc};

    async fn setup() -> (Database, Feed) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Example", "https://example.com/feed", user.id))
            .await
            .unwrap();
        (db, feed)
    }

    fn item(link: Option<&str>, title: &str) -> ParsedItem {
        ParsedItem {
            title: title.to_string(),
            link: link.map(str::to_string),
            description: None,
            published: None,
        }
    }

    fn parsed(items: Vec<ParsedItem>) -> ParsedFeed {
        ParsedFeed {
            title: "Example".to_string(),
            items,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_posts() {
        let (db, feed) = setup().await;
        let published = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut first = item(Some("https://example.com/1"), "One");
        first.description = Some("Body".to_string());
        first.published = Some(published);

        let report = Ingestor::new(&db, 0)
            .ingest(
                &feed,
                parsed(vec![first, item(Some("https://example.com/2"), "Two")]),
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            IngestReport {
                created: 2,
                duplicates: 0,
                skipped: 0
            }
        );
        let repo = PostRepository::new(db.pool());
        let stored = repo.get_by_url("https://example.com/1").await.unwrap().unwrap();
        assert_eq!(stored.title, "One");
        assert_eq!(stored.description.as_deref(), Some("Body"));
        assert_eq!(stored.published_at, published);
        assert_eq!(stored.feed_id, feed.id);
    }

    #[tokio::test]
    async fn test_ingest_twice_is_idempotent() {
        let (db, feed) = setup().await;
        let ingestor = Ingestor::new(&db, 0);
        let items = || {
            parsed(vec![
                item(Some("https://example.com/1"), "One"),
                item(Some("https://example.com/2"), "Two"),
            ])
        };

        ingestor.ingest(&feed, items()).await.unwrap();
        let second = ingestor.ingest(&feed, items()).await.unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_skips_items_without_link() {
        let (db, feed) = setup().await;
        let report = Ingestor::new(&db, 0)
            .ingest(
                &feed,
                parsed(vec![
                    item(None, "No link"),
                    item(Some("  "), "Blank link"),
                    item(Some("https://example.com/1"), "One"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn test_ingest_undated_item_uses_unknown_time() {
        let (db, feed) = setup().await;
        Ingestor::new(&db, 0)
            .ingest(&feed, parsed(vec![item(Some("https://example.com/u"), "Undated")]))
            .await
            .unwrap();

        let stored = PostRepository::new(db.pool())
            .get_by_url("https://example.com/u")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.published_at, UNKNOWN_TIMESTAMP);
    }

    #[tokio::test]
    async fn test_ingest_respects_item_cap_in_document_order() {
        let (db, feed) = setup().await;
        let items = (0..5)
            .map(|i| item(Some(&format!("https://example.com/{i}")), &format!("Item {i}")))
            .collect();

        let report = Ingestor::new(&db, 2)
            .ingest(&feed, parsed(items))
            .await
            .unwrap();

        assert_eq!(report.created, 2);
        let repo = PostRepository::new(db.pool());
        assert!(repo.get_by_url("https://example.com/0").await.unwrap().is_some());
        assert!(repo.get_by_url("https://example.com/1").await.unwrap().is_some());
        assert!(repo.get_by_url("https://example.com/2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ingest_aborts_on_storage_error() {
        let (db, feed) = setup().await;
        // A feed ID with no row violates the posts foreign key.
        let missing = Feed {
            id: feed.id + 100,
            ..feed.clone()
        };

        let err = Ingestor::new(&db, 0)
            .ingest(
                &missing,
                parsed(vec![
                    item(Some("https://example.com/1"), "One"),
                    item(Some("https://example.com/2"), "Two"),
                ]),
            )
            .await
            .unwrap_err();

        assert!(!err.is_duplicate());
        assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 0);
    }
}
