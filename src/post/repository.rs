//! Post repository for gator.

use chrono::Utc;

use super::types::{NewPost, Post, PostWithFeed};
use crate::datetime::{from_db, to_db, UNKNOWN_TIMESTAMP};
use crate::db::DbPool;
use crate::{GatorError, Result};

/// Row type for post from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    url: String,
    description: Option<String>,
    published_at: String,
    feed_id: i64,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: from_db(&row.published_at).unwrap_or(UNKNOWN_TIMESTAMP),
            feed_id: row.feed_id,
            created_at: from_db(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_db(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for post joined with its feed name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostWithFeedRow {
    #[sqlx(flatten)]
    post: PostRow,
    feed_name: String,
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new post.
    ///
    /// Fails with [`GatorError::Duplicate`] when a post with the same URL
    /// already exists; nothing is written in that case.
    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        let now = to_db(&Utc::now());
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (title, url, description, published_at, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, title, url, description, published_at, feed_id, created_at, updated_at
            "#,
        )
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(to_db(&post.published_at))
        .bind(post.feed_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| GatorError::from_insert(e, format!("post {}", post.url)))?;

        Ok(row.into())
    }

    /// Get a post by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, url, description, published_at, feed_id, created_at, updated_at
            FROM posts
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// Count all posts.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }

    /// Count posts ingested from a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }

    /// List the newest posts from the feeds a user follows.
    pub async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<PostWithFeed>> {
        let rows = sqlx::query_as::<_, PostWithFeedRow>(
            r#"
            SELECT p.id, p.title, p.url, p.description, p.published_at, p.feed_id,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            JOIN feeds f ON f.id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostWithFeed {
                post: row.post.into(),
                feed_name: row.feed_name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::feed::{FeedFollowRepository, FeedRepository, NewFeed};
    use crate::Database;
    use chrono::{Duration, TimeZone};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_test_feed(db: &Database, user: &str, url: &str) -> (i64, i64) {
        let user_repo = UserRepository::new(db.pool());
        let user_id = match user_repo.get_by_name(user).await.unwrap() {
            Some(u) => u.id,
            None => user_repo.create(&NewUser::new(user)).await.unwrap().id,
        };
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new(url, url, user_id))
            .await
            .unwrap();
        (user_id, feed.id)
    }

    #[tokio::test]
    async fn test_create_post() {
        let db = setup_db().await;
        let (_, feed_id) = create_test_feed(&db, "alice", "https://a.example/feed").await;
        let repo = PostRepository::new(db.pool());

        let published = Utc.with_ymd_and_hms(2025, 1, 6, 10, 30, 0).unwrap();
        let post = repo
            .create(
                &NewPost::new(feed_id, "https://a.example/1", "First")
                    .with_description("Body")
                    .with_published_at(published),
            )
            .await
            .unwrap();

        assert!(post.id > 0);
        assert_eq!(post.title, "First");
        assert_eq!(post.description.as_deref(), Some("Body"));
        assert_eq!(post.published_at, published);
        assert_eq!(post.feed_id, feed_id);
    }

    #[tokio::test]
    async fn test_create_duplicate_url_writes_nothing() {
        let db = setup_db().await;
        let (_, feed_id) = create_test_feed(&db, "alice", "https://a.example/feed").await;
        let repo = PostRepository::new(db.pool());

        repo.create(&NewPost::new(feed_id, "https://a.example/1", "First"))
            .await
            .unwrap();
        let err = repo
            .create(&NewPost::new(feed_id, "https://a.example/1", "Changed"))
            .await
            .unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.get_by_url("https://a.example/1").await.unwrap().unwrap();
        assert_eq!(stored.title, "First");
    }

    #[tokio::test]
    async fn test_duplicate_url_across_feeds() {
        let db = setup_db().await;
        let (_, feed_a) = create_test_feed(&db, "alice", "https://a.example/feed").await;
        let (_, feed_b) = create_test_feed(&db, "alice", "https://b.example/feed").await;
        let repo = PostRepository::new(db.pool());

        repo.create(&NewPost::new(feed_a, "https://shared.example/1", "A"))
            .await
            .unwrap();
        let err = repo
            .create(&NewPost::new(feed_b, "https://shared.example/1", "B"))
            .await
            .unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(repo.count_by_feed(feed_a).await.unwrap(), 1);
        assert_eq!(repo.count_by_feed(feed_b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_publish_time_round_trips() {
        let db = setup_db().await;
        let (_, feed_id) = create_test_feed(&db, "alice", "https://a.example/feed").await;
        let repo = PostRepository::new(db.pool());

        let post = repo
            .create(&NewPost::new(feed_id, "https://a.example/undated", "Undated"))
            .await
            .unwrap();
        assert_eq!(post.published_at, UNKNOWN_TIMESTAMP);
    }

    #[tokio::test]
    async fn test_list_for_user_only_followed_newest_first() {
        let db = setup_db().await;
        let (alice, followed) = create_test_feed(&db, "alice", "https://a.example/feed").await;
        let (_, other) = create_test_feed(&db, "alice", "https://b.example/feed").await;
        FeedFollowRepository::new(db.pool())
            .create(alice, followed)
            .await
            .unwrap();
        let repo = PostRepository::new(db.pool());

        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for i in 0..3 {
            repo.create(
                &NewPost::new(followed, format!("https://a.example/{i}"), format!("A{i}"))
                    .with_published_at(base + Duration::days(i)),
            )
            .await
            .unwrap();
        }
        repo.create(
            &NewPost::new(other, "https://b.example/1", "B1")
                .with_published_at(base + Duration::days(10)),
        )
        .await
        .unwrap();

        let posts = repo.list_for_user(alice, 2).await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, vec!["A2", "A1"]);
        assert_eq!(posts[0].feed_name, "https://a.example/feed");
    }
}
