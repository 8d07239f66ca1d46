//! Command handlers.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::Command;
use crate::aggregator::{parse_interval, Poller};
use crate::config::Config;
use crate::datetime::{format_utc_datetime_default, UNKNOWN_TIMESTAMP};
use crate::db::{Database, NewUser, User, UserRepository};
use crate::feed::{validate_url, FeedFollowRepository, FeedRepository, NewFeed};
use crate::post::PostRepository;
use crate::{GatorError, Result};

/// Everything a command needs: both views of the configuration and the
/// database.
pub struct Context {
    /// Configuration as read from disk, written back by `login`/`register`.
    file_config: Config,
    /// Effective configuration (file values plus environment overrides).
    config: Config,
    config_path: PathBuf,
    db: Database,
}

impl Context {
    /// Create a context.
    pub fn new(file_config: Config, config: Config, config_path: PathBuf, db: Database) -> Self {
        Self {
            file_config,
            config,
            config_path,
            db,
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    fn set_user(&mut self, name: &str) -> Result<()> {
        self.file_config.set_user(name, &self.config_path)?;
        self.config.session.current_user = Some(name.to_string());
        Ok(())
    }

    async fn current_user(&self) -> Result<User> {
        let name = self.config.current_user()?;
        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {name}")))
    }
}

/// Run a command, writing its output to `out`.
pub async fn execute(ctx: &mut Context, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Register { name } => register(ctx, &name, out).await,
        Command::Login { name } => login(ctx, &name, out).await,
        Command::Users => users(ctx, out).await,
        Command::Reset => reset(ctx, out).await,
        Command::Addfeed { name, url } => add_feed(ctx, &name, &url, out).await,
        Command::Feeds => feeds(ctx, out).await,
        Command::Follow { url } => follow(ctx, &url, out).await,
        Command::Unfollow { url } => unfollow(ctx, &url, out).await,
        Command::Following => following(ctx, out).await,
        Command::Browse { limit } => browse(ctx, limit, out).await,
        Command::Agg { interval } => aggregate(ctx, &interval, out).await,
    }
}

async fn register(ctx: &mut Context, name: &str, out: &mut impl Write) -> Result<()> {
    let user = UserRepository::new(ctx.db.pool())
        .create(&NewUser::new(name))
        .await?;
    ctx.set_user(&user.name)?;
    info!(user_id = user.id, name = %user.name, "Registered user");
    writeln!(out, "User {} created", user.name)?;
    Ok(())
}

async fn login(ctx: &mut Context, name: &str, out: &mut impl Write) -> Result<()> {
    let user = UserRepository::new(ctx.db.pool())
        .get_by_name(name)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("user {name}")))?;
    ctx.set_user(&user.name)?;
    writeln!(out, "Logged in as {}", user.name)?;
    Ok(())
}

async fn users(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let current = ctx.config.session.current_user.as_deref();
    for user in UserRepository::new(ctx.db.pool()).list().await? {
        if Some(user.name.as_str()) == current {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}

async fn reset(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let deleted = UserRepository::new(ctx.db.pool()).reset().await?;
    info!(users = deleted, "Database reset");
    writeln!(out, "Reset successful")?;
    Ok(())
}

async fn add_feed(ctx: &Context, name: &str, url: &str, out: &mut impl Write) -> Result<()> {
    let user = ctx.current_user().await?;
    validate_url(url, false)?;

    let feed = FeedRepository::new(ctx.db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await?;
    FeedFollowRepository::new(ctx.db.pool())
        .create(user.id, feed.id)
        .await?;

    info!(feed_id = feed.id, url = %feed.url, "Added feed");
    writeln!(out, "Feed added: {} ({})", feed.name, feed.url)?;
    writeln!(out, "{} now follows {}", user.name, feed.name)?;
    Ok(())
}

async fn feeds(ctx: &Context, out: &mut impl Write) -> Result<()> {
    for entry in FeedRepository::new(ctx.db.pool()).list_with_owner().await? {
        writeln!(
            out,
            "* {} | {} | added by {}",
            entry.feed.name, entry.feed.url, entry.user_name
        )?;
    }
    Ok(())
}

async fn follow(ctx: &Context, url: &str, out: &mut impl Write) -> Result<()> {
    let user = ctx.current_user().await?;
    let feed = FeedRepository::new(ctx.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))?;

    let follow = FeedFollowRepository::new(ctx.db.pool())
        .create(user.id, feed.id)
        .await?;
    writeln!(out, "{} now follows {}", follow.user_name, follow.feed_name)?;
    Ok(())
}

async fn unfollow(ctx: &Context, url: &str, out: &mut impl Write) -> Result<()> {
    let user = ctx.current_user().await?;
    let feed = FeedRepository::new(ctx.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))?;

    if !FeedFollowRepository::new(ctx.db.pool())
        .delete(user.id, feed.id)
        .await?
    {
        return Err(GatorError::NotFound(format!("follow of {url}")));
    }
    writeln!(out, "{} unfollowed {}", user.name, feed.name)?;
    Ok(())
}

async fn following(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let user = ctx.current_user().await?;
    let follows = FeedFollowRepository::new(ctx.db.pool())
        .list_for_user(user.id)
        .await?;

    writeln!(out, "{} is following:", user.name)?;
    for follow in follows {
        writeln!(out, " - {}", follow.feed_name)?;
    }
    Ok(())
}

async fn browse(ctx: &Context, limit: i64, out: &mut impl Write) -> Result<()> {
    if limit <= 0 {
        return Err(GatorError::Validation(
            "limit must be greater than zero".to_string(),
        ));
    }
    let user = ctx.current_user().await?;
    let posts = PostRepository::new(ctx.db.pool())
        .list_for_user(user.id, limit)
        .await?;

    let timezone = &ctx.config.display.timezone;
    for entry in posts {
        let post = entry.post;
        let published = if post.published_at == UNKNOWN_TIMESTAMP {
            "unknown date".to_string()
        } else {
            format_utc_datetime_default(&post.published_at, timezone)
        };
        writeln!(out, "{} | {} | {}", published, entry.feed_name, post.title)?;
        writeln!(out, "  {}", post.url)?;
        if let Some(desc) = post.description.filter(|d| !d.is_empty()) {
            writeln!(out, "  {desc}")?;
        }
    }
    Ok(())
}

async fn aggregate(ctx: &Context, interval: &str, out: &mut impl Write) -> Result<()> {
    let interval = parse_interval(interval)?;
    let poller = Poller::from_config(
        Arc::new(ctx.db.clone()),
        &ctx.config.aggregator,
        interval,
    )?;

    writeln!(out, "Collecting feeds every {:?}", poller.interval())?;
    out.flush()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interrupt = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
        info!("Interrupt received, stopping");
        let _ = shutdown_tx.send(true);
    };

    tokio::join!(poller.run(shutdown_rx), interrupt);
    Ok(())
}
