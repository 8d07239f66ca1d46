//! Background feed poller.
//!
//! On every tick the poller claims the least recently fetched feed, fetches
//! and parses it and ingests its items. Feeds are visited round-robin by
//! `last_fetched_at`, which is stamped at claim time whether or not the
//! fetch succeeds, so a broken feed never starves the others.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::ingest::{IngestReport, Ingestor};
use crate::config::AggregatorConfig;
use crate::db::Database;
use crate::feed::{parse_feed, Feed, FeedFetcher, FeedRepository, FetchFeed};
use crate::Result;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No feeds are registered.
    Idle,
    /// A feed was fetched and its items ingested.
    Ingested {
        /// Feed that was claimed.
        feed_id: i64,
        /// Ingestion counts.
        report: IngestReport,
    },
}

/// Feed poller.
pub struct Poller<F: FetchFeed> {
    db: Arc<Database>,
    fetcher: F,
    interval: Duration,
    max_items: usize,
}

impl Poller<FeedFetcher> {
    /// Create a poller with an HTTP fetcher built from aggregator settings.
    pub fn from_config(
        db: Arc<Database>,
        config: &AggregatorConfig,
        interval: Duration,
    ) -> Result<Self> {
        let fetcher = FeedFetcher::new(config)?;
        Ok(Self::new(db, fetcher, interval, config.max_items_per_cycle))
    }
}

impl<F: FetchFeed> Poller<F> {
    /// Create a poller.
    pub fn new(db: Arc<Database>, fetcher: F, interval: Duration, max_items: usize) -> Self {
        Self {
            db,
            fetcher,
            interval,
            max_items,
        }
    }

    /// Time between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one fetch cycle.
    ///
    /// Failures are logged with the feed they concern and returned. The
    /// claimed feed keeps its new `last_fetched_at` either way.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let repo = FeedRepository::new(self.db.pool());
        let feed = match repo.claim_next(Utc::now()).await {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                debug!("No feeds to fetch");
                return Ok(TickOutcome::Idle);
            }
            Err(e) => {
                warn!(error = %e, "Failed to claim next feed");
                return Err(e);
            }
        };

        match self.update_feed(&feed).await {
            Ok(report) => Ok(TickOutcome::Ingested {
                feed_id: feed.id,
                report,
            }),
            Err(e) => {
                warn!(feed_id = feed.id, url = %feed.url, error = %e, "Failed to update feed");
                Err(e)
            }
        }
    }

    async fn update_feed(&self, feed: &Feed) -> Result<IngestReport> {
        debug!(feed_id = feed.id, url = %feed.url, "Fetching feed");
        let body = self.fetcher.fetch(&feed.url).await?;
        let parsed = parse_feed(&body)?;
        Ingestor::new(&self.db, self.max_items)
            .ingest(feed, parsed)
            .await
    }

    /// Run the poller until `shutdown` becomes true or its sender is dropped.
    ///
    /// The first tick fires immediately. A tick in progress is abandoned
    /// when shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Collecting feeds every {:?}", self.interval);

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }

            tokio::select! {
                _ = self.tick() => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!("Feed poller stopped");
    }

    /// Run exactly `ticks` cycles on the poller's timer and return their results.
    pub async fn run_ticks(&self, ticks: usize) -> Vec<Result<TickOutcome>> {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut results = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            timer.tick().await;
            results.push(self.tick().await);
        }
        results
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // An error means the sender is gone, which also ends the loop.
    let _ = shutdown.wait_for(|stop| *stop).await;
}
