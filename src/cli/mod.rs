//! Command-line interface for gator.

mod commands;

pub use commands::{execute, Context};

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gator - a command-line RSS aggregator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "gator.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a user and make it the current user
    Register {
        /// User name
        name: String,
    },
    /// Switch to an existing user
    Login {
        /// User name
        name: String,
    },
    /// List all users
    Users,
    /// Delete all users, feeds, follows and posts
    Reset,
    /// Register a feed and follow it as the current user
    Addfeed {
        /// Display name for the feed
        name: String,
        /// Feed URL
        url: String,
    },
    /// List all registered feeds
    Feeds,
    /// Follow a registered feed
    Follow {
        /// Feed URL
        url: String,
    },
    /// Stop following a feed
    Unfollow {
        /// Feed URL
        url: String,
    },
    /// List the feeds the current user follows
    Following,
    /// Show the newest posts from followed feeds
    Browse {
        /// Number of posts to show
        #[arg(default_value_t = 2)]
        limit: i64,
    },
    /// Poll feeds continuously at the given interval (e.g. "1m", "30s")
    Agg {
        /// Time between fetches
        interval: String,
    },
}
