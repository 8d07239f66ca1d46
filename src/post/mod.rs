//! Post module for gator.
//!
//! Posts are feed items stored once per URL.

mod repository;
mod types;

pub use repository::PostRepository;
pub use types::{NewPost, Post, PostWithFeed};
