//! Error types for gator.

use thiserror::Error;

/// Common error type for gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Any storage failure that is not a uniqueness violation.
    #[error("database error: {0}")]
    Database(String),

    /// A record with the same unique key already exists.
    ///
    /// Produced by inserts that hit a UNIQUE constraint (post URL, feed URL,
    /// user name, feed follow). Ingestion treats this as "already known".
    #[error("{0} already exists")]
    Duplicate(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error (config file, poll interval, missing session).
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-level failure while fetching a feed (DNS, connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The feed server answered with a non-success status.
    #[error("HTTP error {status} for {url}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The feed body exceeded the configured size limit.
    #[error("feed too large: {size} bytes (max {max} bytes)")]
    FeedTooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Configured limit in bytes.
        max: u64,
    },

    /// The fetched document is not a parseable feed.
    #[error("feed parse error: {0}")]
    Parse(String),
}

impl GatorError {
    /// Returns true if this error is a uniqueness violation.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, GatorError::Duplicate(_))
    }

    /// Map an insert error, naming the conflicting record on a unique violation.
    pub fn from_insert(e: sqlx::Error, what: impl std::fmt::Display) -> Self {
        if is_unique_violation(&e) {
            GatorError::Duplicate(what.to_string())
        } else {
            GatorError::Database(e.to_string())
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation(&e) {
            GatorError::Duplicate(e.to_string())
        } else {
            GatorError::Database(e.to_string())
        }
    }
}

/// Result type alias for gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_error_display() {
        let err = GatorError::Duplicate("post https://example.com/a".to_string());
        assert_eq!(err.to_string(), "post https://example.com/a already exists");
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_http_status_display() {
        let err = GatorError::HttpStatus {
            status: 404,
            url: "https://example.com/feed.xml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error 404 for https://example.com/feed.xml"
        );
        assert!(!err.is_duplicate());
    }

    #[test]
    fn test_feed_too_large_display() {
        let err = GatorError::FeedTooLarge { size: 11, max: 10 };
        assert_eq!(err.to_string(), "feed too large: 11 bytes (max 10 bytes)");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = GatorError::NotFound("user".to_string());
        assert_eq!(err.to_string(), "user not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GatorError = io_err.into();
        assert!(matches!(err, GatorError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_non_database_error_is_not_duplicate() {
        let err = GatorError::from_insert(sqlx::Error::RowNotFound, "post");
        assert!(matches!(err, GatorError::Database(_)));
    }
}
