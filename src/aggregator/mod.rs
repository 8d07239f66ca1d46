//! Feed aggregation for gator.
//!
//! The poller drives fetch cycles on a fixed interval, the ingestor turns
//! each parsed document into posts.

mod ingest;
mod interval;
mod poller;

pub use ingest::{IngestReport, Ingestor};
pub use interval::parse_interval;
pub use poller::{Poller, TickOutcome};
