//! Batch rewriting and republishing of git repository history.
//!
//! The pipeline for each repository: clone an ephemeral working copy,
//! rewrite identity and timestamps across all branches, scrub content,
//! rename branches, push to a destination, and always clean up. The
//! [`batch::Orchestrator`] drives any number of repositories through it
//! with isolated failures and an injectable progress [`events::EventSink`].

#![forbid(unsafe_code)]

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod publish;
pub mod refs;
pub mod rewrite;
pub mod scrub;
pub mod telemetry;
pub mod test_harness;
pub mod timeline;
pub mod workdir;

pub use error::{Error, ErrorKind};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the types a front end needs at the crate root.
pub use batch::{BatchReport, Failure, ItemResult, Orchestrator, Step};
pub use config::{Destination, Identity, ScrubSpec, WorkItem};
pub use events::{ChannelSink, EventKind, EventSink, ProgressEvent, TracingSink};
pub use timeline::DateInterval;
