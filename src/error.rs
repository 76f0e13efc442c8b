use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, ValidationError};
use crate::publish::PublishError;
use crate::refs::RefError;
use crate::rewrite::RewriteError;
use crate::scrub::ScrubError;
use crate::timeline::TimelineError;
use crate::workdir::AcquireError;

/// Crate-level convenience error.
///
/// Not a "god error": a thin wrapper over the per-module errors, so the
/// root-cause diagnostic always survives verbatim into reports and logs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Scrub(#[from] ScrubError),

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("cancelled before completion")]
    Cancelled,

    #[error("{failed} of {total} repositories failed")]
    BatchFailed { failed: usize, total: usize },
}

impl Error {
    /// Which failure domain this error belongs to.
    ///
    /// Reports carry the kind next to the verbatim message so a front end
    /// can group failures without parsing text.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Acquire(_) => ErrorKind::Acquisition,
            Error::Validation(_) | Error::Config(_) | Error::Timeline(_) => ErrorKind::Validation,
            Error::Rewrite(_) => ErrorKind::Rewrite,
            Error::Scrub(_) => ErrorKind::Scrub,
            Error::Ref(_) => ErrorKind::Ref,
            Error::Publish(_) => ErrorKind::Publish,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::BatchFailed { .. } => ErrorKind::Batch,
        }
    }
}

/// Failure domain of an [`Error`], as recorded in batch reports.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Clone/open failure. Fatal for the one work item only.
    Acquisition,
    /// Rejected before any mutation, so no partial state exists.
    Validation,
    /// The history rewrite reported a failure. No automatic rollback.
    Rewrite,
    /// Content scrubbing or the scrub commit failed.
    Scrub,
    /// Branch rename or remote configuration failed.
    Ref,
    /// Provisioning or push failed.
    Publish,
    /// The batch was cancelled before this item finished.
    Cancelled,
    /// Aggregate batch failure (CLI exit path, never per-item).
    Batch,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Acquisition => "acquisition",
            ErrorKind::Validation => "validation",
            ErrorKind::Rewrite => "rewrite",
            ErrorKind::Scrub => "scrub",
            ErrorKind::Ref => "ref",
            ErrorKind::Publish => "publish",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Batch => "batch",
        }
    }
}
