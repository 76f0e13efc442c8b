//! Progress events.
//!
//! The core reports progress as discrete named events, not raw log lines,
//! so any front end (CLI, desktop, test harness) can subscribe without
//! screen-scraping. Sinks are injected; there is no process-wide
//! singleton.

use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::Serialize;

/// The named operations a front end can render.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Clone,
    Rewrite,
    Scrub,
    Rename,
    Publish,
    Cleanup,
    Error,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Clone => "CLONE",
            EventKind::Rewrite => "REWRITE",
            EventKind::Scrub => "SCRUB",
            EventKind::Rename => "RENAME",
            EventKind::Publish => "PUBLISH",
            EventKind::Cleanup => "CLEANUP",
            EventKind::Error => "ERROR",
        }
    }
}

/// One progress event for one work item.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Source locator of the repository the event belongs to.
    pub source: String,
    pub kind: EventKind,
    pub detail: String,
}

/// Injectable event consumer.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Default sink: structured tracing events on the `reweave::events` target.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        // Every kind carries the same `event` field so subscribers can
        // filter on it uniformly.
        match event.kind {
            EventKind::Error => {
                tracing::error!(
                    target: "reweave::events",
                    source = %event.source,
                    event = event.kind.as_str(),
                    "{}",
                    event.detail
                );
            }
            kind => {
                tracing::info!(
                    target: "reweave::events",
                    source = %event.source,
                    event = kind.as_str(),
                    "{}",
                    event.detail
                );
            }
        }
    }
}

/// Sink that forwards events over a crossbeam channel.
///
/// What GUIs and tests subscribe with; a dropped receiver just discards
/// further events instead of failing the pipeline.
pub struct ChannelSink {
    tx: Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Fan out one event stream to several sinks.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}
