//! Batch orchestration.
//!
//! Drives each work item through the fixed pipeline: acquire, rewrite,
//! scrub, rename, publish, release. Item failures are isolated (one bad
//! repository never stops the rest), cleanup always runs, and the report
//! preserves submission order regardless of worker interleaving.
//!
//! `git2::Repository` is not `Send`, so parallel runs hand out item
//! *indices* over a channel and each worker owns every handle it opens.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{Destination, WorkItem};
use crate::error::{Error, ErrorKind};
use crate::events::{EventKind, EventSink, ProgressEvent, TracingSink};
use crate::timeline;
use crate::workdir::WorkingCopy;
use crate::{publish, refs, rewrite, scrub};

/// Pipeline steps in execution order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Acquire,
    Rewrite,
    Scrub,
    Rename,
    Publish,
    Release,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Acquire => "acquire",
            Step::Rewrite => "rewrite",
            Step::Scrub => "scrub",
            Step::Rename => "rename",
            Step::Publish => "publish",
            Step::Release => "release",
        }
    }
}

/// Why an item failed, reduced to what a report consumer needs.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// The step that did not finish.
    pub step: Step,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one work item, including partial credit: `completed`
/// lists the steps that finished before any failure.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub source: String,
    pub succeeded: bool,
    pub completed: Vec<Step>,
    pub failure: Option<Failure>,
}

/// Results for every submitted item, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// `Err(Error::BatchFailed)` when any item failed, for exit codes.
    pub fn into_result(self) -> crate::Result<BatchReport> {
        let failed = self.failed();
        if failed > 0 {
            Err(Error::BatchFailed {
                failed,
                total: self.items.len(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Cooperative cancellation flag shared between the orchestrator and
/// its callers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Drives work items through the pipeline.
pub struct Orchestrator {
    sink: Arc<dyn EventSink>,
    cancel: CancelToken,
    scratch_root: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            cancel: CancelToken::default(),
            scratch_root: None,
        }
    }

    /// Confine every working copy to `root` instead of the system temp
    /// directory.
    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation after `timeout`.
    ///
    /// Cancellation is cooperative: the token is only consulted between
    /// pipeline steps, so a step that is already underway (including a
    /// hung clone or push) runs to completion before the item is marked
    /// cancelled. The timer thread is detached and may outlive the
    /// batch; firing after completion is a no-op on the shared token.
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(timeout);
            token.cancel();
        });
    }

    /// Run every item, with `workers` parallel lanes when above one.
    ///
    /// The report always holds one entry per item, in submission order.
    pub fn run(&self, items: &[WorkItem], workers: usize) -> BatchReport {
        if items.is_empty() {
            return BatchReport { items: Vec::new() };
        }
        if workers <= 1 || items.len() == 1 {
            let results = items
                .iter()
                .enumerate()
                .map(|(index, item)| self.process_item(index, item))
                .collect();
            return BatchReport { items: results };
        }

        let lanes = workers.min(items.len());
        let (work_tx, work_rx) = crossbeam::channel::unbounded::<usize>();
        let (done_tx, done_rx) = crossbeam::channel::unbounded::<(usize, ItemResult)>();
        for index in 0..items.len() {
            let _ = work_tx.send(index);
        }
        drop(work_tx);

        std::thread::scope(|scope| {
            for _ in 0..lanes {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for index in work_rx.iter() {
                        let result = self.process_item(index, &items[index]);
                        let _ = done_tx.send((index, result));
                    }
                });
            }
        });
        drop(done_tx);

        let mut slots: Vec<Option<ItemResult>> = (0..items.len()).map(|_| None).collect();
        for (index, result) in done_rx.iter() {
            slots[index] = Some(result);
        }
        let results = slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| {
                slot.unwrap_or_else(|| ItemResult {
                    source: item.source.clone(),
                    succeeded: false,
                    completed: Vec::new(),
                    failure: Some(Failure {
                        step: Step::Acquire,
                        kind: ErrorKind::Batch,
                        message: "worker terminated before reporting".to_string(),
                    }),
                })
            })
            .collect();
        BatchReport { items: results }
    }

    /// Human-readable plan for one item without touching anything.
    pub fn preview(item: &WorkItem, index: usize) -> String {
        let mut lines = vec![format!("source: {}", item.source)];
        match &item.identity {
            Some(id) => lines.push(format!("identity: {id}")),
            None => lines.push("identity: unchanged".to_string()),
        }
        match &item.randomize {
            Some(interval) => lines.push(format!("dates: randomized within {interval}")),
            None => lines.push("dates: unchanged".to_string()),
        }
        match &item.scrub {
            Some(spec) => lines.push(format!(
                "scrub: {} pattern(s), replacement {:?}",
                spec.patterns.len(),
                spec.replacement
            )),
            None => lines.push("scrub: none".to_string()),
        }
        for (old, new) in &item.renames {
            lines.push(format!("rename: {old} -> {new}"));
        }
        match &item.destination {
            Destination::None => lines.push("destination: none (dry run)".to_string()),
            Destination::Url(url) => lines.push(format!("destination: {url}")),
            Destination::Provision {
                name_template,
                private,
                ..
            } => lines.push(format!(
                "destination: provision {:?} ({})",
                destination_name(name_template, &item.source, index),
                if *private { "private" } else { "public" },
            )),
        }
        lines.join("\n")
    }

    fn process_item(&self, index: usize, item: &WorkItem) -> ItemResult {
        let mut completed = Vec::new();

        if self.cancel.is_cancelled() {
            return self.fail(item, completed, Error::Cancelled);
        }

        tracing::info!(source = %item.source, "processing work item");
        let copy = match self.acquire(item) {
            Ok(copy) => copy,
            Err(err) => return self.fail(item, completed, err),
        };
        completed.push(Step::Acquire);

        let outcome = self.run_steps(index, item, &copy, &mut completed);

        // Release always runs, success or not.
        self.emit(item, EventKind::Cleanup, "removing working copy");
        drop(copy);
        completed.push(Step::Release);

        match outcome {
            Ok(()) => ItemResult {
                source: item.source.clone(),
                succeeded: true,
                completed,
                failure: None,
            },
            Err(err) => self.fail(item, completed, err),
        }
    }

    fn acquire(&self, item: &WorkItem) -> crate::Result<WorkingCopy> {
        self.emit(item, EventKind::Clone, "cloning working copy");
        let copy = match &self.scratch_root {
            Some(root) => WorkingCopy::acquire_in(&item.source, root)?,
            None => WorkingCopy::acquire(&item.source)?,
        };
        Ok(copy)
    }

    fn run_steps(
        &self,
        index: usize,
        item: &WorkItem,
        copy: &WorkingCopy,
        completed: &mut Vec<Step>,
    ) -> crate::Result<()> {
        self.check_cancel()?;
        if item.identity.is_some() || item.randomize.is_some() {
            let timestamps = match &item.randomize {
                Some(interval) => {
                    let count = rewrite::count_commits(copy.repo())?;
                    Some(timeline::generate(count, *interval, &mut rand::thread_rng())?)
                }
                None => None,
            };
            let outcome = rewrite::rewrite_history(
                copy.repo(),
                item.identity.as_ref(),
                timestamps.as_deref(),
            )?;
            self.emit(
                item,
                EventKind::Rewrite,
                &format!(
                    "rewrote {} commit(s), moved {} ref(s)",
                    outcome.commits, outcome.refs_updated
                ),
            );
        }
        completed.push(Step::Rewrite);

        self.check_cancel()?;
        if let Some(spec) = &item.scrub {
            let modified = scrub::scrub_and_commit(copy.repo(), spec, item.identity.as_ref())?;
            self.emit(
                item,
                EventKind::Scrub,
                &format!("scrubbed {modified} file(s)"),
            );
        }
        completed.push(Step::Scrub);

        self.check_cancel()?;
        for (old, new) in &item.renames {
            refs::rename_branch(copy.repo(), old, new)?;
            self.emit(item, EventKind::Rename, &format!("{old} -> {new}"));
        }
        completed.push(Step::Rename);

        self.check_cancel()?;
        match &item.destination {
            Destination::None => {}
            Destination::Url(url) => {
                refs::configure_origin(copy.repo(), url)?;
                let branch = publish::push_current_branch(copy.repo())?;
                self.emit(item, EventKind::Publish, &format!("pushed {branch} to {url}"));
            }
            Destination::Provision {
                token,
                name_template,
                private,
            } => {
                let name = destination_name(name_template, &item.source, index);
                let provisioned = publish::provision_repository(token, &name, *private)?;
                refs::configure_origin(copy.repo(), &provisioned.ssh_url)?;
                let branch = publish::push_current_branch(copy.repo())?;
                self.emit(
                    item,
                    EventKind::Publish,
                    &format!("pushed {branch} to {}", provisioned.html_url),
                );
            }
        }
        completed.push(Step::Publish);

        Ok(())
    }

    fn check_cancel(&self) -> crate::Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    fn fail(&self, item: &WorkItem, completed: Vec<Step>, err: Error) -> ItemResult {
        self.emit(item, EventKind::Error, &err.to_string());
        tracing::warn!(source = %item.source, error = %err, "work item failed");
        // The failed step is the first pipeline step that never finished.
        let step = [
            Step::Acquire,
            Step::Rewrite,
            Step::Scrub,
            Step::Rename,
            Step::Publish,
        ]
        .into_iter()
        .find(|s| !completed.contains(s))
        .unwrap_or(Step::Release);
        ItemResult {
            source: item.source.clone(),
            succeeded: false,
            completed,
            failure: Some(Failure {
                step,
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }

    fn emit(&self, item: &WorkItem, kind: EventKind, detail: &str) {
        self.sink.emit(ProgressEvent {
            source: item.source.clone(),
            kind,
            detail: detail.to_string(),
        });
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Last path segment of the source locator, without any `.git` suffix.
pub fn repo_name(source: &str) -> String {
    let trimmed = source.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.trim_end_matches(".git").to_string()
}

/// Expand a destination name template. `{repo}` is the source repository
/// name, `{index}` the 1-based position in the batch.
fn destination_name(template: &str, source: &str, index: usize) -> String {
    template
        .replace("{repo}", &repo_name(source))
        .replace("{index}", &(index + 1).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::DateInterval;

    #[test]
    fn repo_name_strips_suffix_and_path() {
        assert_eq!(repo_name("https://example.com/org/project.git"), "project");
        assert_eq!(repo_name("git@example.com:org/project.git"), "project");
        assert_eq!(repo_name("/srv/repos/project/"), "project");
        assert_eq!(repo_name("project"), "project");
    }

    #[test]
    fn destination_name_expands_placeholders() {
        assert_eq!(
            destination_name("{repo}-mirror-{index}", "a/b/thing.git", 2),
            "thing-mirror-3"
        );
        assert_eq!(destination_name("fixed", "thing", 0), "fixed");
    }

    #[test]
    fn preview_reports_plan_without_side_effects() {
        let mut item = WorkItem::new("https://example.com/org/project.git");
        item.randomize = Some(DateInterval::new(0, 100).unwrap());
        let plan = Orchestrator::preview(&item, 0);
        assert!(plan.contains("source: https://example.com/org/project.git"));
        assert!(plan.contains("dates: randomized"));
        assert!(plan.contains("destination: none"));
    }

    #[test]
    fn cancelled_token_fails_items_before_acquire() {
        let orchestrator = Orchestrator::new();
        orchestrator.cancel_token().cancel();
        let items = vec![WorkItem::new("https://invalid.invalid/never-cloned.git")];
        let report = orchestrator.run(&items, 1);
        assert_eq!(report.items.len(), 1);
        let result = &report.items[0];
        assert!(!result.succeeded);
        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.kind, ErrorKind::Cancelled);
        assert_eq!(failure.step, Step::Acquire);
        assert!(result.completed.is_empty());
    }

    #[test]
    fn empty_batch_yields_empty_report() {
        let report = Orchestrator::new().run(&[], 4);
        assert!(report.items.is_empty());
        assert_eq!(report.failed(), 0);
        assert!(report.into_result().is_ok());
    }
}
