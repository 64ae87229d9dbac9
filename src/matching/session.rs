//! MatchSession: owns the last valid `MatchRun` and the identity of the
//! run it is waiting for.
//!
//! Starting a run cancels the previous one. Events from any run other than
//! the latest are reported as `Applied::Stale` and change nothing. A failed
//! lookup leaves the previous result in place; input without genes clears it.

use std::sync::Arc;

use super::error::MatchError;
use super::task::{spawn_match, CancelToken, MatchEvent, MatchHandle};
use super::types::{MatchRequest, MatchRun, RunId};
use crate::genes::GeneLookup;

/// What applying an event did to the session.
#[derive(Debug)]
pub enum Applied {
    Progress { completed: usize, total: usize },
    Completed,
    Failed(MatchError),
    Stale,
}

struct ActiveRun {
    run_id: RunId,
    cancel: CancelToken,
    completed: usize,
    total: usize,
}

pub struct MatchSession {
    lookup: Arc<dyn GeneLookup>,
    active: Option<ActiveRun>,
    current: Option<MatchRun>,
}

impl MatchSession {
    pub fn new(lookup: Arc<dyn GeneLookup>) -> Self {
        Self {
            lookup,
            active: None,
            current: None,
        }
    }

    pub fn lookup(&self) -> &dyn GeneLookup {
        self.lookup.as_ref()
    }

    /// The last successfully completed run.
    pub fn current(&self) -> Option<&MatchRun> {
        self.current.as_ref()
    }

    /// Run the session is waiting for, if any.
    pub fn active_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|a| a.run_id)
    }

    /// `(completed, total)` of the active run.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.active.as_ref().map(|a| (a.completed, a.total))
    }

    /// Start matching, superseding any run still in flight.
    ///
    /// With no identifiers nothing is spawned, the current run is dropped
    /// (it described other input) and `ExtractionEmpty` is returned. Must be
    /// called from within a tokio runtime.
    pub fn start(&mut self, organism: &str, identifiers: Vec<String>) -> Result<MatchHandle, MatchError> {
        self.cancel();
        if identifiers.is_empty() {
            self.current = None;
            return Err(MatchError::ExtractionEmpty);
        }

        let request = MatchRequest::new(organism, identifiers);
        let total = request.identifiers.len();
        let handle = spawn_match(self.lookup.clone(), request);

        tracing::debug!(run_id = %handle.run_id(), organism, total, "Match run queued");
        self.active = Some(ActiveRun {
            run_id: handle.run_id(),
            cancel: handle.cancel_token(),
            completed: 0,
            total,
        });
        Ok(handle)
    }

    /// Cancel the active run, if any. Its later events will be stale.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(run_id = %active.run_id, "Superseding match run");
            active.cancel.cancel();
        }
    }

    /// Apply an event from a match task, ignoring events of superseded runs.
    pub fn apply(&mut self, event: MatchEvent) -> Applied {
        let Some(active) = self.active.as_mut() else {
            return Applied::Stale;
        };
        if active.run_id != event.run_id() {
            tracing::debug!(run_id = %event.run_id(), "Dropping event from superseded match run");
            return Applied::Stale;
        }

        match event {
            MatchEvent::Progress {
                completed, total, ..
            } => {
                active.completed = completed;
                active.total = total;
                Applied::Progress { completed, total }
            }
            MatchEvent::Completed { outcome, .. } => {
                self.active = None;
                match outcome {
                    Ok(run) => {
                        self.current = Some(run);
                        Applied::Completed
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Match run failed, keeping previous results");
                        Applied::Failed(e)
                    }
                }
            }
        }
    }

    /// Apply every event of `handle` until its completion.
    pub async fn drive(&mut self, mut handle: MatchHandle) -> Applied {
        let mut last = Applied::Stale;
        while let Some(event) = handle.next_event().await {
            let done = matches!(event, MatchEvent::Completed { .. });
            last = self.apply(event);
            if done {
                break;
            }
        }
        last
    }
}
