//! Background match task: one blocking-pool task per run.
//!
//! The caller gets a `MatchHandle`: a cancel flag plus a channel delivering
//! `Progress` events in increasing order followed by exactly one `Completed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::MatchError;
use super::runner::run_match;
use super::types::{MatchRequest, MatchRun, RunId};
use crate::genes::GeneLookup;

/// Events emitted by a running match task.
#[derive(Debug)]
pub enum MatchEvent {
    Progress {
        run_id: RunId,
        completed: usize,
        total: usize,
    },
    Completed {
        run_id: RunId,
        outcome: Result<MatchRun, MatchError>,
    },
}

impl MatchEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Progress { run_id, .. } | Self::Completed { run_id, .. } => *run_id,
        }
    }
}

/// Cancellation flag shared with a running task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Handle to a spawned match run.
#[derive(Debug)]
pub struct MatchHandle {
    run_id: RunId,
    cancel: CancelToken,
    events: mpsc::UnboundedReceiver<MatchEvent>,
    task: JoinHandle<()>,
}

impl MatchHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ask the task to stop before its next lookup.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event, or `None` once the task has finished and all events were read.
    pub async fn next_event(&mut self) -> Option<MatchEvent> {
        self.events.recv().await
    }

    /// Drain progress events and return the run outcome.
    pub async fn wait(mut self) -> Result<MatchRun, MatchError> {
        while let Some(event) = self.events.recv().await {
            if let MatchEvent::Completed { outcome, .. } = event {
                return outcome;
            }
        }
        match (&mut self.task).await {
            Err(e) => Err(MatchError::Task(e.to_string())),
            Ok(()) => Err(MatchError::Task("task ended without a result".into())),
        }
    }
}

/// Start a match run on the blocking thread pool.
///
/// Must be called from within a tokio runtime.
pub fn spawn_match(lookup: Arc<dyn GeneLookup>, request: MatchRequest) -> MatchHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::default();
    let run_id = request.run_id;

    let flag = cancel.clone();
    let task = tokio::task::spawn_blocking(move || {
        let progress_tx = tx.clone();
        let progress = move |completed: usize, total: usize| {
            // Receiver gone means nobody is listening any more.
            let _ = progress_tx.send(MatchEvent::Progress {
                run_id,
                completed,
                total,
            });
        };

        let outcome = run_match(lookup.as_ref(), &request, Some(&progress), &flag.0);
        if let Err(e) = &outcome {
            tracing::debug!(run_id = %run_id, error = %e, "Gene match run ended without result");
        }
        let _ = tx.send(MatchEvent::Completed { run_id, outcome });
    });

    MatchHandle {
        run_id,
        cancel,
        events: rx,
        task,
    }
}
