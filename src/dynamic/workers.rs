use std::{collections::HashSet, fmt::Debug, future::Future, panic};

use tokio::task::{Id, JoinError, JoinSet};
use tracing::Instrument;

/// Every worker started during one demux run.
///
/// Workers are never cancelled by the router; they stop when their lane closes. A worker panic is re-raised on the
/// router as soon as it is observed.
pub(crate) struct Workers {
    tasks: JoinSet<()>,
    running: HashSet<Id>,
    spawned: usize,
}

impl Workers {
    pub(crate) fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            running: HashSet::new(),
            spawned: 0,
        }
    }

    /// Starts `worker` as the consumer for `key` and returns its task id.
    pub(crate) fn spawn<K, F>(&mut self, key: &K, worker: F) -> Id
    where
        K: Debug,
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self
            .tasks
            .spawn(worker.instrument(tracing::debug_span!("demux_worker", key = ?key)))
            .id();
        self.running.insert(id);
        self.spawned += 1;
        id
    }

    /// Total number of workers started so far, including those that already finished.
    pub(crate) fn spawned(&self) -> usize {
        self.spawned
    }

    /// Collects workers that have already finished without waiting for the rest.
    pub(crate) fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next_with_id() {
            self.settle(result);
        }
    }

    /// Waits until the worker `id` has finished, collecting any other worker that finishes first.
    ///
    /// Used once a worker stopped receiving: a panic it raised surfaces here instead of at the final join.
    pub(crate) async fn wait_for(&mut self, id: Id) {
        while self.running.contains(&id) {
            match self.tasks.join_next_with_id().await {
                Some(result) => self.settle(result),
                None => break,
            }
        }
    }

    /// Waits for every remaining worker to finish.
    pub(crate) async fn join_all(mut self) {
        while let Some(result) = self.tasks.join_next_with_id().await {
            self.settle(result);
        }
    }

    fn settle(&mut self, result: Result<(Id, ()), JoinError>) {
        match result {
            Ok((id, ())) => {
                self.running.remove(&id);
            }
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(err) => {
                self.running.remove(&err.id());
                tracing::debug!(error = %err, "worker cancelled");
            }
        }
    }
}
