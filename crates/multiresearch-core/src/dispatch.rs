//! Fan-out dispatcher: a bounded worker pool over a fixed task set.

use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::ResearcherError;
use crate::transcript::Transcript;

/// One unit of research work, created once per run and never persisted.
#[derive(Debug, Clone)]
pub struct ResearchTask {
    pub model: String,
    pub agent_index: u32,
    pub query: String,
}

/// Run every task on a worker pool bounded by `max_workers` and wait for all
/// of them, collecting `(agent_index, outcome)` pairs in completion order.
///
/// The pool size is a constant upper bound independent of the task count. A
/// unit that fails does not cancel its siblings; they run to completion and
/// the caller decides what to do with the collected outcomes after the join
/// barrier.
#[instrument(skip(tasks, run), fields(task_count = tasks.len()))]
pub async fn dispatch_research<F, Fut>(
    tasks: Vec<ResearchTask>,
    max_workers: usize,
    run: F,
) -> Result<Vec<(u32, Result<Transcript, ResearcherError>)>, ResearcherError>
where
    F: Fn(ResearchTask) -> Fut,
    Fut: Future<Output = Result<Transcript, ResearcherError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut workers = JoinSet::new();

    for task in tasks {
        let index = task.agent_index;
        let semaphore = semaphore.clone();
        let unit = run(task);
        workers.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => return (index, Err(anyhow!("worker pool closed: {err}").into())),
            };
            (index, unit.await)
        });
    }

    let mut results = Vec::with_capacity(workers.len());
    while let Some(joined) = workers.join_next().await {
        let (index, outcome) =
            joined.map_err(|err| anyhow!("research task aborted: {err}"))?;
        debug!(agent_index = index, ok = outcome.is_ok(), "research unit finished");
        results.push((index, outcome));
    }

    Ok(results)
}
