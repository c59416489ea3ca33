//! Bounded fan-out: run independent async tasks with a cap on how many are in
//! flight, and collect every task's settled result in submission order.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task cancelled")]
    Cancelled,
}

/// Spawn one task per input; at most `limit` (min 1) run concurrently.
///
/// A panicking task settles as `Err(TaskFailure::Panicked)` and never affects
/// its siblings.
pub async fn run_bounded<T, F, Fut>(
    inputs: Vec<T>,
    limit: usize,
    task: F,
) -> Vec<Result<Fut::Output, TaskFailure>>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let task = Arc::new(task);

    let handles: Vec<_> = inputs
        .into_iter()
        .map(|input| {
            let semaphore = Arc::clone(&semaphore);
            let task = Arc::clone(&task);
            tokio::spawn(async move {
                // The semaphore is never closed, so acquire only fails after a drop.
                let _permit = semaphore.acquire_owned().await.ok();
                task(input).await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.map_err(|e| {
            if e.is_panic() {
                TaskFailure::Panicked(e.to_string())
            } else {
                TaskFailure::Cancelled
            }
        }));
    }
    results
}
