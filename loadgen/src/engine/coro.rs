use std::sync::Arc;

use super::Task;
use crate::{
    shaper::{RateLimitError, RateLimiter},
    shutdown::ShutdownRx,
    stat::Stat,
};

/// Shaped per-task worker.
///
/// This worker waits for a token from the shared [`RateLimiter`] and executes
/// the given task once per token, until shutdown.
#[derive(Debug)]
pub struct ShapedCoroWorker<T> {
    idx: usize,
    /// Per-worker job.
    task: T,
    /// The shaper, shared between all workers.
    limiter: Arc<RateLimiter>,
    /// Runtime statistics.
    stat: Arc<Stat>,
    shutdown: ShutdownRx,
}

impl<T> ShapedCoroWorker<T> {
    pub fn new(idx: usize, task: T, limiter: Arc<RateLimiter>, stat: Arc<Stat>, shutdown: ShutdownRx) -> Self {
        Self { idx, task, limiter, stat, shutdown }
    }
}

impl<T> ShapedCoroWorker<T>
where
    T: Task,
{
    pub async fn run(mut self) {
        loop {
            match self.limiter.acquire(&mut self.shutdown).await {
                Ok(()) => {}
                Err(RateLimitError::Cancelled) => break,
            }

            match self.task.execute().await {
                Ok(n) => self.stat.on_send(n),
                Err(err) => {
                    log::trace!("worker #{}: {err}", self.idx);
                    self.stat.on_failure();
                }
            }

            self.stat.on_requests(1);
        }

        log::trace!("worker #{} stopped", self.idx);
    }
}
