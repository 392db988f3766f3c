use core::{future::Future, time::Duration};
use std::sync::Arc;

use anyhow::Error;
use tokio::task::JoinSet;

use crate::{cfg::LoadSpec, shaper::RateLimiter, shutdown::Shutdown, stat::Stat};

use self::coro::ShapedCoroWorker;

mod coro;
pub mod udp;

/// Task unit.
pub trait Task {
    /// Executes this task once, returning the number of bytes sent.
    fn execute(&mut self) -> impl Future<Output = Result<u64, Error>> + Send;
}

/// Rate-limited dispatcher.
///
/// Spawns exactly `parallelism` workers sharing a single [`RateLimiter`], so
/// adding workers increases readiness to consume tokens, but never the
/// aggregate rate.
#[derive(Debug)]
pub struct Loader<F> {
    spec: LoadSpec,
    limiter: Arc<RateLimiter>,
    stat: Arc<Stat>,
    /// Creates per-worker tasks, given the worker index.
    factory: F,
}

impl<F> Loader<F> {
    pub fn new(spec: LoadSpec, factory: F) -> Self {
        let limiter = Arc::new(RateLimiter::new(spec.rate()));
        let stat = Arc::new(Stat::default());

        Self { spec, limiter, stat, factory }
    }

    #[inline]
    pub fn stat(&self) -> Arc<Stat> {
        self.stat.clone()
    }
}

impl<F, T> Loader<F>
where
    F: FnMut(usize) -> T,
    T: Task + Send + 'static,
{
    /// Spawns workers onto the current runtime.
    ///
    /// Workers run until the given [`Shutdown`] is cancelled.
    pub fn start(mut self, shutdown: &Shutdown) -> WorkerGroup {
        let num_workers = self.spec.parallelism().get();
        let mut jobs = JoinSet::new();

        for idx in 0..num_workers {
            let task = (self.factory)(idx);
            let worker = ShapedCoroWorker::new(
                idx,
                task,
                self.limiter.clone(),
                self.stat.clone(),
                shutdown.subscribe(),
            );

            jobs.spawn(worker.run());
        }

        log::debug!("spawned {num_workers} workers at {} rps", self.limiter.rate());

        WorkerGroup { jobs }
    }
}

/// Handle to running workers.
#[derive(Debug)]
pub struct WorkerGroup {
    jobs: JoinSet<()>,
}

impl WorkerGroup {
    /// Waits for workers to stop after cancellation.
    ///
    /// Workers still busy after the given timeout are aborted together with
    /// their in-flight work. Returns the number of aborted workers.
    pub async fn join(mut self, timeout: Duration) -> usize {
        let drain = async {
            while let Some(rc) = self.jobs.join_next().await {
                if let Err(err) = rc {
                    log::error!("worker failed: {err}");
                }
            }
        };
        let rc = tokio::time::timeout(timeout, drain).await;

        match rc {
            Ok(()) => 0,
            Err(..) => {
                let num_aborted = self.jobs.len();
                self.jobs.abort_all();
                num_aborted
            }
        }
    }
}
