use core::{net::SocketAddr, time::Duration};
use std::sync::Arc;

use anyhow::Error;
use rand::{rngs::SmallRng, SeedableRng};
use tokio::{task::JoinHandle, time::Instant};

use crate::{
    api::{MetricsState, Server},
    cfg::Config,
    engine::{udp::IngestTask, Loader},
    ingest::StatsdEncoder,
    pool::StaticPool,
    report::Report,
    shutdown::{self, Shutdown},
    stat::Stat,
};

/// Maximum time spent establishing a single connection.
const DIAL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Runtime {
    cfg: Config,
}

impl Runtime {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// Generates load until an interrupt signal is received, then stops the
    /// workers and returns the throughput report.
    pub async fn run(self) -> Result<Report, Error> {
        let cfg = self.cfg;

        let pool = StaticPool::connect(cfg.conns, &cfg.hostport, DIAL_TIMEOUT).await?;
        let pool = Arc::new(pool);

        let loader = Loader::new(cfg.load, |_idx| {
            IngestTask::new(pool.clone(), &StatsdEncoder, &cfg.metric, SmallRng::from_os_rng())
        });
        let stat = loader.stat();

        let api = cfg
            .api
            .map(|addr| Self::run_api(addr, stat.clone(), cfg.load.rate(), pool.len()));

        let shutdown = Shutdown::new();
        let workers = loader.start(&shutdown);
        let start = Instant::now();
        log::info!("STARTING // requesting {} at {} qps", cfg.hostport, cfg.load.rate());

        shutdown::signal().await?;
        let elapsed = start.elapsed();

        shutdown.cancel();
        let num_aborted = workers.join(cfg.drain_timeout).await;
        if num_aborted > 0 {
            log::warn!("abandoned {num_aborted} workers with requests in flight");
        }

        if let Some(api) = api {
            api.abort();
        }

        Ok(Report::from_stat(&*stat, elapsed))
    }

    fn run_api(addr: SocketAddr, stat: Arc<Stat>, rate: u64, num_conns: usize) -> JoinHandle<()> {
        let state = Arc::new(MetricsState::new(stat, rate, num_conns));

        tokio::spawn(async move {
            let rc = match Server::bind(addr, state).await {
                Ok(server) => server.run().await,
                Err(err) => Err(err),
            };

            if let Err(err) = rc {
                log::error!("failed to run API server on {addr}: {err}");
            }
        })
    }
}
