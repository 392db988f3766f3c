use core::{error::Error, net::SocketAddr, num::NonZero, time::Duration};

use crate::{cmd::Cmd, ingest::Metric};

/// Workload shape.
///
/// Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSpec {
    /// Target rate, in requests per second.
    rate: u64,
    /// Number of workers.
    parallelism: NonZero<usize>,
}

impl LoadSpec {
    #[inline]
    pub const fn new(rate: u64, parallelism: NonZero<usize>) -> Self {
        Self { rate, parallelism }
    }

    #[inline]
    pub const fn rate(&self) -> u64 {
        self.rate
    }

    #[inline]
    pub const fn parallelism(&self) -> NonZero<usize> {
        self.parallelism
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub load: LoadSpec,
    /// Target endpoint, as "host:port".
    pub hostport: String,
    /// Connection pool size.
    pub conns: NonZero<usize>,
    /// Sample sent with each request.
    pub metric: Metric,
    /// Debug HTTP endpoint, if enabled.
    pub api: Option<SocketAddr>,
    /// Time given to workers to stop on shutdown.
    pub drain_timeout: Duration,
}

impl TryFrom<Cmd> for Config {
    type Error = Box<dyn Error>;

    fn try_from(cmd: Cmd) -> Result<Self, Self::Error> {
        let Cmd {
            qps,
            hostport,
            parallelism,
            conns,
            sample,
            api,
            no_api,
            drain_timeout,
            ..
        } = cmd;

        if hostport.is_empty() {
            return Err("target endpoint must not be empty".into());
        }

        let metric = match sample {
            Some(path) => {
                Metric::load(&path).map_err(|err| format!("failed to load sample from {}: {err}", path.display()))?
            }
            None => Metric::default(),
        };

        let m = Self {
            load: LoadSpec::new(qps, parallelism),
            hostport,
            conns: conns.unwrap_or(parallelism),
            metric,
            api: (!no_api).then_some(api),
            drain_timeout: Duration::from_millis(drain_timeout),
        };

        Ok(m)
    }
}
