use core::{net::SocketAddr, num::NonZero};
use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Synthetic load generator for statsd-compatible ingestion endpoints.
///
/// Sends metric samples over UDP at the given rate until interrupted, then
/// reports the achieved throughput.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Cmd {
    /// Target rate, in requests per second.
    #[clap(long, default_value_t = 100)]
    pub qps: u64,
    /// Target endpoint to send requests to.
    #[clap(long, default_value = "localhost:8200")]
    pub hostport: String,
    /// Number of parallel workers generating load.
    ///
    /// Workers share the same rate limit, so this increases readiness to
    /// dispatch, never the aggregate rate.
    #[clap(short, long, default_value_t = default_parallelism())]
    pub parallelism: NonZero<usize>,
    /// Number of outbound connections in the pool.
    ///
    /// Defaults to the number of workers.
    #[clap(long)]
    pub conns: Option<NonZero<usize>>,
    /// Path to the YAML file describing the metric sample to send.
    ///
    /// Missing fields are filled with defaults: counter "test" with value 10
    /// and "abc:def" tag.
    #[clap(long, value_name = "PATH")]
    pub sample: Option<PathBuf>,
    /// Address of the debug HTTP endpoint.
    #[clap(long, default_value = "127.0.0.1:6060")]
    pub api: SocketAddr,
    /// Disable the debug HTTP endpoint.
    #[clap(long)]
    pub no_api: bool,
    /// Time in milliseconds given to workers to stop after an interrupt.
    ///
    /// Requests still in flight after that are abandoned.
    #[clap(long, value_name = "MS", default_value_t = 1000)]
    pub drain_timeout: u64,
    /// Be verbose in terms of logging.
    #[clap(short, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Twice the number of available cores.
fn default_parallelism() -> NonZero<usize> {
    let cores = std::thread::available_parallelism().unwrap_or(NonZero::<usize>::MIN);

    cores.saturating_add(cores.get())
}
