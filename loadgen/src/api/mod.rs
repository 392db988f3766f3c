//! Debug HTTP API exposing live load counters.

mod metrics;
mod server;

pub use self::{
    metrics::{MetricsCollector, MetricsState},
    server::Server,
};
