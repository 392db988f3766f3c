//! Prometheus metrics collector and HTTP handler.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

use crate::stat::TxStat;

/// Collector that mirrors load counters into a Prometheus registry.
pub struct MetricsCollector {
    registry: Registry,
    requests_total: Counter,
    failures_total: Counter,
    bytes_tx_total: Counter,
}

impl MetricsCollector {
    /// Creates a new metrics collector and registers all metrics.
    ///
    /// Target rate and pool size never change during a run, so they are
    /// exported as constant gauges.
    pub fn new(target_rps: u64, num_conns: usize) -> Self {
        let mut registry = Registry::default();

        let target: Gauge = Gauge::default();
        target.set(target_rps as i64);
        registry.register("loadgen_target_rps", "Target requests per second", target);

        let conns: Gauge = Gauge::default();
        conns.set(num_conns as i64);
        registry.register("loadgen_connections", "Number of pooled connections", conns);

        let requests_total = Counter::default();
        registry.register(
            "loadgen_requests",
            "Total number of units of work completed, failed ones included",
            requests_total.clone(),
        );

        let failures_total = Counter::default();
        registry.register(
            "loadgen_failures",
            "Total number of units of work failed",
            failures_total.clone(),
        );

        let bytes_tx_total = Counter::default();
        registry.register("loadgen_bytes_tx", "Total bytes transmitted", bytes_tx_total.clone());

        Self {
            registry,
            requests_total,
            failures_total,
            bytes_tx_total,
        }
    }

    /// Catches the counters up with the given stats.
    pub fn update<S: TxStat + ?Sized>(&self, stat: &S) {
        for (counter, v) in [
            (&self.requests_total, stat.num_requests()),
            (&self.failures_total, stat.num_failures()),
            (&self.bytes_tx_total, stat.bytes_tx()),
        ] {
            // Stats never decrease, so only the delta is added.
            let curr = counter.get();
            if v > curr {
                counter.inc_by(v - curr);
            }
        }
    }

    /// Encodes all metrics to Prometheus text format.
    pub fn encode(&self) -> Result<String, core::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;

        Ok(buffer)
    }
}

/// Shared state for the metrics handler.
pub struct MetricsState {
    collector: MetricsCollector,
    stat: Arc<dyn TxStat + Send + Sync>,
}

impl MetricsState {
    pub fn new(stat: Arc<dyn TxStat + Send + Sync>, target_rps: u64, num_conns: usize) -> Self {
        Self {
            collector: MetricsCollector::new(target_rps, num_conns),
            stat,
        }
    }
}

/// Creates a router for metrics endpoints.
pub fn router(state: Arc<MetricsState>) -> Router {
    Router::new()
        .route("/api/v1/metrics", get(metrics_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    state.collector.update(&*state.stat);

    match state.collector.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        ),
        Err(err) => {
            log::error!("failed to encode metrics: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                String::new(),
            )
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stat::Stat;

    #[test]
    fn test_encode_tracks_stats() {
        let stat = Stat::default();
        let collector = MetricsCollector::new(250, 4);

        stat.on_requests(5);
        stat.on_failure();
        stat.on_send(120);
        collector.update(&stat);

        stat.on_requests(2);
        collector.update(&stat);
        // Updating twice with the same values must not double count.
        collector.update(&stat);

        let body = collector.encode().unwrap();
        assert!(body.contains("loadgen_target_rps 250"), "{body}");
        assert!(body.contains("loadgen_connections 4"), "{body}");
        assert!(body.contains("loadgen_requests_total 7"), "{body}");
        assert!(body.contains("loadgen_failures_total 1"), "{body}");
        assert!(body.contains("loadgen_bytes_tx_total 120"), "{body}");
    }
}
