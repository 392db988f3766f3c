use std::sync::Arc;

use anyhow::Error;
use rand::rngs::SmallRng;
use tokio::net::UdpSocket;

use super::Task;
use crate::{
    ingest::{Encode, Metric},
    pool::Connector,
};

/// Sends a single metric sample over a pooled datagram connection.
#[derive(Debug)]
pub struct IngestTask<C> {
    pool: Arc<C>,
    /// Encoded sample, sent as is with each request.
    payload: Vec<u8>,
    /// Connection selection key.
    key: String,
    /// Random source used to pick connections.
    ///
    /// Owned by this task exclusively.
    rng: SmallRng,
}

impl<C> IngestTask<C> {
    /// Creates a new task, encoding the sample once since it never changes.
    pub fn new<E: Encode>(pool: Arc<C>, encoder: &E, metric: &Metric, rng: SmallRng) -> Self {
        let mut payload = Vec::new();
        encoder.encode(metric, &mut payload);

        Self {
            pool,
            payload,
            key: metric.name.clone(),
            rng,
        }
    }
}

impl<C> Task for IngestTask<C>
where
    C: Connector<Conn = UdpSocket> + Send + Sync,
{
    async fn execute(&mut self) -> Result<u64, Error> {
        let conn = self.pool.acquire(&mut self.rng, &self.key)?;
        let rc = conn.send(&self.payload).await;
        self.pool.release(conn, rc.as_ref().err());

        Ok(rc? as u64)
    }
}
