//! HTTP API server.

use core::net::SocketAddr;
use std::{io::Error, sync::Arc};

use axum::Router;
use tokio::net::TcpListener;

use super::metrics::{self, MetricsState};

/// Debug HTTP server, bound and ready to accept connections.
pub struct Server {
    listener: TcpListener,
    app: Router,
}

impl Server {
    pub async fn bind(addr: SocketAddr, state: Arc<MetricsState>) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        let app = Router::new().merge(metrics::router(state));

        Ok(Self { listener, app })
    }

    #[inline]
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener.local_addr()
    }

    /// Serves requests until the owning task is cancelled.
    pub async fn run(self) -> Result<(), Error> {
        log::info!("API server listening on {}", self.local_addr()?);

        axum::serve(self.listener, self.app).await
    }
}

#[cfg(test)]
mod test {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    use super::*;
    use crate::stat::Stat;

    #[tokio::test]
    async fn test_serves_metrics() {
        let stat = Arc::new(Stat::default());
        stat.on_requests(3);

        let state = Arc::new(MetricsState::new(stat, 100, 2));
        let server = Server::bind("127.0.0.1:0".parse().unwrap(), state).await.unwrap();
        let addr = server.local_addr().unwrap();
        let job = tokio::spawn(server.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/v1/metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut resp = String::new();
        stream.read_to_string(&mut resp).await.unwrap();
        job.abort();

        assert!(resp.starts_with("HTTP/1.1 200 OK"), "{resp}");
        assert!(resp.contains("loadgen_requests_total 3"), "{resp}");
    }
}
