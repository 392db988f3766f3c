//! Outbound connection pools.

use core::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    num::NonZero,
    time::Duration,
};
use std::io;

use rand::Rng;
use thiserror::Error;
use tokio::net::{self, UdpSocket};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to resolve \"{hostport}\": {source}")]
    Resolve {
        hostport: String,
        #[source]
        source: io::Error,
    },
    #[error("\"{0}\" resolved to no addresses")]
    Unresolved(String),
    #[error("connection pool is empty")]
    Empty,
    #[error("failed creating connection #{idx} to {addr}: {source}")]
    Dial {
        idx: usize,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("timed out creating connection #{idx} to {addr}")]
    Timeout { idx: usize, addr: SocketAddr },
}

/// Connection acquisition strategy.
pub trait Connector {
    /// The type of connections handed out.
    type Conn;

    /// Returns a connection from the pool.
    ///
    /// The `key` allows strategies to pin related requests to the same
    /// connection. Strategies that don't need it are free to ignore it.
    fn acquire<R: Rng>(&self, rng: &mut R, key: &str) -> Result<&Self::Conn, PoolError>;

    /// Informs the pool that the caller is done with the given connection,
    /// passing the error its last use ended with, if any.
    fn release(&self, conn: &Self::Conn, err: Option<&io::Error>);
}

/// Fixed set of connections, established once and never recycled.
///
/// Each acquisition picks a connection uniformly at random using the caller's
/// random source, so no state is shared between callers.
#[derive(Debug)]
pub struct StaticPool<C = UdpSocket> {
    conns: Vec<C>,
}

impl<C> StaticPool<C> {
    pub fn new(conns: Vec<C>) -> Result<Self, PoolError> {
        if conns.is_empty() {
            return Err(PoolError::Empty);
        }

        Ok(Self { conns })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.conns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}

impl StaticPool<UdpSocket> {
    /// Establishes exactly `num` datagram connections to the given endpoint.
    ///
    /// Fails if any of them cannot be created, there is no partial pool.
    pub async fn connect(num: NonZero<usize>, hostport: &str, timeout: Duration) -> Result<Self, PoolError> {
        let addr = net::lookup_host(hostport)
            .await
            .map_err(|source| PoolError::Resolve { hostport: hostport.to_string(), source })?
            .next()
            .ok_or_else(|| PoolError::Unresolved(hostport.to_string()))?;

        let mut conns = Vec::with_capacity(num.get());
        for idx in 0..num.get() {
            let sock = tokio::time::timeout(timeout, dial(addr))
                .await
                .map_err(|_| PoolError::Timeout { idx, addr })?
                .map_err(|source| PoolError::Dial { idx, addr, source })?;

            log::trace!("connection #{idx} bound to {:?}", sock.local_addr());
            conns.push(sock);
        }

        log::debug!("established {} connections to {addr}", conns.len());

        Self::new(conns)
    }
}

impl<C> Connector for StaticPool<C> {
    type Conn = C;

    #[inline]
    fn acquire<R: Rng>(&self, rng: &mut R, _key: &str) -> Result<&Self::Conn, PoolError> {
        let idx = rng.random_range(0..self.conns.len());

        Ok(&self.conns[idx])
    }

    #[inline]
    fn release(&self, _conn: &Self::Conn, _err: Option<&io::Error>) {}
}

/// Binds a new socket and "connects" it to avoid passing the address on each
/// send.
async fn dial(addr: SocketAddr) -> Result<UdpSocket, io::Error> {
    let bind = match addr {
        SocketAddr::V4(..) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(..) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };

    let sock = UdpSocket::bind(bind).await?;
    sock.connect(addr).await?;

    Ok(sock)
}

#[cfg(test)]
mod test {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    fn histogram(pool: &StaticPool<usize>, draws: usize, seed: u64) -> Vec<usize> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut hist = vec![0; pool.len()];
        for _ in 0..draws {
            let idx = *pool.acquire(&mut rng, "test").unwrap();
            hist[idx] += 1;
        }

        hist
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let rc = StaticPool::<usize>::new(Vec::new());

        assert!(matches!(rc, Err(PoolError::Empty)));
    }

    #[test]
    fn test_selection_is_uniform() {
        let pool = StaticPool::new(vec![0, 1, 2, 3]).unwrap();

        for count in histogram(&pool, 10000, 42) {
            assert!((2250..=2750).contains(&count), "{count}");
        }
    }

    #[test]
    fn test_selection_is_uniform_small_sample() {
        let pool = StaticPool::new(vec![0, 1, 2]).unwrap();

        let mut total = vec![0; pool.len()];
        for seed in 0..10 {
            let hist = histogram(&pool, 300, seed);
            assert_eq!(300, hist.iter().sum::<usize>());

            for (idx, count) in hist.into_iter().enumerate() {
                assert!((60..=140).contains(&count), "{count}");
                total[idx] += count;
            }
        }

        for count in total {
            let avg = count / 10;
            assert!((80..=120).contains(&avg), "{avg}");
        }
    }

    #[test]
    fn test_single_connection() {
        let pool = StaticPool::new(vec![7]).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);

        for _ in 0..16 {
            assert_eq!(7, *pool.acquire(&mut rng, "").unwrap());
        }
    }

    #[tokio::test]
    async fn test_connect_and_send() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let pool = StaticPool::connect(NonZero::new(3).unwrap(), &addr.to_string(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(3, pool.len());

        let mut rng = SmallRng::seed_from_u64(1);
        let conn = pool.acquire(&mut rng, "key").unwrap();
        conn.send(b"ping").await.unwrap();
        pool.release(conn, None);

        let mut buf = [0u8; 16];
        let (n, ..) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(b"ping", &buf[..n]);
    }

    #[tokio::test]
    async fn test_connect_fails_on_invalid_endpoint() {
        let rc = StaticPool::connect(NonZero::new(2).unwrap(), "no-port-here", Duration::from_secs(1)).await;

        assert!(matches!(rc, Err(PoolError::Resolve { .. })));
    }
}
