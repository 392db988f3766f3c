use core::sync::atomic::{AtomicU64, Ordering};

pub trait TxStat {
    /// Number of units of work completed, failed ones included.
    fn num_requests(&self) -> u64;
    /// Number of units of work that failed.
    fn num_failures(&self) -> u64;
    fn bytes_tx(&self) -> u64;
}

/// Process-wide throughput counters.
///
/// Shared by all workers for the lifetime of the process. Counters never
/// decrease and are only touched through atomic increments, no lock is
/// involved.
#[derive(Debug, Default)]
pub struct Stat {
    num_requests: AtomicU64,
    num_failures: AtomicU64,
    bytes_tx: AtomicU64,
}

impl Stat {
    /// Increases the number of requests made by the given value.
    ///
    /// Should be called after each unit of work, regardless of its outcome.
    #[inline]
    pub fn on_requests(&self, v: u64) {
        self.num_requests.fetch_add(v, Ordering::Relaxed);
    }

    #[inline]
    pub fn on_failure(&self) {
        self.num_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn on_send(&self, n: u64) {
        self.bytes_tx.fetch_add(n, Ordering::Relaxed);
    }
}

impl TxStat for Stat {
    #[inline]
    fn num_requests(&self) -> u64 {
        self.num_requests.load(Ordering::Relaxed)
    }

    #[inline]
    fn num_failures(&self) -> u64 {
        self.num_failures.load(Ordering::Relaxed)
    }

    #[inline]
    fn bytes_tx(&self) -> u64 {
        self.bytes_tx.load(Ordering::Relaxed)
    }
}
