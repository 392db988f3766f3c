use core::{
    fmt::{self, Display, Formatter},
    time::Duration,
};

use crate::stat::TxStat;

/// Final throughput report, computed once at shutdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub total_requests: u64,
    pub failures: u64,
    pub elapsed: Duration,
    /// Achieved requests per second.
    ///
    /// This is `None` when the elapsed time rounds to zero seconds, in which
    /// case the rate is undefined.
    pub achieved_rate: Option<u64>,
}

impl Report {
    pub fn new(total_requests: u64, failures: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64().round() as u64;
        let achieved_rate = match secs {
            0 => None,
            secs => Some((total_requests as f64 / secs as f64).round() as u64),
        };

        Self {
            total_requests,
            failures,
            elapsed,
            achieved_rate,
        }
    }

    pub fn from_stat<S>(stat: &S, elapsed: Duration) -> Self
    where
        S: TxStat + ?Sized,
    {
        Self::new(stat.num_requests(), stat.num_failures(), elapsed)
    }
}

impl Display for Report {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        write!(
            fmt,
            "made {} requests ({} failed) in {:.3}s",
            self.total_requests,
            self.failures,
            self.elapsed.as_secs_f64()
        )?;

        match self.achieved_rate {
            Some(rate) => write!(fmt, " // achieved {rate} qps"),
            None => write!(fmt, " // rate undefined, elapsed time rounds to 0s"),
        }
    }
}
