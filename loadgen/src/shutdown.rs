//! Cooperative shutdown.
//!
//! A single [`Shutdown`] handle broadcasts cancellation to every
//! [`ShutdownRx`] subscribed to it. Workers observe it at their only
//! suspension point, i.e. while waiting for the rate limiter.

use std::io::Error;

use tokio::sync::watch::{self, Receiver, Sender};

/// Cancellation broadcaster.
#[derive(Debug)]
pub struct Shutdown {
    tx: Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, ..) = watch::channel(false);

        Self { tx }
    }

    /// Creates a new receiver observing this handle.
    #[inline]
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx { rx: self.tx.subscribe() }
    }

    /// Broadcasts cancellation to all subscribers.
    ///
    /// Calling this more than once has no additional effect.
    #[inline]
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownRx {
    rx: Receiver<bool>,
}

impl ShutdownRx {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until cancellation is broadcast.
    ///
    /// Also completes when the [`Shutdown`] handle is dropped.
    pub async fn cancelled(&mut self) {
        _ = self.rx.wait_for(|v| *v).await;
    }
}

/// Waits for an interrupt (or, on unix, a termination) signal.
pub async fn signal() -> Result<(), Error> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{self, SignalKind};

        let mut terminate = unix::signal(SignalKind::terminate())?;

        tokio::select! {
            rc = tokio::signal::ctrl_c() => {
                rc?;
                log::info!("received interrupt signal");
            }
            _ = terminate.recv() => {
                log::info!("received terminate signal");
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        log::info!("received interrupt signal");

        Ok(())
    }
}
