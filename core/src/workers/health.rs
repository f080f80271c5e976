//! Periodic health check worker
//!
//! The only autonomous background activity in the core: sweeps every
//! tracked connection on an interval, updating each liveness state
//! independently.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use crate::connector::nucleus::NucleusConnector;

/// Health worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Interval between sweeps
    pub interval: Duration,

    /// Initial delay before the first sweep
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(5),
        }
    }
}

/// Run the health worker
pub async fn run<S, F>(
    options: &Options,
    connector: &NucleusConnector,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Health worker starting...");

    sleep_fn(options.initial_delay).await;

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Health worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with sweep
            }
        }

        debug!("Running health sweep...");
        connector.health_check_all().await;
    }
}
