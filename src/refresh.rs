use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{net::ListFetcher, pipeline::FilterEngine};

/// Periodically refreshes every externally sourced checker. The first
/// refresh runs immediately; failures are logged and never stop the
/// schedule.
pub fn spawn_refresh_task(
    engine: Arc<FilterEngine>,
    fetcher: Arc<dyn ListFetcher>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let failures = engine.registry().update_external(fetcher.as_ref()).await;
            for (name, err) in failures {
                tracing::warn!(
                    target: "refresh",
                    checker = %name,
                    error = %err,
                    "external list refresh failed; keeping previous data"
                );
            }
        }
    })
}
