//! Polling loop for server-side batch synchronization.

use crate::api::BotClient;
use crate::domain::BatchSyncStatus;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_polls: u32,
}

/// Why polling stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The backend reported the job as no longer active.
    Finished(BatchSyncStatus),
    Cancelled,
    /// `max_polls` attempts without seeing the job finish.
    Exhausted { polls: u32 },
}

/// Poll the batch status every `config.interval` until the job is inactive,
/// `cancel` fires, or `config.max_polls` attempts were made. The first poll
/// happens one interval after the call. `on_status` sees every status read,
/// including the final one. Failed polls are logged and count as attempts.
pub async fn poll_until_idle<F>(
    client: &BotClient,
    config: PollConfig,
    cancel: &CancellationToken,
    mut on_status: F,
) -> PollOutcome
where
    F: FnMut(&BatchSyncStatus),
{
    info!(
        "Batch sync poller started (every {:?}, at most {} polls)",
        config.interval, config.max_polls
    );
    let mut ticker = interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for attempt in 1..=config.max_polls {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Batch sync poller cancelled after {} polls", attempt - 1);
                return PollOutcome::Cancelled;
            }
            _ = ticker.tick() => {}
        }

        match client.batch_sync_status().await {
            Ok(status) => {
                debug!(
                    "Batch sync {}/{} items, {} offers found",
                    status.processed_items, status.total_items, status.found_offers
                );
                on_status(&status);
                if !status.active {
                    info!("Batch sync finished after {} polls", attempt);
                    return PollOutcome::Finished(status);
                }
            }
            Err(e) => warn!("Batch sync status poll {} failed: {}", attempt, e),
        }
    }

    warn!("Batch sync poller gave up after {} polls", config.max_polls);
    PollOutcome::Exhausted {
        polls: config.max_polls,
    }
}
