use std::cmp;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use ethers::contract::{Contract, EthEvent, LogMeta};
use ethers::providers::{self, Middleware};
use ethers::types::U64;
use futures::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::store::HistoryStore;

mod retry;
pub use retry::ConstantWithMaxRetryCount;

mod tokens_locked;
pub use tokens_locked::*;

/// Blocks to rewind from the chain head when no checkpoint exists yet.
///
/// A first start against a live chain wants recent history, not a full
/// rescan from genesis; anything re-scanned twice is deduplicated by the
/// destination contract anyway.
const BOOTSTRAP_LOOKBACK_BLOCKS: u64 = 100;

/// A watchable contract is a contract used in the [EventWatcher]
pub trait WatchableContract: Send + Sync {
    /// How often this contract should be polled for events.
    fn polling_interval(&self) -> Duration;

    /// The maximum number of blocks to cover in one log query.
    fn max_blocks_per_step(&self) -> U64;
}

/// Computes the inclusive `(from, to)` window of the next log query, or
/// `None` when the scanner has caught up with the chain head.
fn next_scan_window(cursor: U64, head: U64, max_step: U64) -> Option<(U64, U64)> {
    if head <= cursor {
        return None;
    }
    let to = cmp::min(head, cursor + max_step);
    Some((cursor + U64::one(), to))
}

/// The cursor a fresh relayer starts from when no checkpoint exists.
fn bootstrap_cursor(head: U64) -> U64 {
    head.saturating_sub(U64::from(BOOTSTRAP_LOOKBACK_BLOCKS))
}

/// A long-running task polling one contract for events and driving each of
/// them to a terminal status before the durable block cursor moves past it.
#[async_trait::async_trait]
pub trait EventWatcher {
    /// A tag used in logs to tell the watchers apart.
    const TAG: &'static str;
    /// The RPC client type used against the watched chain.
    type Middleware: providers::Middleware + 'static;
    /// The watched contract, dereferencing to its raw contract handle.
    type Contract: Deref<Target = Contract<Self::Middleware>>
        + WatchableContract;
    /// The decoded event type this watcher queries for.
    type Events: EthEvent + Send + Sync;
    /// Where the last fully-processed block number is kept.
    type Store: HistoryStore;

    /// Drives one decoded event to a terminal status.
    ///
    /// Returning `Ok` acknowledges the event: the checkpoint may move past
    /// it and it will never be handed to this watcher again.
    async fn handle_event(
        &self,
        store: Arc<Self::Store>,
        contract: &Self::Contract,
        (event, log): (Self::Events, LogMeta),
    ) -> crate::Result<()>;

    /// Runs the polling loop until `cancel` flips or a fatal error is hit.
    ///
    /// Retryable errors restart the loop through the backoff policy without
    /// advancing the checkpoint; fatal errors end it and bubble up.
    #[tracing::instrument(skip_all, fields(tag = %Self::TAG))]
    async fn run(
        &self,
        client: Arc<Self::Middleware>,
        store: Arc<Self::Store>,
        contract: Self::Contract,
        cancel: CancellationToken,
    ) -> crate::Result<()> {
        let backoff = backoff::ExponentialBackoff {
            initial_interval: contract.polling_interval() * 2,
            max_elapsed_time: None,
            ..Default::default()
        };
        let task = || async {
            let chain_id = client
                .get_chainid()
                .map_err(Error::transport)
                .await?;
            // saves the last time we printed sync progress.
            let mut instant = std::time::Instant::now();
            // now we start polling for new events.
            loop {
                if cancel.is_cancelled() {
                    tracing::info!("{} stopped before the next tick", Self::TAG);
                    return Ok(());
                }
                let current_block_number = client
                    .get_block_number()
                    .map_err(Error::transport)
                    .await?;
                tracing::trace!(
                    "Latest block number: #{}",
                    current_block_number
                );
                let block = store
                    .get_last_block_number(bootstrap_cursor(current_block_number))?;
                let window = next_scan_window(
                    block,
                    current_block_number,
                    contract.max_blocks_per_step(),
                );
                let (from_block, dest_block) = match window {
                    Some(window) => window,
                    None => {
                        // caught up with the head, nothing to scan this tick.
                        tokio::select! {
                            _ = tokio::time::sleep(contract.polling_interval()) => {},
                            _ = cancel.cancelled() => return Ok(()),
                        }
                        continue;
                    }
                };
                let should_cooldown = dest_block == current_block_number;
                tracing::trace!("Reading from #{} to #{}", from_block, dest_block);
                let events_filter = contract
                    .event::<Self::Events>()
                    .from_block(from_block)
                    .to_block(dest_block);
                let mut found_events = events_filter
                    .query_with_meta()
                    .map_err(Error::transport)
                    .await?;
                // eth_getLogs ordering is provider-dependent across ranges.
                found_events
                    .sort_by_key(|(_, log)| (log.block_number, log.log_index));

                tracing::trace!("Found #{} events", found_events.len());

                for (event, log) in found_events {
                    let result = self
                        .handle_event(
                            store.clone(),
                            &contract,
                            (event, log.clone()),
                        )
                        .await;
                    match result {
                        Ok(_) => {
                            // everything below this block is terminal now;
                            // events later in this same block may not be.
                            let sealed =
                                log.block_number.saturating_sub(U64::one());
                            if let Err(e) = store.set_last_block_number(sealed)
                            {
                                tracing::warn!(
                                    "Failed to persist checkpoint #{}: {}",
                                    sealed,
                                    e
                                );
                            }
                            tracing::trace!(
                                "event handled successfully. at #{}",
                                log.block_number
                            );
                        }
                        Err(e) if e.is_fatal() => {
                            tracing::error!(
                                "Fatal error while handling event: {}",
                                e
                            );
                            return Err(backoff::Error::permanent(e));
                        }
                        Err(e) => {
                            tracing::error!(
                                "Error while handling event: {}",
                                e
                            );
                            tracing::warn!("Restarting event watcher ...");
                            return Err(backoff::Error::transient(e));
                        }
                    }
                    if cancel.is_cancelled() {
                        tracing::info!(
                            "{} stopping after the in-flight event",
                            Self::TAG
                        );
                        return Ok(());
                    }
                }
                // the whole window is terminal, move forward.
                if let Err(e) = store.set_last_block_number(dest_block) {
                    tracing::warn!(
                        "Failed to persist checkpoint #{}: {}",
                        dest_block,
                        e
                    );
                }
                tracing::event!(
                    target: crate::probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %crate::probe::Kind::Sync,
                    chain_id = %chain_id,
                    from = %from_block,
                    to = %dest_block,
                );
                if should_cooldown {
                    let duration = contract.polling_interval();
                    tracing::trace!(
                        "Cooldown a bit for {}ms",
                        duration.as_millis()
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(duration) => {},
                        _ = cancel.cancelled() => return Ok(()),
                    }
                }

                // only print the progress if 7 seconds is passed.
                if instant.elapsed() > Duration::from_secs(7) {
                    // calculate sync progress.
                    let total = current_block_number.as_u64() as f64;
                    let current_value = dest_block.as_u64() as f64;
                    let sync_progress = (current_value / total) * 100.0;
                    tracing::info!(
                        "🔄 #{} of #{} ({:.4}%)",
                        dest_block,
                        current_block_number,
                        sync_progress
                    );
                    instant = std::time::Instant::now();
                }
            }
        };
        backoff::future::retry(backoff, task).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_empty_when_caught_up() {
        assert_eq!(
            next_scan_window(U64::from(100), U64::from(100), U64::from(2000)),
            None,
        );
        assert_eq!(
            next_scan_window(U64::from(100), U64::from(90), U64::from(2000)),
            None,
        );
    }

    #[test]
    fn window_starts_after_the_cursor() {
        assert_eq!(
            next_scan_window(U64::from(100), U64::from(105), U64::from(2000)),
            Some((U64::from(101), U64::from(105))),
        );
    }

    #[test]
    fn window_is_capped_by_the_max_step() {
        assert_eq!(
            next_scan_window(U64::from(0), U64::from(10_000), U64::from(2000)),
            Some((U64::from(1), U64::from(2000))),
        );
    }

    #[test]
    fn consecutive_windows_tile_the_chain() {
        let (_, first_to) =
            next_scan_window(U64::from(0), U64::from(5000), U64::from(2000))
                .unwrap();
        let (second_from, _) =
            next_scan_window(first_to, U64::from(5000), U64::from(2000))
                .unwrap();
        assert_eq!(second_from, first_to + U64::one());
    }

    #[test]
    fn bootstrap_rewinds_a_bounded_distance() {
        assert_eq!(bootstrap_cursor(U64::from(12_345)), U64::from(12_245));
        // a chain younger than the look-back starts from genesis.
        assert_eq!(bootstrap_cursor(U64::from(40)), U64::zero());
    }
}
