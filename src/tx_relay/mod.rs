//! # Release Submission Module
//!
//! Drives every observed lock event to a terminal status on the destination
//! chain: signs the release authorization, submits `releaseTokens`, waits
//! for the receipt, and classifies every possible rejection.

use std::time::Duration;

use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider};
use ethers::signers::LocalWallet;
use ethers::types::Bytes;

use crate::contracts::DestinationBridge;
use crate::error::Error;
use crate::events_watcher::{ConstantWithMaxRetryCount, LockEvent};
use crate::signer::AuthorizationSigner;
use crate::store::mem::InMemoryStore;
use crate::store::ProcessedSequenceStore;

/// Stable revert reason the destination bridge emits for a consumed sequence.
const REASON_SEQUENCE_CONSUMED: &str = "Nonce has already been used";
/// Stable revert reason the destination bridge emits for a bad authorization.
const REASON_BAD_AUTHORIZATION: &str = "Invalid signature";
/// Release attempts granted to an operator topping up the signer account
/// before the relayer gives up.
const MAX_FUNDING_RETRIES: usize = 5;

type DestinationClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Terminal status of one lock event on the destination chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The release transaction was mined successfully.
    Released,
    /// The destination had already consumed this sequence, in a previous run
    /// or through a peer.
    AlreadyClaimed,
    /// The sequence was already released earlier in this run.
    Skipped,
}

/// Severity classes of a rejected release submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    /// The destination reports the sequence as consumed; success in disguise.
    SequenceConsumed,
    /// The destination refuses the signature; the authority key, contract
    /// address or digest layout is wrong.
    BadAuthorization,
    /// The signer account cannot pay for the transaction.
    InsufficientFunds,
    /// A revert this relayer does not know; halting is safer than skipping.
    OtherRevert,
    /// Anything that does not look like a contract revert at all.
    Transport,
}

fn classify_failure(message: &str) -> FailureKind {
    if message.contains(REASON_SEQUENCE_CONSUMED) {
        FailureKind::SequenceConsumed
    } else if message.contains(REASON_BAD_AUTHORIZATION) {
        FailureKind::BadAuthorization
    } else if message.contains("insufficient funds") {
        FailureKind::InsufficientFunds
    } else if message.contains("nonce too low")
        || message.contains("already known")
    {
        // raced our own pending transaction; the next tick resolves it.
        FailureKind::Transport
    } else if message.contains("execution reverted")
        || message.contains("revert")
    {
        FailureKind::OtherRevert
    } else {
        FailureKind::Transport
    }
}

/// Submits releases for lock events, one at a time, in emission order.
pub struct ReleaseSubmitter {
    contract: DestinationBridge<DestinationClient>,
    signer: AuthorizationSigner,
    processed: InMemoryStore,
    tx_timeout: Duration,
    funding_retry_interval: Duration,
}

impl ReleaseSubmitter {
    /// Creates a submitter releasing through the given destination bridge.
    pub fn new(
        contract: DestinationBridge<DestinationClient>,
        signer: AuthorizationSigner,
        tx_timeout: Duration,
        funding_retry_interval: Duration,
    ) -> Self {
        Self {
            contract,
            signer,
            processed: InMemoryStore::default(),
            tx_timeout,
            funding_retry_interval,
        }
    }

    /// Drives one lock event to a terminal status, absorbing a bounded
    /// insufficient-funds window on the way.
    pub async fn process(&self, event: LockEvent) -> crate::Result<()> {
        let retry_policy = ConstantWithMaxRetryCount::new(
            self.funding_retry_interval,
            MAX_FUNDING_RETRIES,
        );
        // `permanent` here only ends this bounded retry; whatever escapes is
        // classified again by the supervisor loop.
        let outcome = backoff::future::retry(retry_policy, || async {
            self.release(&event).await.map_err(|e| match e {
                Error::InsufficientFunds => {
                    tracing::warn!(
                        sequence = %event.sequence,
                        "Signer account cannot fund the release; \
                         waiting for a top-up",
                    );
                    backoff::Error::transient(Error::InsufficientFunds)
                }
                other => backoff::Error::permanent(other),
            })
        })
        .await?;
        match outcome {
            ReleaseOutcome::Released => {}
            ReleaseOutcome::AlreadyClaimed => {
                tracing::debug!(
                    sequence = %event.sequence,
                    "Sequence was already consumed on the destination; \
                     nothing to do",
                );
            }
            ReleaseOutcome::Skipped => {
                tracing::debug!(
                    sequence = %event.sequence,
                    "Sequence already released during this run; skipping",
                );
            }
        }
        Ok(())
    }

    /// Submits one release and classifies the result.
    async fn release(&self, event: &LockEvent) -> crate::Result<ReleaseOutcome> {
        if self.processed.is_sequence_processed(event.sequence)? {
            return Ok(ReleaseOutcome::Skipped);
        }
        let signature =
            self.signer
                .sign(event.recipient, event.amount, event.sequence)?;
        tracing::info!(
            sequence = %event.sequence,
            recipient = ?event.recipient,
            amount = %event.amount,
            "Releasing locked tokens on the destination bridge",
        );
        let call = self.contract.release_tokens(
            event.recipient,
            event.amount,
            event.sequence,
            Bytes::from(signature.to_vec()),
        );
        let pending = match call.send().await {
            Ok(pending) => pending,
            Err(e) => return self.classify_send_failure(event, e),
        };
        let tx_hash = *pending;
        tracing::debug!(
            sequence = %event.sequence,
            tx = ?tx_hash,
            "Release transaction submitted and pending",
        );
        let receipt = tokio::time::timeout(
            self.tx_timeout,
            pending.interval(Duration::from_millis(1_000)),
        )
        .await
        .map_err(|_| Error::ReceiptTimeout {
            sequence: event.sequence,
        })??;
        let receipt = receipt.ok_or(Error::TxDropped {
            sequence: event.sequence,
        })?;
        if receipt.status != Some(1u64.into()) {
            tracing::error!(
                sequence = %event.sequence,
                tx = ?tx_hash,
                "Release transaction was mined but reverted",
            );
            return Err(Error::ReleaseReverted {
                sequence: event.sequence,
            });
        }
        self.processed.mark_sequence_processed(event.sequence)?;
        tracing::event!(
            target: crate::probe::TARGET,
            tracing::Level::DEBUG,
            kind = %crate::probe::Kind::RelayTx,
            sequence = %event.sequence,
            recipient = ?event.recipient,
            amount = %event.amount,
            tx = ?tx_hash,
        );
        tracing::info!(
            sequence = %event.sequence,
            tx = ?tx_hash,
            finalized_at = ?receipt.block_number,
            "Release confirmed ✅",
        );
        Ok(ReleaseOutcome::Released)
    }

    fn classify_send_failure(
        &self,
        event: &LockEvent,
        e: ethers::contract::ContractError<DestinationClient>,
    ) -> crate::Result<ReleaseOutcome> {
        let message = e.to_string();
        match classify_failure(&message) {
            FailureKind::SequenceConsumed => {
                // the destination committed this sequence in a prior run or
                // through a peer; record it and move on.
                self.processed.mark_sequence_processed(event.sequence)?;
                tracing::debug!(
                    sequence = %event.sequence,
                    "Destination reports the sequence as already used; \
                     treating as released",
                );
                Ok(ReleaseOutcome::AlreadyClaimed)
            }
            FailureKind::BadAuthorization => {
                tracing::error!(
                    sequence = %event.sequence,
                    recipient = ?event.recipient,
                    amount = %event.amount,
                    signer = ?self.signer.address(),
                    contract = ?self.contract.address(),
                    reason = %message,
                    "Destination bridge rejected the authorization signature",
                );
                Err(Error::InvalidAuthority { reason: message })
            }
            FailureKind::InsufficientFunds => Err(Error::InsufficientFunds),
            FailureKind::Transport => Err(Error::transport(message)),
            FailureKind::OtherRevert => {
                tracing::error!(
                    sequence = %event.sequence,
                    recipient = ?event.recipient,
                    amount = %event.amount,
                    signer = ?self.signer.address(),
                    contract = ?self.contract.address(),
                    reason = %message,
                    "Destination bridge reverted for an unknown reason",
                );
                Err(Error::UnexpectedRevert {
                    sequence: event.sequence,
                    reason: message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumed_sequence_is_benign() {
        assert_eq!(
            classify_failure(
                "execution reverted: Bridge: Nonce has already been used."
            ),
            FailureKind::SequenceConsumed,
        );
    }

    #[test]
    fn bad_signature_is_recognized() {
        assert_eq!(
            classify_failure(
                "execution reverted: Bridge: Invalid signature."
            ),
            FailureKind::BadAuthorization,
        );
    }

    #[test]
    fn funding_problems_are_recognized() {
        assert_eq!(
            classify_failure(
                "insufficient funds for gas * price + value: \
                 balance 0, tx cost 420000000000000"
            ),
            FailureKind::InsufficientFunds,
        );
    }

    #[test]
    fn connectivity_problems_are_transport() {
        assert_eq!(
            classify_failure(
                "error sending request for url (http://localhost:8546/): \
                 connection refused"
            ),
            FailureKind::Transport,
        );
        assert_eq!(
            classify_failure("request timed out"),
            FailureKind::Transport,
        );
    }

    #[test]
    fn nonce_races_are_retryable() {
        assert_eq!(
            classify_failure("nonce too low"),
            FailureKind::Transport,
        );
        assert_eq!(
            classify_failure("already known"),
            FailureKind::Transport,
        );
    }

    #[test]
    fn unknown_reverts_are_their_own_class() {
        assert_eq!(
            classify_failure(
                "execution reverted: Bridge: Amount must be greater than zero."
            ),
            FailureKind::OtherRevert,
        );
    }
}
