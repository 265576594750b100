// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
use std::ops;
use std::sync::Arc;
use std::time::Duration;

use ethers::contract::{Contract, LogMeta};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, H256, U256, U64};

use crate::config::BridgeRelayerConfig;
use crate::contracts::{SourceBridge, TokensLockedFilter};
use crate::events_watcher::{EventWatcher, WatchableContract};
use crate::store::file::FileCheckpointStore;
use crate::tx_relay::ReleaseSubmitter;

type HttpProvider = Provider<Http>;

/// A Wrapper around the source-side `SourceBridge` contract.
#[derive(Clone, Debug)]
pub struct SourceBridgeContractWrapper<M: Middleware> {
    config: BridgeRelayerConfig,
    contract: SourceBridge<M>,
}

impl<M: Middleware> SourceBridgeContractWrapper<M> {
    /// Creates the wrapper around the bridge address named in the config.
    pub fn new(config: BridgeRelayerConfig, client: Arc<M>) -> Self {
        Self {
            contract: SourceBridge::new(config.source_bridge_address, client),
            config,
        }
    }
}

impl<M: Middleware> ops::Deref for SourceBridgeContractWrapper<M> {
    type Target = Contract<M>;

    fn deref(&self) -> &Self::Target {
        &self.contract
    }
}

impl<M: Middleware> WatchableContract for SourceBridgeContractWrapper<M> {
    fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    fn max_blocks_per_step(&self) -> U64 {
        self.config.max_window.into()
    }
}

/// One decoded lock awaiting its release on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEvent {
    /// The contract-assigned, strictly increasing lock counter.
    pub sequence: U256,
    /// The account receiving the released tokens on the destination chain.
    pub recipient: Address,
    /// The locked amount, in token base units.
    pub amount: U256,
    /// The source block the lock was observed in.
    pub source_block: U64,
    /// The source transaction that performed the lock.
    pub source_tx: H256,
}

impl From<(TokensLockedFilter, LogMeta)> for LockEvent {
    fn from((event, log): (TokensLockedFilter, LogMeta)) -> Self {
        Self {
            sequence: event.sequence,
            recipient: event.recipient,
            amount: event.amount,
            source_block: log.block_number,
            source_tx: log.transaction_hash,
        }
    }
}

/// Watches the source bridge for `TokensLocked` events and hands each one to
/// the release submitter, in emission order.
pub struct TokensLockedWatcher {
    submitter: ReleaseSubmitter,
}

impl TokensLockedWatcher {
    /// Creates the watcher around the given submitter.
    pub fn new(submitter: ReleaseSubmitter) -> Self {
        Self { submitter }
    }
}

#[async_trait::async_trait]
impl EventWatcher for TokensLockedWatcher {
    const TAG: &'static str = "Tokens Locked Watcher";

    type Middleware = HttpProvider;

    type Contract = SourceBridgeContractWrapper<Self::Middleware>;

    type Events = TokensLockedFilter;

    type Store = FileCheckpointStore;

    #[tracing::instrument(
        skip_all,
        fields(sequence = %e.0.sequence, block = %e.1.block_number),
    )]
    async fn handle_event(
        &self,
        _store: Arc<Self::Store>,
        _wrapper: &Self::Contract,
        e: (Self::Events, LogMeta),
    ) -> crate::Result<()> {
        self.submitter.process(LockEvent::from(e)).await
    }
}
