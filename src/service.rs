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
//! # Relayer Service Module
//!
//! A module for starting the long-running relay task.
//!
//! ## Overview
//!
//! The service verifies both endpoints, assembles the source-side watcher
//! and the destination-side submitter, and runs the relay loop in the
//! foreground until shutdown or a fatal error.

use std::sync::Arc;
use std::time::Duration;

use ethers::middleware::SignerMiddleware;
use ethers::providers::Middleware;
use ethers::signers::Signer;

use crate::context::RelayerContext;
use crate::contracts::DestinationBridge;
use crate::events_watcher::{
    EventWatcher, SourceBridgeContractWrapper, TokensLockedWatcher,
};
use crate::signer::AuthorizationSigner;
use crate::store::file::FileCheckpointStore;
use crate::tx_relay::ReleaseSubmitter;

/// Starts the bridge relayer and runs it to completion.
///
/// Returns `Ok(())` after a clean shutdown; any returned error is a startup
/// verification failure or a fatal classification, and the process should
/// exit non-zero.
pub async fn start_bridge_relayer(
    ctx: RelayerContext,
    store: Arc<FileCheckpointStore>,
) -> crate::Result<()> {
    let source_client = Arc::new(ctx.source_provider().await?);
    let destination_provider = ctx.destination_provider().await?;
    let wallet = ctx.signer_wallet().await?;

    // read both network identifiers before doing anything else; a relayer
    // pointed at the wrong endpoint should not get as far as signing.
    let source_chain_id = source_client.get_chainid().await?;
    let destination_chain_id = destination_provider.get_chainid().await?;
    let wallet = wallet.with_chain_id(destination_chain_id.as_u64());
    let signer_address = wallet.address();
    let balance = destination_provider
        .get_balance(signer_address, None)
        .await?;
    if balance.is_zero() {
        tracing::warn!(
            "Signer account {:?} holds no funds on the destination chain; \
             releases will fail until it is topped up",
            signer_address,
        );
    }
    tracing::info!(
        %source_chain_id,
        %destination_chain_id,
        signer = ?signer_address,
        %balance,
        "Connected to both bridge endpoints",
    );
    tracing::event!(
        target: crate::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %crate::probe::Kind::Lifecycle,
        started = true,
        %source_chain_id,
        %destination_chain_id,
        signer = ?signer_address,
    );

    let destination_client =
        Arc::new(SignerMiddleware::new(destination_provider, wallet.clone()));
    let destination_contract = DestinationBridge::new(
        ctx.config.destination_bridge_address,
        destination_client,
    );
    let submitter = ReleaseSubmitter::new(
        destination_contract,
        AuthorizationSigner::new(wallet),
        Duration::from_millis(ctx.config.tx_timeout_ms),
        Duration::from_millis(ctx.config.poll_interval_ms * 2),
    );

    let wrapper =
        SourceBridgeContractWrapper::new(ctx.config.clone(), source_client.clone());
    tracing::debug!(
        "lock watcher for {:?} started.",
        ctx.config.source_bridge_address,
    );
    let watcher = TokensLockedWatcher::new(submitter);
    watcher
        .run(source_client, store, wrapper, ctx.shutdown_signal())
        .await
}
