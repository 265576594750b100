use ethers::providers::{Http, Provider};
use ethers::signers::LocalWallet;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeRelayerConfig;

/// RelayerContext contains the relayer's configuration and shutdown token.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: BridgeRelayerConfig,
    /// Flipped once on SIGINT/SIGTERM; every long-running loop polls it at
    /// its suspension points and winds down cleanly.
    cancel_token: CancellationToken,
}

impl RelayerContext {
    /// Creates a new RelayerContext.
    pub fn new(config: BridgeRelayerConfig) -> Self {
        Self {
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    /// An HTTP provider for the source chain endpoint.
    pub async fn source_provider(&self) -> crate::Result<Provider<Http>> {
        let provider =
            Provider::<Http>::try_from(self.config.source_rpc_url.as_str())?;
        Ok(provider)
    }

    /// An HTTP provider for the destination chain endpoint.
    pub async fn destination_provider(&self) -> crate::Result<Provider<Http>> {
        let provider = Provider::<Http>::try_from(
            self.config.destination_rpc_url.as_str(),
        )?;
        Ok(provider)
    }

    /// The wallet holding the release authority key.
    ///
    /// The chain id is bound later, once the destination endpoint has been
    /// asked for its network identifier.
    pub async fn signer_wallet(&self) -> crate::Result<LocalWallet> {
        let wallet =
            LocalWallet::from_bytes(self.config.signer_secret_key.as_bytes())?;
        Ok(wallet)
    }

    /// Signals all long-running loops to wind down.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// A token a long-running loop can poll, or race sleeps against, to learn
    /// about a requested shutdown.
    pub fn shutdown_signal(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}
