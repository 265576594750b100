use ethers::types::U256;

/// An enum of all possible errors that could be encountered during the
/// execution of the bridge relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Error in Http Provider (ethers client).
    #[error(transparent)]
    EthersProvider(#[from] ethers::providers::ProviderError),
    /// Error while loading the authority key into a wallet.
    #[error(transparent)]
    EthersWallet(#[from] ethers::signers::WalletError),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// RPC connectivity failure against one of the chain endpoints.
    #[error("Transport error: {}", _0)]
    Transport(String),
    /// The destination signer account cannot pay for a release transaction.
    ///
    /// Surfaces out of the submitter only after the bounded funding retry is
    /// exhausted, so the supervisor treats it as fatal.
    #[error("Insufficient funds on the destination signer account")]
    InsufficientFunds,
    /// No receipt arrived for a release transaction within the configured
    /// timeout.
    #[error("Timed out waiting for the release receipt of sequence {}", sequence)]
    ReceiptTimeout {
        /// The sequence number of the release left in flight.
        sequence: U256,
    },
    /// The release transaction vanished from the mempool before being mined.
    #[error("Release of sequence {} dropped from the mempool", sequence)]
    TxDropped {
        /// The sequence number of the dropped release.
        sequence: U256,
    },
    /// The destination bridge rejected the authorization signature.
    #[error("Destination bridge rejected the authorization: {}", reason)]
    InvalidAuthority {
        /// The revert reason reported by the destination bridge.
        reason: String,
    },
    /// The destination bridge reverted for a reason a retry cannot fix.
    #[error("Destination bridge rejected sequence {}: {}", sequence, reason)]
    UnexpectedRevert {
        /// The sequence number of the rejected release.
        sequence: U256,
        /// The revert reason reported by the destination bridge.
        reason: String,
    },
    /// The release transaction was mined but reverted on-chain.
    #[error("Release of sequence {} reverted on-chain", sequence)]
    ReleaseReverted {
        /// The sequence number of the reverted release.
        sequence: U256,
    },
}

impl Error {
    /// Wraps any client-side failure as a retryable transport error.
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }

    /// Whether this failure indicates a misconfiguration that retrying can
    /// never fix, ending the relayer with a non-zero exit status.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidAuthority { .. }
                | Self::UnexpectedRevert { .. }
                | Self::ReleaseReverted { .. }
                | Self::InsufficientFunds
        )
    }
}

/// A type alias for the result used across the bridge relayer.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        assert!(!Error::transport("connection refused").is_fatal());
        assert!(!Error::ReceiptTimeout { sequence: 9.into() }.is_fatal());
        assert!(!Error::TxDropped { sequence: 9.into() }.is_fatal());
    }

    #[test]
    fn contract_rejections_are_fatal() {
        let e = Error::InvalidAuthority {
            reason: "Bridge: Invalid signature.".into(),
        };
        assert!(e.is_fatal());
        let e = Error::UnexpectedRevert {
            sequence: 3.into(),
            reason: "Bridge: Amount must be greater than zero.".into(),
        };
        assert!(e.is_fatal());
    }
}
