use derive_more::Display;

/// The target used for all machine-readable probe events.
pub const TARGET: &str = "lockbridge_probe";

/// The Kind of the Probe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// When the Lifecycle of the Relayer changes, like starting or shutting down.
    #[display(fmt = "lifecycle")]
    Lifecycle,
    /// Relayer Sync state on the source chain.
    #[display(fmt = "sync")]
    Sync,
    /// Relaying a release transaction state.
    #[display(fmt = "relay_tx")]
    RelayTx,
}
