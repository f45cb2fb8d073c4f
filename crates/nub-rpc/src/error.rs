//! Error types for the RPC core.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by one RPC exchange.
///
/// Every failure is a single terminal result per call; the core never
/// retries on its own. Retry policy, if any, belongs to the surrounding
/// application.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The broker connection or channel could not be established.
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// The reply queue declare or the consumer registration was rejected.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The request could not be serialized or published.
    #[error("Failed to publish request: {0}")]
    PublishError(String),

    /// No matching reply arrived within the deadline.
    #[error("No reply within {elapsed:?}")]
    Timeout {
        /// The deadline that elapsed.
        elapsed: Duration,
    },

    /// The channel or connection closed while waiting for the reply.
    #[error("Connection lost while waiting for a reply")]
    ConnectivityLost,
}
