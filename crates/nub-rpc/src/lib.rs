//! # Nub RPC - Request/Reply over the Message Broker
//!
//! Implements the classic RPC-over-messaging pattern against the snippet
//! worker: a durable, well-known request queue and a throwaway per-call
//! reply queue matched by a correlation token.
//!
//! ## Call Anatomy
//!
//! ```text
//! ┌──────────┐  declare + consume    ┌──────────────────┐
//! │  caller  │ ────────────────────→ │ reply queue      │ (exclusive,
//! │          │                       │ (broker-named)   │  auto-delete)
//! │          │                       └──────────────────┘
//! │          │  publish(token, reply-to)     ↑
//! │          │ ────────────────────→ rpc_queue → worker ─┘
//! │          │ ←─ first reply whose correlation token matches
//! └──────────┘    (or deadline expiry, or connection loss)
//! ```
//!
//! The reply queue is declared and consumed from *before* the request is
//! published, so a fast worker cannot reply into the void. The whole
//! publish-then-wait exchange is bounded by a single deadline; timeout and
//! connection loss are first-class exits, not afterthoughts.
//!
//! Each call owns its own reply queue, so no correlation table is shared
//! between concurrent calls.

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod token;

// Re-export main types
pub use client::SnippetRpcClient;
pub use config::BrokerConfig;
pub use error::RpcError;
pub use session::{AmqpSession, BrokerSession, ReplyDelivery, ReplyQueue};

use std::time::Duration;

/// Well-known request queue name agreed with the worker side.
pub const REQUEST_QUEUE: &str = "rpc_queue";

/// Length of the correlation token attached to each request.
pub const TOKEN_LENGTH: usize = 32;

/// Default deadline bounding one publish-then-wait exchange.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum replies buffered per call before backpressure.
pub const REPLY_BUFFER_CAPACITY: usize = 16;
