//! # Nub Shared Types
//!
//! Domain types shared between the RPC core (`nub-rpc`) and the CLI
//! front-end (`nub-cli`).
//!
//! The central type is [`SnippetMessage`], the request envelope published to
//! the snippet worker. Its serde encoding is the compatibility contract with
//! the worker side and must not change shape.

pub mod retention;
pub mod snippet;

// Re-export main types
pub use retention::RetentionPeriod;
pub use snippet::SnippetMessage;
