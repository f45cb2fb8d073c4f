//! # Nub Test Suite
//!
//! Unified test crate for the workspace.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/        # Full call-flow tests
//!     ├── broker_double.rs  # In-memory broker + session double
//!     └── rpc_flow.rs       # Publish, correlate, deadline, teardown
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p nub-tests
//!
//! # By category
//! cargo test -p nub-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
