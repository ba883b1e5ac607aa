//! qat-rpc core: transport-agnostic protocol shapes, outcome types, and errors.
//!
//! This crate defines the request/reply contracts and the error surface shared
//! by the receiver, the client, and the metrics façade. It carries no socket or
//! runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `RpcError`/`Result` so a malformed
//! request can never take the receiver down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod error;
pub mod outcome;
pub mod protocol;

pub use config::{CompilerConfig, ResultsFormat};
pub use error::{ErrorKind, Result, RpcError};
pub use outcome::{BinaryOutcome, IncrementOutcome, Outcome};
pub use protocol::{Message, MessageKind, Reply};
