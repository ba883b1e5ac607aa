//! qat-rpc server library entry.
//!
//! This crate wires the ZeroMQ transport, the receiver loop, the client, and
//! the metrics façade into a deployable RPC stack. It is consumed by the
//! `qat-rpc-receiver` and `qat-run` binaries and by integration tests.

pub mod app_state;
pub mod client;
pub mod config;
pub mod engine;
pub mod hardware;
pub mod obs;
pub mod ops;
pub mod receiver;
pub mod router;
pub mod transport;

pub use client::{Client, ConfigArg};
pub use receiver::{Receiver, ReceiverOptions, ReceiverState, ShutdownToken, StopHandle};
