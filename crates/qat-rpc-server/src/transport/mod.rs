//! Transport layer (ZeroMQ REQ/REP).
//!
//! Exposes the socket endpoint and the codec that decodes frames once before
//! they reach the receiver's dispatch.

pub mod codec;
pub mod endpoint;

pub use endpoint::{Address, Endpoint, SocketKind};
