//! Top-level facade crate for qat-rpc.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use qat_rpc_core::*;
}

pub mod server {
    pub use qat_rpc_server::*;
}
