//! Request/reply data model.
//!
//! - Requests: positional tuples tagged by [`MessageKind`], decoded into the
//!   [`Message`] sum type (with an explicit legacy variant).
//! - Replies: string-keyed objects, either domain-shaped or a single
//!   `Exception` entry.
//!
//! Framing and bytes live in the server's transport codec; this module only
//! deals with shapes, so it stays usable without a socket.

pub mod message;
pub mod reply;

pub use message::{Message, MessageKind};
pub use reply::Reply;
