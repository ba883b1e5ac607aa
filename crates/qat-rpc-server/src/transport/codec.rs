//! Frame codec: one JSON document per frame.
//!
//! - Requests => positional JSON array, decoded once into `Message`
//! - Replies  => JSON object, decoded into `Reply`

use serde_json::Value;

use qat_rpc_core::error::{Result, RpcError};
use qat_rpc_core::protocol::{Message, Reply};

pub fn encode_request(msg: &Message) -> Result<Vec<u8>> {
    serde_json::to_vec(&msg.to_wire())
        .map_err(|e| RpcError::Internal(format!("encode request: {e}")))
}

pub fn decode_request(frame: &[u8]) -> Result<Message> {
    let value: Value = serde_json::from_slice(frame)
        .map_err(|e| RpcError::Validation(format!("invalid request frame: {e}")))?;
    match value {
        Value::Array(items) => Message::from_wire(&items),
        other => Err(RpcError::Validation(format!(
            "request must be a JSON array, got {other}"
        ))),
    }
}

pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
    serde_json::to_vec(reply).map_err(|e| RpcError::Internal(format!("encode reply: {e}")))
}

pub fn decode_reply(frame: &[u8]) -> Result<Reply> {
    serde_json::from_slice(frame)
        .map_err(|e| RpcError::Validation(format!("invalid reply frame: {e}")))
}
