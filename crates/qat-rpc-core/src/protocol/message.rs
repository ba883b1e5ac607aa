//! Request messages.
//!
//! Wire shape is a JSON array whose first element is the kind tag:
//! `["program", program, config]`, `["version"]`, `["couplings"]`,
//! `["qubit_info"]`, `["qpu_info"]`. Clients predating the tag send an
//! untagged `[program, config]` pair, decoded as [`Message::LegacyProgram`].
//!
//! Decoding never panics: every malformed shape is a `Validation` error.

use std::fmt;

use serde_json::Value;

use crate::error::{Result, RpcError};

/// Closed set of kind tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Program,
    Version,
    Couplings,
    QubitInfo,
    QpuInfo,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Program,
        MessageKind::Version,
        MessageKind::Couplings,
        MessageKind::QubitInfo,
        MessageKind::QpuInfo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Program => "program",
            MessageKind::Version => "version",
            MessageKind::Couplings => "couplings",
            MessageKind::QubitInfo => "qubit_info",
            MessageKind::QpuInfo => "qpu_info",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Tagged program submission (wire length 3).
    Program { program: String, config: String },
    /// Untagged program submission from older clients (wire length 2).
    LegacyProgram { program: String, config: String },
    Version,
    Couplings,
    QubitInfo,
    QpuInfo,
}

impl Message {
    pub fn program(program: impl Into<String>, config: impl Into<String>) -> Self {
        Message::Program {
            program: program.into(),
            config: config.into(),
        }
    }

    /// Kind used for routing and metrics. Legacy submissions report `Program`.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Program { .. } | Message::LegacyProgram { .. } => MessageKind::Program,
            Message::Version => MessageKind::Version,
            Message::Couplings => MessageKind::Couplings,
            Message::QubitInfo => MessageKind::QubitInfo,
            Message::QpuInfo => MessageKind::QpuInfo,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Message::LegacyProgram { .. })
    }

    /// Convert into the positional wire shape.
    pub fn to_wire(&self) -> Vec<Value> {
        match self {
            Message::Program { program, config } => vec![
                Value::from(MessageKind::Program.as_str()),
                Value::from(program.as_str()),
                Value::from(config.as_str()),
            ],
            Message::LegacyProgram { program, config } => {
                vec![Value::from(program.as_str()), Value::from(config.as_str())]
            }
            other => vec![Value::from(other.kind().as_str())],
        }
    }

    /// Interpret a positional wire tuple.
    pub fn from_wire(items: &[Value]) -> Result<Self> {
        let Some(first) = items.first() else {
            return Err(RpcError::Validation("empty message".into()));
        };

        let kind = first.as_str().and_then(MessageKind::parse);
        match kind {
            Some(MessageKind::Program) => {
                if items.len() != 3 {
                    return Err(RpcError::Validation(format!(
                        "program message should be of length 3, not {}",
                        items.len()
                    )));
                }
                Ok(Message::Program {
                    program: program_field(&items[1])?,
                    config: config_field(&items[2])?,
                })
            }
            Some(MessageKind::Version) => bare(items, Message::Version),
            Some(MessageKind::Couplings) => bare(items, Message::Couplings),
            Some(MessageKind::QubitInfo) => bare(items, Message::QubitInfo),
            Some(MessageKind::QpuInfo) => bare(items, Message::QpuInfo),
            None if items.len() == 2 => Ok(Message::LegacyProgram {
                program: program_field(&items[0])?,
                config: config_field(&items[1])?,
            }),
            None => Err(RpcError::Validation(format!(
                "unrecognised message kind {first} with length {}",
                items.len()
            ))),
        }
    }
}

fn bare(items: &[Value], msg: Message) -> Result<Message> {
    if items.len() != 1 {
        return Err(RpcError::Validation(format!(
            "{} message takes no payload, got length {}",
            msg.kind(),
            items.len()
        )));
    }
    Ok(msg)
}

fn program_field(v: &Value) -> Result<String> {
    v.as_str().map(str::to_owned).ok_or_else(|| {
        RpcError::Validation(format!("program must be a string, got {}", type_name(v)))
    })
}

/// Configs normally travel pre-serialized; an inline object is accepted too.
fn config_field(v: &Value) -> Result<String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Object(_) => Ok(v.to_string()),
        other => Err(RpcError::Validation(format!(
            "config must be a serialized object, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
