//! Blocking RPC client.
//!
//! One call per message kind. Each call sends through the retrying endpoint
//! (bounded by the send timeout) and then waits for the reply with no upper
//! bound, sleeping the poll interval between checks.

use std::thread;
use std::time::Duration;

use qat_rpc_core::config::CompilerConfig;
use qat_rpc_core::error::Result;
use qat_rpc_core::protocol::{Message, Reply};

use crate::config::ClientConfig;
use crate::transport::{codec, Address, Endpoint};

/// Compiler config argument for [`Client::execute_task`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConfigArg {
    #[default]
    Default,
    Value(CompilerConfig),
    /// Already-serialized JSON; checked locally before it is sent.
    Serialized(String),
}

impl ConfigArg {
    /// Serialized form to put on the wire.
    pub fn resolve(self) -> Result<String> {
        match self {
            ConfigArg::Default => CompilerConfig::default().to_json(),
            ConfigArg::Value(cfg) => cfg.to_json(),
            ConfigArg::Serialized(raw) => {
                CompilerConfig::from_json(&raw)?;
                Ok(raw)
            }
        }
    }
}

impl From<CompilerConfig> for ConfigArg {
    fn from(cfg: CompilerConfig) -> Self {
        ConfigArg::Value(cfg)
    }
}

impl From<String> for ConfigArg {
    fn from(raw: String) -> Self {
        ConfigArg::Serialized(raw)
    }
}

impl From<&str> for ConfigArg {
    fn from(raw: &str) -> Self {
        ConfigArg::Serialized(raw.to_string())
    }
}

impl From<Option<CompilerConfig>> for ConfigArg {
    fn from(cfg: Option<CompilerConfig>) -> Self {
        cfg.map_or(ConfigArg::Default, ConfigArg::Value)
    }
}

#[derive(Debug)]
pub struct Client {
    endpoint: Endpoint,
    poll_interval: Duration,
}

impl Client {
    /// Open a request socket to `tcp://host:port`.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let endpoint = Endpoint::connect_request(&config.host, config.port)?
            .with_send_timeout(config.send_timeout);
        Ok(Self {
            endpoint,
            poll_interval: config.poll_interval,
        })
    }

    pub fn address(&self) -> &Address {
        self.endpoint.address()
    }

    /// Submit a program. A malformed serialized config fails here, before any traffic.
    pub fn execute_task(&mut self, program: &str, config: impl Into<ConfigArg>) -> Result<Reply> {
        let config = config.into().resolve()?;
        self.request(&Message::program(program, config))
    }

    pub fn api_version(&mut self) -> Result<Reply> {
        self.request(&Message::Version)
    }

    pub fn qpu_couplings(&mut self) -> Result<Reply> {
        self.request(&Message::Couplings)
    }

    pub fn qubit_info(&mut self) -> Result<Reply> {
        self.request(&Message::QubitInfo)
    }

    pub fn qpu_info(&mut self) -> Result<Reply> {
        self.request(&Message::QpuInfo)
    }

    pub fn close(&mut self) {
        self.endpoint.close();
    }

    fn request(&mut self, message: &Message) -> Result<Reply> {
        let frame = codec::encode_request(message)?;
        self.endpoint.send(&frame)?;
        tracing::debug!(kind = %message.kind(), address = %self.endpoint.address(), "request sent");
        loop {
            if let Some(reply) = self.endpoint.try_recv()? {
                return codec::decode_reply(&reply);
            }
            thread::sleep(self.poll_interval);
        }
    }
}
