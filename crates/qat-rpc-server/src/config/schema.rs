use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use qat_rpc_core::error::{Result, RpcError};

use crate::hardware::MAX_QUBITS;

pub const DEFAULT_RPC_PORT: u16 = 5556;
pub const DEFAULT_METRICS_PORT: u16 = 9250;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Exclusive bounds for either port.
const PORT_FLOOR: u32 = 1024;
const PORT_CEILING: u32 = 49152;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverConfig {
    #[serde(default)]
    pub rpc: RpcSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub hardware: HardwareSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcSection {
    #[serde(default = "default_rpc_port")]
    pub port: u32,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            port: default_rpc_port(),
            send_timeout_ms: default_send_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl RpcSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=600_000).contains(&self.send_timeout_ms) {
            return Err(RpcError::Validation(
                "rpc.send_timeout_ms must be between 1 and 600000".into(),
            ));
        }
        if self.poll_interval_ms > 1_000 {
            return Err(RpcError::Validation(
                "rpc.poll_interval_ms must be at most 1000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u32,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardwareSection {
    #[serde(default)]
    pub calibration_file: Option<PathBuf>,

    #[serde(default = "default_echo_qubit_count")]
    pub echo_qubit_count: u32,
}

impl Default for HardwareSection {
    fn default() -> Self {
        Self {
            calibration_file: None,
            echo_qubit_count: default_echo_qubit_count(),
        }
    }
}

impl HardwareSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_QUBITS).contains(&self.echo_qubit_count) {
            return Err(RpcError::Validation(format!(
                "hardware.echo_qubit_count must be between 1 and {MAX_QUBITS}"
            )));
        }
        Ok(())
    }
}

impl ReceiverConfig {
    /// Apply `QAT_RPC_PORT`, `QAT_RPC_METRICS_PORT` and `QAT_RPC_CALIBRATION`
    /// from `lookup`. Unparseable ports are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(super::ENV_RPC_PORT) {
            match v.trim().parse() {
                Ok(p) => self.rpc.port = p,
                Err(_) => ignore_unparsed(super::ENV_RPC_PORT, &v),
            }
        }
        if let Some(v) = lookup(super::ENV_METRICS_PORT) {
            match v.trim().parse() {
                Ok(p) => self.metrics.port = p,
                Err(_) => ignore_unparsed(super::ENV_METRICS_PORT, &v),
            }
        }
        if let Some(v) = lookup(super::ENV_CALIBRATION) {
            if !v.trim().is_empty() {
                self.hardware.calibration_file = Some(PathBuf::from(v.trim()));
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rpc.validate()?;
        self.hardware.validate()?;
        Ok(())
    }

    /// Validate and turn into runtime settings, resolving port fallbacks.
    pub fn resolve(self) -> Result<ReceiverSettings> {
        self.validate()?;
        let ports = resolve_ports(self.rpc.port, self.metrics.port);
        Ok(ReceiverSettings {
            rpc_port: ports.rpc,
            metrics_port: ports.metrics,
            metrics_enabled: self.metrics.enabled,
            send_timeout: Duration::from_millis(self.rpc.send_timeout_ms),
            poll_interval: Duration::from_millis(self.rpc.poll_interval_ms),
            calibration_file: self.hardware.calibration_file,
            echo_qubit_count: self.hardware.echo_qubit_count,
        })
    }
}

/// Resolved receiver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverSettings {
    pub rpc_port: u16,
    pub metrics_port: u16,
    pub metrics_enabled: bool,
    pub send_timeout: Duration,
    pub poll_interval: Duration,
    pub calibration_file: Option<PathBuf>,
    pub echo_qubit_count: u32,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        // defaults always validate
        ReceiverConfig::default().resolve().unwrap_or(Self {
            rpc_port: DEFAULT_RPC_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            metrics_enabled: true,
            send_timeout: Duration::from_millis(default_send_timeout_ms()),
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
            calibration_file: None,
            echo_qubit_count: default_echo_qubit_count(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPair {
    pub rpc: u16,
    pub metrics: u16,
}

/// Each port must lie strictly between 1024 and 49152 and the two must differ.
/// Offending values fall back to the defaults with a warning.
pub fn resolve_ports(rpc: u32, metrics: u32) -> PortPair {
    let metrics = checked_port("metrics", metrics, DEFAULT_METRICS_PORT);
    let rpc = checked_port("rpc", rpc, DEFAULT_RPC_PORT);
    if rpc == metrics {
        tracing::warn!(port = rpc, "rpc and metrics ports collide, using defaults");
        return PortPair {
            rpc: DEFAULT_RPC_PORT,
            metrics: DEFAULT_METRICS_PORT,
        };
    }
    PortPair { rpc, metrics }
}

pub(crate) fn checked_port(name: &str, port: u32, default: u16) -> u16 {
    if port > PORT_FLOOR && port < PORT_CEILING {
        if let Ok(p) = u16::try_from(port) {
            return p;
        }
    }
    tracing::warn!(
        name,
        port,
        default,
        "port must lie strictly between {PORT_FLOOR} and {PORT_CEILING}, using default"
    );
    default
}

fn ignore_unparsed(var: &str, value: &str) {
    tracing::warn!(var, value, "ignoring non-numeric port");
}

fn default_rpc_port() -> u32 {
    DEFAULT_RPC_PORT.into()
}
fn default_metrics_port() -> u32 {
    DEFAULT_METRICS_PORT.into()
}
fn default_send_timeout_ms() -> u64 {
    30_000
}
fn default_poll_interval_ms() -> u64 {
    1
}
fn default_echo_qubit_count() -> u32 {
    crate::hardware::DEFAULT_ECHO_QUBITS
}
fn default_true() -> bool {
    true
}

/// Client-side connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub send_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_RPC_PORT,
            send_timeout: Duration::from_millis(default_send_timeout_ms()),
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Defaults overridden by `QAT_RPC_HOST` and `QAT_RPC_PORT`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(host) = lookup(super::ENV_HOST) {
            if !host.trim().is_empty() {
                cfg.host = host.trim().to_string();
            }
        }
        if let Some(v) = lookup(super::ENV_RPC_PORT) {
            match v.trim().parse::<u32>() {
                Ok(p) => cfg.port = checked_port("rpc", p, DEFAULT_RPC_PORT),
                Err(_) => ignore_unparsed(super::ENV_RPC_PORT, &v),
            }
        }
        cfg
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}
