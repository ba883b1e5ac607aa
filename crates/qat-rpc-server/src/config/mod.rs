//! Receiver config loader (strict parsing + environment overrides).

pub mod schema;

use std::fs;

use qat_rpc_core::error::{Result, RpcError};

pub use schema::{
    resolve_ports, ClientConfig, HardwareSection, MetricsSection, PortPair, ReceiverConfig,
    ReceiverSettings, RpcSection, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT,
};

/// Optional YAML config file.
pub const ENV_CONFIG_FILE: &str = "QAT_RPC_CONFIG";
pub const ENV_HOST: &str = "QAT_RPC_HOST";
pub const ENV_RPC_PORT: &str = "QAT_RPC_PORT";
pub const ENV_METRICS_PORT: &str = "QAT_RPC_METRICS_PORT";
pub const ENV_CALIBRATION: &str = "QAT_RPC_CALIBRATION";

/// Defaults, then the optional config file, then environment overrides.
pub fn load() -> Result<ReceiverSettings> {
    load_with(|k| std::env::var(k).ok())
}

pub fn load_with<F>(lookup: F) -> Result<ReceiverSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match lookup(ENV_CONFIG_FILE) {
        Some(path) => load_from_file(&path)?,
        None => ReceiverConfig::default(),
    };
    cfg.apply_env(lookup);
    cfg.resolve()
}

pub fn load_from_file(path: &str) -> Result<ReceiverConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RpcError::Configuration(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ReceiverConfig> {
    let cfg: ReceiverConfig = serde_yaml::from_str(s)
        .map_err(|e| RpcError::Validation(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
