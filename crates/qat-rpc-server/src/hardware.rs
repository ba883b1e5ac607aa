//! Hardware model served by the receiver.
//!
//! The model is loaded once at startup (either the built-in echo model or a
//! JSON calibration snapshot) and shared read-only for the receiver's lifetime.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use qat_rpc_core::error::{Result, RpcError};

pub const DEFAULT_ECHO_QUBITS: u32 = 32;

/// Largest model the receiver will serve.
pub const MAX_QUBITS: u32 = 1024;

/// Waveform shapes every model accepts.
const WAVEFORMS: [&str; 5] = ["constant", "gaussian", "gaussian_square", "drag_gaussian", "sech"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QubitCoupling {
    /// Directed pair `(control, target)`.
    pub direction: (u32, u32),
    #[serde(default = "default_quality")]
    pub quality: f64,
}

fn default_quality() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardwareModel {
    pub name: String,
    pub qubit_count: u32,
    #[serde(default)]
    pub couplings: Vec<QubitCoupling>,
    /// Drive frequency per qubit (Hz); missing entries use `DEFAULT_DRIVE_HZ`.
    #[serde(default)]
    pub drive_frequencies: Vec<f64>,
    #[serde(default)]
    pub is_simulator: bool,
}

const DEFAULT_DRIVE_HZ: f64 = 5.0e9;

impl HardwareModel {
    /// Simulated model with a ring of directed couplings `i -> i+1`.
    pub fn echo(qubit_count: u32) -> Self {
        let couplings = if qubit_count < 2 {
            Vec::new()
        } else {
            (0..qubit_count)
                .map(|i| QubitCoupling {
                    direction: (i, (i + 1) % qubit_count),
                    quality: default_quality(),
                })
                .collect()
        };
        Self {
            name: "echo".into(),
            qubit_count,
            couplings,
            drive_frequencies: Vec::new(),
            is_simulator: true,
        }
    }

    /// Load a calibration snapshot. A missing file is a configuration error.
    pub fn load_calibration(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RpcError::Configuration(format!(
                "no such calibration file: {}",
                path.display()
            )));
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| RpcError::Configuration(format!("read {}: {e}", path.display())))?;
        let model: HardwareModel = serde_json::from_str(&raw).map_err(|e| {
            RpcError::Configuration(format!("invalid calibration {}: {e}", path.display()))
        })?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        if self.qubit_count == 0 {
            return Err(RpcError::Configuration("hardware must have at least one qubit".into()));
        }
        if self.qubit_count > MAX_QUBITS {
            return Err(RpcError::Configuration(format!(
                "hardware has {} qubits, at most {MAX_QUBITS} are supported",
                self.qubit_count
            )));
        }
        for c in &self.couplings {
            let (a, b) = c.direction;
            if a >= self.qubit_count || b >= self.qubit_count {
                return Err(RpcError::Configuration(format!(
                    "coupling ({a}, {b}) refers to a qubit outside 0..{}",
                    self.qubit_count
                )));
            }
            if a == b {
                return Err(RpcError::Configuration(format!("qubit {a} coupled to itself")));
            }
        }
        if self.drive_frequencies.len() > self.qubit_count as usize {
            return Err(RpcError::Configuration(
                "more drive frequencies than qubits".into(),
            ));
        }
        Ok(())
    }

    /// Coupling directions in model order.
    pub fn coupling_directions(&self) -> Vec<(u32, u32)> {
        self.couplings.iter().map(|c| c.direction).collect()
    }

    fn drive_frequency(&self, qubit: u32) -> f64 {
        self.drive_frequencies
            .get(qubit as usize)
            .copied()
            .unwrap_or(DEFAULT_DRIVE_HZ)
    }

    /// Pulse-level feature description returned for QPU info queries.
    pub fn features(&self) -> Value {
        let mut ports = BTreeMap::new();
        let mut frames = BTreeMap::new();
        for q in 0..self.qubit_count {
            let drive = format!("channel_q{q}_drive");
            let measure = format!("channel_q{q}_measure");
            ports.insert(drive.clone(), json!({"qubit": q, "kind": "drive", "direction": "tx"}));
            ports.insert(
                measure.clone(),
                json!({"qubit": q, "kind": "measure", "direction": "rx"}),
            );
            frames.insert(
                format!("q{q}_drive"),
                json!({"port": drive, "frequency": self.drive_frequency(q), "phase": 0.0}),
            );
        }
        for c in &self.couplings {
            let (a, b) = c.direction;
            frames.insert(
                format!("q{a}_q{b}_cross_resonance"),
                json!({
                    "port": format!("channel_q{a}_drive"),
                    "frequency": self.drive_frequency(b),
                    "phase": 0.0,
                }),
            );
        }

        json!({
            "open_pulse": {
                "version": "1.0.0",
                "ports": ports,
                "frames": frames,
                "waveforms": WAVEFORMS,
                "constraints": {
                    "max_scale": 1.0,
                    "qubit_count": self.qubit_count,
                    "simulator": self.is_simulator,
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn echo_model_is_a_ring() {
        let hw = HardwareModel::echo(4);
        assert_eq!(hw.coupling_directions(), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert!(hw.validate().is_ok());
        assert!(HardwareModel::echo(1).couplings.is_empty());
    }

    #[test]
    fn features_cover_every_qubit() {
        let hw = HardwareModel::echo(2);
        let f = hw.features();
        let ports = f["open_pulse"]["ports"].as_object().unwrap();
        assert_eq!(ports.len(), 4);
        assert!(ports.contains_key("channel_q1_measure"));
        assert_eq!(f["open_pulse"]["frames"]["q0_drive"]["frequency"], DEFAULT_DRIVE_HZ);
        assert_eq!(f["open_pulse"]["constraints"]["qubit_count"], 2);
    }

    #[test]
    fn missing_calibration_is_configuration_error() {
        let err = HardwareModel::load_calibration(Path::new("/nonexistent/cal.json")).unwrap_err();
        assert_eq!(err.kind(), qat_rpc_core::ErrorKind::Configuration);
    }

    #[test]
    fn calibration_round_trips_through_disk() {
        let mut hw = HardwareModel::echo(3);
        hw.name = "lab".into();
        hw.drive_frequencies = vec![4.9e9, 5.1e9];

        let path = std::env::temp_dir().join(format!("qat-rpc-cal-{}.json", std::process::id()));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(serde_json::to_string(&hw).unwrap().as_bytes()).unwrap();
        drop(f);

        let loaded = HardwareModel::load_calibration(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, hw);
    }

    #[test]
    fn oversized_model_is_rejected() {
        let hw = HardwareModel::echo(MAX_QUBITS + 1);
        let err = hw.validate().unwrap_err();
        assert_eq!(err.kind(), qat_rpc_core::ErrorKind::Configuration);
        assert!(HardwareModel::echo(MAX_QUBITS).validate().is_ok());
    }

    #[test]
    fn out_of_range_coupling_is_rejected() {
        let mut hw = HardwareModel::echo(2);
        hw.couplings.push(QubitCoupling { direction: (0, 7), quality: 1.0 });
        assert!(hw.validate().is_err());
    }
}
