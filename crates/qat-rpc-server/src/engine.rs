//! Execution engines.
//!
//! The receiver treats execution as an opaque capability:
//! `execute(program, config) -> (results, metrics)`. [`EchoEngine`] is the
//! in-tree implementation backing the echo hardware model: it checks the
//! program against the model and returns all-zero measurements.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use qat_rpc_core::config::{CompilerConfig, ResultsFormat};
use qat_rpc_core::error::{Result, RpcError};

use crate::hardware::HardwareModel;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    pub results: Value,
    pub metrics: Value,
}

pub trait ExecutionEngine: Send + Sync {
    fn execute(&self, program: &str, config: &CompilerConfig) -> Result<ExecutionOutput>;
}

/// Most measurement values a single raw-format reply may carry.
pub const MAX_RAW_RESULT_VALUES: u64 = 1 << 20;

#[derive(Debug, Clone)]
pub struct EchoEngine {
    hardware: Arc<HardwareModel>,
}

/// A `qreg`/`creg` declaration.
#[derive(Debug, PartialEq, Eq)]
struct Register {
    name: String,
    size: u32,
}

impl EchoEngine {
    pub fn new(hardware: Arc<HardwareModel>) -> Self {
        Self { hardware }
    }
}

impl ExecutionEngine for EchoEngine {
    fn execute(&self, program: &str, config: &CompilerConfig) -> Result<ExecutionOutput> {
        let source = program.trim();
        if source.is_empty() {
            return Err(RpcError::Engine("empty program".into()));
        }
        if !source.starts_with("OPENQASM") {
            return Err(RpcError::Engine(
                "unsupported program format: expected OPENQASM source".into(),
            ));
        }

        let statements: Vec<&str> = source
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let mut qubits = 0u32;
        let mut cregs = Vec::new();
        for stmt in &statements {
            if let Some(decl) = stmt.strip_prefix("qreg ") {
                qubits = qubits.saturating_add(parse_register(decl)?.size);
            } else if let Some(decl) = stmt.strip_prefix("creg ") {
                cregs.push(parse_register(decl)?);
            }
        }
        if qubits > self.hardware.qubit_count {
            return Err(RpcError::Engine(format!(
                "program needs {qubits} qubits, hardware {} has {}",
                self.hardware.name, self.hardware.qubit_count
            )));
        }
        self.check_result_size(&cregs, config)?;

        let mut results = Map::new();
        for reg in &cregs {
            let zeros = "0".repeat(reg.size as usize);
            let value = match config.results_format {
                ResultsFormat::BinaryCount => {
                    let mut histogram = Map::new();
                    histogram.insert(zeros, Value::from(config.repeats));
                    Value::Object(histogram)
                }
                ResultsFormat::Raw => {
                    let shot = vec![0u8; reg.size as usize];
                    Value::from(vec![shot; config.repeats as usize])
                }
            };
            results.insert(reg.name.clone(), value);
        }

        Ok(ExecutionOutput {
            results: Value::Object(results),
            metrics: json!({
                "optimized_circuit": source,
                "optimized_instruction_count": statements.len(),
            }),
        })
    }
}

impl EchoEngine {
    /// Results are sized before anything is allocated for them.
    fn check_result_size(&self, cregs: &[Register], config: &CompilerConfig) -> Result<()> {
        let mut bits = 0u64;
        for reg in cregs {
            if reg.size > self.hardware.qubit_count {
                return Err(RpcError::Engine(format!(
                    "classical register {} has {} bits, hardware {} has {} qubits",
                    reg.name, reg.size, self.hardware.name, self.hardware.qubit_count
                )));
            }
            bits = bits.saturating_add(u64::from(reg.size));
        }
        if config.results_format == ResultsFormat::Raw {
            let values = bits
                .checked_mul(u64::from(config.repeats))
                .filter(|v| *v <= MAX_RAW_RESULT_VALUES);
            if values.is_none() {
                return Err(RpcError::Engine(format!(
                    "{} shots of {bits} bits exceed the raw limit of {MAX_RAW_RESULT_VALUES}",
                    config.repeats
                )));
            }
        }
        Ok(())
    }
}

fn parse_register(decl: &str) -> Result<Register> {
    let malformed = || RpcError::Engine(format!("malformed register declaration: {decl}"));
    let (name, rest) = decl.split_once('[').ok_or_else(malformed)?;
    let size = rest
        .strip_suffix(']')
        .and_then(|n| n.trim().parse::<u32>().ok())
        .ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }
    Ok(Register {
        name: name.to_string(),
        size,
    })
}
