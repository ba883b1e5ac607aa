//! The RPC receiver: a single-threaded REQ/REP server loop.
//!
//! Lifecycle: `Created -> Bound -> Running -> Stopped`.
//!
//! The loop polls the reply socket without blocking, decodes each frame once
//! into a [`Message`], dispatches it and sends exactly one reply per request.
//! Every failure that belongs to a single request becomes an `Exception` reply
//! and bumps `failed_messages`; only transport failures end the loop.
//!
//! Shutdown is cooperative: a [`ShutdownToken`] is handed in at construction
//! and [`StopHandle::stop`] (callable from any thread, e.g. a signal task)
//! flips it. The loop notices on its next iteration.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

use qat_rpc_core::config::CompilerConfig;
use qat_rpc_core::error::{Result, RpcError};
use qat_rpc_core::protocol::reply::{
    COUPLINGS_KEY, EXECUTION_METRICS_KEY, QPU_INFO_KEY, RESULTS_KEY, VERSION_KEY,
};
use qat_rpc_core::protocol::{Message, Reply};

use crate::config::ReceiverSettings;
use crate::engine::ExecutionEngine;
use crate::hardware::HardwareModel;
use crate::obs::MetricExporter;
use crate::transport::{codec, Address, Endpoint};

/// Reported in `Version` replies.
pub const RPC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on flushing the last reply when the loop ends.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Created,
    Bound,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverOptions {
    pub port: u16,
    pub send_timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&ReceiverSettings> for ReceiverOptions {
    fn from(s: &ReceiverSettings) -> Self {
        Self {
            port: s.rpc_port,
            send_timeout: s.send_timeout,
            poll_interval: s.poll_interval,
        }
    }
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        Self::from(&ReceiverSettings::default())
    }
}

/// One-shot shutdown flag shared between the loop and its stop handles.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that actually flipped the flag.
    pub fn trigger(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Cloneable, thread-safe way to end a running receiver.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shutdown: ShutdownToken,
    metrics: MetricExporter,
}

impl StopHandle {
    /// Request shutdown. Only the first call reports the status change; `run()`
    /// reasserts it once the loop has ended.
    pub fn stop(&self) {
        if self.shutdown.trigger() {
            tracing::info!("receiver stop requested");
            self.metrics.receiver_status().fail();
        }
    }
}

pub struct Receiver {
    state: ReceiverState,
    options: ReceiverOptions,
    endpoint: Option<Endpoint>,
    hardware: Arc<HardwareModel>,
    engine: Arc<dyn ExecutionEngine>,
    metrics: MetricExporter,
    shutdown: ShutdownToken,
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("endpoint", &self.endpoint)
            .field("hardware", &self.hardware.name)
            .finish_non_exhaustive()
    }
}

impl Receiver {
    pub fn new(
        options: ReceiverOptions,
        hardware: Arc<HardwareModel>,
        engine: Arc<dyn ExecutionEngine>,
        metrics: MetricExporter,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            state: ReceiverState::Created,
            options,
            endpoint: None,
            hardware,
            engine,
            metrics,
            shutdown,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn address(&self) -> Option<&Address> {
        self.endpoint.as_ref().map(Endpoint::address)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shutdown: self.shutdown.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Create and bind the reply socket on `tcp://*:<port>`.
    pub fn bind(&mut self) -> Result<()> {
        if self.state != ReceiverState::Created {
            return Err(RpcError::Internal(format!(
                "cannot bind a receiver in state {:?}",
                self.state
            )));
        }
        let endpoint =
            Endpoint::bind_reply(self.options.port)?.with_send_timeout(self.options.send_timeout);
        self.endpoint = Some(endpoint);
        self.state = ReceiverState::Bound;
        Ok(())
    }

    /// Serve requests until shutdown. Returns `Err` only for transport failures.
    pub fn run(&mut self) -> Result<()> {
        if self.state != ReceiverState::Bound {
            return Err(RpcError::Internal(format!(
                "cannot run a receiver in state {:?}",
                self.state
            )));
        }
        self.state = ReceiverState::Running;

        let result = self.serve();

        self.state = ReceiverState::Stopped;
        if let Some(mut endpoint) = self.endpoint.take() {
            endpoint.close_draining(SHUTDOWN_DRAIN);
        }
        // the success report may have landed after a concurrent stop()
        self.shutdown.trigger();
        self.metrics.receiver_status().fail();
        match &result {
            Ok(()) => tracing::info!("receiver stopped"),
            Err(e) => tracing::error!(error = %e, "receiver loop failed"),
        }
        result
    }

    fn serve(&self) -> Result<()> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| RpcError::Internal("receiver has no endpoint".into()))?;

        if !self.shutdown.is_triggered() {
            self.metrics.receiver_status().succeed();
        }
        tracing::info!(address = %endpoint.address(), "receiver running");

        while !self.shutdown.is_triggered() && !endpoint.is_closed() {
            let Some(frame) = endpoint.try_recv()? else {
                thread::sleep(self.options.poll_interval);
                continue;
            };
            let reply = self.handle_frame(&frame);
            endpoint.send(&encode(&reply))?;
        }
        Ok(())
    }

    /// Turn one request frame into its reply, recording the outcome.
    pub fn handle_frame(&self, frame: &[u8]) -> Reply {
        match codec::decode_request(frame).and_then(|msg| self.interpret(msg)) {
            Ok(reply) => {
                self.metrics.executed_messages().increment();
                reply
            }
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), error = %e, "request failed");
                self.metrics.failed_messages().increment();
                Reply::exception(&e)
            }
        }
    }

    fn interpret(&self, message: Message) -> Result<Reply> {
        tracing::debug!(kind = %message.kind(), legacy = message.is_legacy(), "request");
        match message {
            Message::Program { program, config } | Message::LegacyProgram { program, config } => {
                self.program(&program, &config)
            }
            Message::Version => Ok(Reply::new().with(VERSION_KEY, RPC_VERSION)),
            Message::Couplings => Ok(self.couplings()),
            Message::QubitInfo => Err(RpcError::NotImplemented(
                "qubit info is not available on this receiver".into(),
            )),
            Message::QpuInfo => Ok(Reply::new().with(QPU_INFO_KEY, self.hardware.features())),
        }
    }

    fn program(&self, program: &str, config: &str) -> Result<Reply> {
        let config = CompilerConfig::from_json(config)?;
        let engine = Arc::clone(&self.engine);
        let output = panic::catch_unwind(AssertUnwindSafe(|| engine.execute(program, &config)))
            .map_err(|_| RpcError::Engine("execution engine panicked".into()))??;
        Ok(Reply::new()
            .with(RESULTS_KEY, output.results)
            .with(EXECUTION_METRICS_KEY, output.metrics))
    }

    fn couplings(&self) -> Reply {
        let pairs: Vec<Value> = self
            .hardware
            .coupling_directions()
            .into_iter()
            .map(|(a, b)| Value::from(vec![a, b]))
            .collect();
        Reply::new().with(COUPLINGS_KEY, pairs)
    }
}

const ENCODING_FAILED: &[u8] = br#"{"Exception":"InternalError('reply encoding failed')"}"#;

fn encode(reply: &Reply) -> Vec<u8> {
    codec::encode_reply(reply).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "reply not encodable, sending exception instead");
        let fallback = Reply::exception(&e);
        codec::encode_reply(&fallback).unwrap_or_else(|_| ENCODING_FAILED.to_vec())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EchoEngine, ExecutionOutput};
    use crate::obs::sink::recording::RecordingSink;
    use crate::obs::MetricsSink;
    use qat_rpc_core::protocol::reply::EXCEPTION_KEY;
    use serde_json::json;

    struct PanickingEngine;

    impl ExecutionEngine for PanickingEngine {
        fn execute(&self, _: &str, _: &CompilerConfig) -> Result<ExecutionOutput> {
            panic!("engine blew up")
        }
    }

    const PROGRAM: &str = "OPENQASM 2.0; qreg q[2]; creg c[2]; measure q->c;";

    fn receiver_with(engine: Arc<dyn ExecutionEngine>) -> (Receiver, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let exporter = MetricExporter::from_arc(Arc::clone(&sink) as Arc<dyn MetricsSink>);
        let hardware = Arc::new(HardwareModel::echo(4));
        let receiver = Receiver::new(
            ReceiverOptions::default(),
            hardware,
            engine,
            exporter,
            ShutdownToken::new(),
        );
        (receiver, sink)
    }

    fn receiver() -> (Receiver, Arc<RecordingSink>) {
        let hardware = Arc::new(HardwareModel::echo(4));
        receiver_with(Arc::new(EchoEngine::new(hardware)))
    }

    fn frame(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn program_reply_carries_results_and_metrics() {
        let (rx, sink) = receiver();
        let cfg = r#"{"repeats": 100, "results_format": "binary_count"}"#;
        let reply = rx.handle_frame(&frame(json!(["program", PROGRAM, cfg])));

        assert_eq!(reply[RESULTS_KEY], json!({"c": {"00": 100}}));
        assert!(reply.get(EXECUTION_METRICS_KEY).is_some());
        assert_eq!(sink.calls_to("executed_messages"), vec![1.0]);
        assert!(sink.calls_to("failed_messages").is_empty());
    }

    #[test]
    fn legacy_program_is_executed() {
        let (rx, _) = receiver();
        let reply = rx.handle_frame(&frame(json!([PROGRAM, r#"{"repeats": 5}"#])));
        assert!(!reply.is_exception());
        assert_eq!(reply[RESULTS_KEY]["c"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn qubit_info_is_not_implemented() {
        let (rx, sink) = receiver();
        let reply = rx.handle_frame(&frame(json!(["qubit_info"])));
        assert_eq!(reply.keys().collect::<Vec<_>>(), vec![EXCEPTION_KEY]);
        assert!(reply.exception_text().unwrap().starts_with("NotImplementedError("));
        assert_eq!(sink.calls_to("failed_messages"), vec![1.0]);
    }

    #[test]
    fn introspection_replies() {
        let (rx, _) = receiver();
        let version = rx.handle_frame(&frame(json!(["version"])));
        assert_eq!(version[VERSION_KEY], RPC_VERSION);

        let couplings = rx.handle_frame(&frame(json!(["couplings"])));
        assert_eq!(couplings[COUPLINGS_KEY], json!([[0, 1], [1, 2], [2, 3], [3, 0]]));

        let info = rx.handle_frame(&frame(json!(["qpu_info"])));
        assert!(info[QPU_INFO_KEY]["open_pulse"].is_object());
    }

    #[test]
    fn bad_frames_become_exceptions() {
        let (rx, sink) = receiver();
        for bad in [
            b"not json".to_vec(),
            frame(json!(["program", PROGRAM])),
            frame(json!(["program", 7, "{}"])),
            frame(json!(["program", PROGRAM, "{not json"])),
            frame(json!(["reboot", 1, 2])),
        ] {
            let reply = rx.handle_frame(&bad);
            assert!(reply.is_exception(), "{reply:?}");
        }
        assert_eq!(sink.calls_to("failed_messages").len(), 5);
        assert!(sink.calls_to("executed_messages").is_empty());
    }

    #[test]
    fn oversized_program_gets_an_exception_reply() {
        let (rx, sink) = receiver();
        let reply = rx.handle_frame(&frame(json!([
            "program",
            "OPENQASM 2.0; creg c[100000];",
            r#"{"repeats": 100000}"#
        ])));
        assert!(reply.exception_text().unwrap().starts_with("EngineExecutionError("));
        assert_eq!(sink.calls_to("failed_messages"), vec![1.0]);
    }

    #[test]
    fn engine_panic_is_reported_as_engine_error() {
        let (rx, _) = receiver_with(Arc::new(PanickingEngine));
        let reply = rx.handle_frame(&frame(json!(["program", PROGRAM, "{}"])));
        assert!(reply.exception_text().unwrap().starts_with("EngineExecutionError("));
    }

    #[test]
    fn stop_reports_failure_once() {
        let (rx, sink) = receiver();
        let handle = rx.stop_handle();
        handle.stop();
        handle.clone().stop();
        assert_eq!(sink.calls_to("receiver_status"), vec![0.0]);
        assert!(rx.shutdown.is_triggered());
    }

    #[test]
    fn run_requires_bind() {
        let (mut rx, _) = receiver();
        assert!(rx.run().is_err());
        assert_eq!(rx.state(), ReceiverState::Created);
    }

    #[test]
    fn shutdown_token_triggers_once() {
        let token = ShutdownToken::new();
        let other = token.clone();
        assert!(token.trigger());
        assert!(!other.trigger());
        assert!(other.is_triggered());
    }
}
