//! qat-rpc receiver
//!
//! - Config: defaults -> optional YAML (`QAT_RPC_CONFIG`) -> env overrides
//! - Metrics: Prometheus registry + ops endpoint, or a null sink when disabled
//! - Hardware: calibration snapshot if configured, echo model otherwise
//! - SIGINT/SIGTERM stop the receiver; the process exits once the loop unwinds

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use qat_rpc_core::error::{Result, RpcError};
use qat_rpc_server::{
    app_state::OpsState,
    config::{self, ReceiverSettings},
    engine::EchoEngine,
    hardware::HardwareModel,
    obs::{MetricExporter, NullSink, PrometheusSink, ReceiverMetrics},
    receiver::{Receiver, ReceiverOptions, ShutdownToken, StopHandle},
    router,
};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "receiver exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = config::load()?;
    tracing::info!(
        rpc_port = settings.rpc_port,
        metrics_port = settings.metrics_port,
        metrics = settings.metrics_enabled,
        "qat-rpc-receiver starting"
    );

    let exporter = if settings.metrics_enabled {
        let registry = Arc::new(ReceiverMetrics::default());
        let ops = OpsState::new(Arc::clone(&registry));
        let port = settings.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = router::serve_ops(port, ops).await {
                tracing::error!(error = %e, "ops endpoint stopped");
            }
        });
        MetricExporter::new(PrometheusSink::new(registry))
    } else {
        MetricExporter::new(NullSink)
    };

    let hardware = Arc::new(load_hardware(&settings, &exporter)?);
    exporter.hardware_connected().succeed();
    tracing::info!(
        hardware = %hardware.name,
        qubits = hardware.qubit_count,
        "hardware ready"
    );

    let engine = Arc::new(EchoEngine::new(Arc::clone(&hardware)));
    let mut receiver = Receiver::new(
        ReceiverOptions::from(&settings),
        hardware,
        engine,
        exporter,
        ShutdownToken::new(),
    );
    receiver.bind()?;

    tokio::spawn(stop_on_signal(receiver.stop_handle()));

    tokio::task::spawn_blocking(move || receiver.run())
        .await
        .map_err(|e| RpcError::Internal(format!("receiver thread failed: {e}")))?
}

fn load_hardware(settings: &ReceiverSettings, exporter: &MetricExporter) -> Result<HardwareModel> {
    let Some(path) = settings.calibration_file.as_deref() else {
        return Ok(HardwareModel::echo(settings.echo_qubit_count));
    };
    let mut reloaded = exporter.hardware_reloaded();
    match HardwareModel::load_calibration(path) {
        Ok(model) => {
            reloaded.succeed();
            tracing::info!(path = %path.display(), "calibration loaded");
            Ok(model)
        }
        Err(e) => {
            reloaded.fail();
            Err(e)
        }
    }
}

async fn stop_on_signal(handle: StopHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, stopping receiver");
    handle.stop();
}
