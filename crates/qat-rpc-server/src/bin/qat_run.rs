//! qat-run: submit one program to a receiver and print the reply.
//!
//! Program and config arguments that name an existing file are read from disk.
//! Exits non-zero when the receiver answers with an `Exception`.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;

use qat_rpc_server::config::ClientConfig;
use qat_rpc_server::{Client, ConfigArg};

#[derive(Parser)]
#[command(
    name = "qat-run",
    about = "Submit a program to a qat-rpc receiver and print the reply",
    version
)]
struct Cli {
    /// Program source, or a path to a file containing it
    program: String,
    /// Compiler config as JSON, or a path to a JSON file
    #[arg(short, long)]
    config: Option<String>,
    /// Receiver host (default: $QAT_RPC_HOST or 127.0.0.1)
    #[arg(long)]
    host: Option<String>,
    /// Receiver port, strictly between 1024 and 49152 (default: $QAT_RPC_PORT or 5556)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1025..49152))]
    port: Option<u16>,
}

/// Read `arg` from disk when it names an existing file, else use it verbatim.
fn inline_or_file(arg: &str) -> anyhow::Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        return fs::read_to_string(path).with_context(|| format!("reading {}", path.display()));
    }
    Ok(arg.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut client_cfg = ClientConfig::from_env();
    if let Some(host) = cli.host {
        client_cfg.host = host;
    }
    if let Some(port) = cli.port {
        client_cfg.port = port;
    }

    let program = inline_or_file(&cli.program)?;
    let config = match cli.config.as_deref() {
        Some(raw) => ConfigArg::Serialized(inline_or_file(raw)?),
        None => ConfigArg::Default,
    };

    let mut client = Client::connect(&client_cfg)
        .with_context(|| format!("connecting to {}:{}", client_cfg.host, client_cfg.port))?;
    let reply = client.execute_task(&program, config)?;
    client.close();

    println!("{}", serde_json::to_string_pretty(&reply)?);
    if let Some(exception) = reply.exception_text() {
        bail!("receiver returned an exception: {exception}");
    }
    Ok(())
}
