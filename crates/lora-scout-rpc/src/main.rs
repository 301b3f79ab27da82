//! LoRA Scout RPC Server - JSON-RPC backend for the node-graph host.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the lora-scout-core
//! library for the host-side shim (loader nodes, before-enqueue hook,
//! settings panel).

mod handlers;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lora-scout-rpc")]
#[command(about = "JSON-RPC server for LoRA Scout")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Data root holding settings.json (defaults to the platform data dir)
    #[arg(long)]
    root: Option<PathBuf>,

    /// LoRA directory (overrides the one in settings)
    #[arg(long)]
    lora_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting LoRA Scout RPC Server");

    let root = match args.root {
        Some(path) => path,
        None => lora_scout_core::settings::default_data_root()
            .context("No --root given and no platform data directory")?,
    };
    info!("Data root: {}", root.display());

    let mut builder = lora_scout_core::LoraScoutApi::builder(&root).auto_create_dirs(true);
    if let Some(dir) = args.lora_dir {
        builder = builder.lora_dir(dir);
    }
    let api = builder.build().await?;
    info!("LoRA directory: {}", api.lora_dir().await.display());

    // Start the server
    let addr = server::start_server(api, &args.host, args.port).await?;

    // Print port for the host shim to read (intentional stdout for IPC)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
