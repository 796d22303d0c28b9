//! ppe_server - PPE compliance inference service
//!
//! This daemon:
//! 1. Loads the detector backend from config
//! 2. Accepts framed JPEG requests on the configured address
//! 3. Answers each with the frame's JSON compliance report

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;

use ppe_guard::{
    config::ServerConfig, BackendRegistry, ComplianceEngine, InferenceServer, ServerOptions,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (the `server` section is used).
    #[arg(long, env = "PPE_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::load_from(args.config.as_deref())?;

    let registry = BackendRegistry::from_settings(&config.detector)?;
    registry.warm_up()?;
    log::info!(
        "detector backend: {}",
        registry.default_name().unwrap_or("none")
    );

    let engine =
        ComplianceEngine::new(config.association).with_overlap_diagnostics(config.overlap_diagnostics);
    let opts = ServerOptions {
        addr: config.addr.clone(),
        workers: config.workers,
        queue_depth: config.queue_depth,
        max_frame_bytes: config.max_frame_bytes,
        io_timeout: config.io_timeout,
    };
    let handle = InferenceServer::new(opts, registry, engine).spawn()?;
    log::info!(
        "ppe_server listening on {} ({} workers, queue depth {}, association {})",
        handle.addr,
        config.workers,
        config.queue_depth,
        config.association.as_str()
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    let _ = rx.recv();
    log::info!("shutdown signal received, stopping server...");
    let stats = (
        handle.stats().served(),
        handle.stats().failed(),
        handle.stats().refused(),
    );
    handle.stop()?;
    log::info!(
        "ppe_server stopped: {} served, {} failed, {} refused",
        stats.0,
        stats.1,
        stats.2
    );
    Ok(())
}
