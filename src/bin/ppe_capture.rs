//! ppe_capture - capture client for ppe_server
//!
//! Sends one frame per capture interval to the inference server, draws the
//! returned report on the frame, and saves it when anyone is missing PPE.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ppe_guard::{
    capture::{CaptureSession, CaptureSource},
    config::CaptureConfig,
    snapshot::SnapshotStore,
    InferenceClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (the `capture` section is used).
    #[arg(long, env = "PPE_CONFIG")]
    config: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = CaptureConfig::load_from(args.config.as_deref())?;

    let source = CaptureSource::open(&config.source)?;
    let client = InferenceClient::new(config.server_addr.clone(), config.request_timeout)
        .with_max_frame_bytes(config.max_frame_bytes);
    let store = SnapshotStore::new(config.snapshot_dir.clone());
    let mut session = CaptureSession::new(source, client, store, config.capture_interval);

    log::info!(
        "ppe_capture sending {} to {} every {:?}, snapshots in {}",
        config.source,
        config.server_addr,
        config.capture_interval,
        config.snapshot_dir.display()
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        signal.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    match args.frames {
        Some(frames) => session.run_for(frames, &shutdown),
        None => session.run(&shutdown),
    }
    Ok(())
}
