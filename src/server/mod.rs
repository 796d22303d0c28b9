//! Inference server.
//!
//! One request per connection: a framed JPEG in, a framed JSON compliance
//! report out. Connections are accepted on a dedicated thread and handed to a
//! fixed pool of workers through a bounded queue; when the queue is full the
//! connection is closed without a response. All workers share one detector
//! through `BackendRegistry`, which serializes access to it.

use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::compliance::{ComplianceEngine, FrameComplianceReport};
use crate::detect::BackendRegistry;
use crate::image_io::decode_jpeg;
use crate::wire::{encode_report, read_frame, write_frame, DEFAULT_ADDR, DEFAULT_MAX_FRAME_BYTES};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub addr: String,
    /// Worker threads serving requests.
    pub workers: usize,
    /// Accepted connections waiting for a worker.
    pub queue_depth: usize,
    pub max_frame_bytes: usize,
    /// Deadline for receiving a whole request, and the write timeout for the
    /// response.
    pub io_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            workers: 2,
            queue_depth: 8,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            io_timeout: Duration::from_secs(10),
        }
    }
}

/// Counters shared between the accept loop and the workers.
#[derive(Debug, Default)]
pub struct ServerStats {
    served: AtomicU64,
    failed: AtomicU64,
    refused: AtomicU64,
}

impl ServerStats {
    /// Requests answered with a report.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }

    /// Requests dropped because of a transport, decode or detector error.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Connections closed because the queue was full.
    pub fn refused(&self) -> u64 {
        self.refused.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    stats: Arc<ServerStats>,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Stop accepting, let workers finish queued requests, and join all threads.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("inference server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct InferenceServer {
    opts: ServerOptions,
    registry: Arc<BackendRegistry>,
    engine: ComplianceEngine,
}

impl InferenceServer {
    pub fn new(opts: ServerOptions, registry: BackendRegistry, engine: ComplianceEngine) -> Self {
        Self {
            opts,
            registry: Arc::new(registry),
            engine,
        }
    }

    pub fn spawn(self) -> Result<ServerHandle> {
        if self.opts.workers == 0 {
            return Err(anyhow!("inference server needs at least one worker"));
        }
        if self.opts.queue_depth == 0 {
            return Err(anyhow!("inference server queue depth must be > 0"));
        }
        if self.registry.default_backend().is_none() {
            return Err(anyhow!("inference server has no detector backend"));
        }

        let listener = TcpListener::bind(&self.opts.addr)
            .with_context(|| format!("failed to bind {}", self.opts.addr))?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        self.spawn_on(listener, addr)
    }

    fn spawn_on<L: Incoming>(self, listener: L, addr: SocketAddr) -> Result<ServerHandle> {
        let (tx, rx) = mpsc::sync_channel::<TcpStream>(self.opts.queue_depth);
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(ServerStats::default());

        let mut workers = Vec::with_capacity(self.opts.workers);
        for id in 0..self.opts.workers {
            let ctx = WorkerContext {
                id,
                rx: rx.clone(),
                registry: self.registry.clone(),
                engine: self.engine,
                opts: self.opts.clone(),
                stats: stats.clone(),
            };
            let handle = std::thread::Builder::new()
                .name(format!("ppe-worker-{id}"))
                .spawn(move || ctx.run())
                .context("failed to spawn worker thread")?;
            workers.push(handle);
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let accept_stats = stats.clone();
        let join = std::thread::Builder::new()
            .name("ppe-accept".to_string())
            .spawn(move || {
                if let Err(err) = run_accept(listener, tx, shutdown_thread, &accept_stats) {
                    log::error!("inference server stopped: {}", err);
                }
                for worker in workers {
                    if worker.join().is_err() {
                        log::error!("inference worker panicked");
                    }
                }
            })
            .context("failed to spawn accept thread")?;

        Ok(ServerHandle {
            addr,
            stats,
            shutdown,
            join: Some(join),
        })
    }
}

/// Source of accepted connections. Must not block when nothing is pending.
trait Incoming: Send + 'static {
    fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)>;
}

impl Incoming for TcpListener {
    fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self)
    }
}

/// Accept until shutdown. Dropping `tx` on return lets idle workers exit.
///
/// A failed accept or a connection that cannot be set up is logged and
/// skipped; only losing every worker stops the loop.
fn run_accept<L: Incoming>(
    listener: L,
    tx: SyncSender<TcpStream>,
    shutdown: Arc<AtomicBool>,
    stats: &ServerStats,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(err) = stream.set_nonblocking(false) {
                    log::warn!("dropping connection from {}: {}", peer, err);
                    continue;
                }
                log::debug!("connection from {}", peer);
                match tx.try_send(stream) {
                    Ok(()) => {}
                    Err(TrySendError::Full(stream)) => {
                        stats.refused.fetch_add(1, Ordering::SeqCst);
                        log::warn!("request queue full, refusing connection from {}", peer);
                        drop(stream);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        return Err(anyhow!("all inference workers exited"));
                    }
                }
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                log::warn!("accept failed: {}", err);
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
    Ok(())
}

struct WorkerContext {
    id: usize,
    rx: Arc<Mutex<Receiver<TcpStream>>>,
    registry: Arc<BackendRegistry>,
    engine: ComplianceEngine,
    opts: ServerOptions,
    stats: Arc<ServerStats>,
}

impl WorkerContext {
    fn run(self) {
        loop {
            let next = match self.rx.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => {
                    log::error!("worker {}: request queue lock poisoned", self.id);
                    return;
                }
            };
            let Ok(stream) = next else {
                return;
            };
            let started = Instant::now();
            match self.handle_connection(stream) {
                Ok(report) => {
                    self.stats.served.fetch_add(1, Ordering::SeqCst);
                    log::debug!(
                        "worker {}: {} people judged in {:?}",
                        self.id,
                        report.len(),
                        started.elapsed()
                    );
                }
                Err(err) => {
                    self.stats.failed.fetch_add(1, Ordering::SeqCst);
                    log::warn!("worker {}: request failed: {:#}", self.id, err);
                }
            }
        }
    }

    fn handle_connection(&self, mut stream: TcpStream) -> Result<FrameComplianceReport> {
        stream.set_write_timeout(Some(self.opts.io_timeout))?;

        let mut request = DeadlineReader {
            stream: &mut stream,
            deadline: Instant::now() + self.opts.io_timeout,
        };
        let jpeg = read_frame(&mut request, self.opts.max_frame_bytes)?;
        let (pixels, width, height) = decode_jpeg(&jpeg)?;
        let detections = self.registry.detect(&pixels, width, height)?;
        let report = self.engine.evaluate(&detections);
        let payload = encode_report(&report)?;
        write_frame(&mut stream, &payload)?;
        Ok(report)
    }
}

/// Reads that share one deadline, so a slow sender cannot hold a worker
/// longer than the request timeout.
struct DeadlineReader<'a> {
    stream: &'a mut TcpStream,
    deadline: Instant,
}

impl Read for DeadlineReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self
            .deadline
            .checked_duration_since(Instant::now())
            .filter(|remaining| !remaining.is_zero())
            .ok_or_else(|| std::io::Error::new(ErrorKind::TimedOut, "request deadline passed"))?;
        self.stream.set_read_timeout(Some(remaining))?;
        self.stream.read(buf)
    }
}
