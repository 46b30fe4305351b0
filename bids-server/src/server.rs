//! TCP server implementation.

use crate::config::Config;
use crate::error::ServerError;
use crate::handler::DEFAULT_MAX_AUTH_FAILURES;
use crate::hub::{Hub, HubEvent};
use crate::session::DEFAULT_OUTBOUND_QUEUE;
use bids_core::SessionId;
use bids_protocol::{encode_line, LineDecoder, DEFAULT_PORT, MAX_LINE_BYTES};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

/// Capacity of the channel from connection tasks to the hub.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Longest accepted request line.
    pub max_line_bytes: usize,
    /// Lines queued for one client before it is treated as stalled.
    pub outbound_queue: usize,
    /// Longest a single socket write may block.
    pub write_timeout: Duration,
    /// Expected interval between client messages.
    pub ping_interval: Duration,
    /// Missed intervals after which a session is evicted.
    pub max_missed_pings: u32,
    /// Period of the auction and keepalive sweeps.
    pub tick_interval: Duration,
    /// Credential mismatches before a connection is closed (0 = never).
    pub max_auth_failures: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 1000,
            max_line_bytes: MAX_LINE_BYTES,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            write_timeout: Duration::from_secs(5),
            ping_interval: Duration::from_secs(15),
            max_missed_pings: 5,
            tick_interval: Duration::from_secs(1),
            max_auth_failures: DEFAULT_MAX_AUTH_FAILURES,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Builds the runtime configuration from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            bind_addr: config.network.bind_addr,
            max_connections: config.network.max_connections,
            max_line_bytes: config.network.max_line_bytes,
            outbound_queue: config.network.outbound_queue,
            write_timeout: config.network.write_timeout(),
            ping_interval: config.keepalive.ping_interval(),
            max_missed_pings: config.keepalive.max_missed,
            tick_interval: config.keepalive.tick_interval(),
            max_auth_failures: config.auth.max_failures,
        }
    }

    /// Sets the keepalive interval and eviction threshold.
    pub fn with_keepalive(mut self, ping_interval: Duration, max_missed: u32) -> Self {
        self.ping_interval = ping_interval;
        self.max_missed_pings = max_missed;
        self
    }

    /// Sets the sweep period.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Sets the line length limit.
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Sets the per-client queue length and socket write deadline.
    pub fn with_backpressure(mut self, outbound_queue: usize, write_timeout: Duration) -> Self {
        self.outbound_queue = outbound_queue;
        self.write_timeout = write_timeout;
        self
    }

    /// Sets the connection limit.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the credential mismatch limit.
    pub fn with_max_auth_failures(mut self, max: u32) -> Self {
        self.max_auth_failures = max;
        self
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub lines_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server for bids.
pub struct Server {
    config: ServerConfig,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let hub = Hub::from_config(&self.config);
        let hub_task = tokio::spawn(Self::run_hub(
            hub,
            event_rx,
            self.config.tick_interval,
            self.shutdown.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut next_session = 0u64;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("Connection limit reached, rejecting {}", addr);
                                self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                                continue;
                            }

                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            next_session += 1;
                            let id = SessionId(next_session);
                            let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_queue);
                            let connected = HubEvent::Connected {
                                id,
                                remote_addr: addr,
                                outbound: outbound_tx,
                            };
                            // Enqueued before the connection task exists, so the
                            // hub sees the session before any of its lines.
                            if event_tx.send(connected).await.is_err() {
                                self.stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                break;
                            }

                            let events = event_tx.clone();
                            let stats = self.stats.clone();
                            let max_line_bytes = self.config.max_line_bytes;
                            let write_timeout = self.config.write_timeout;

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    tcp_stream,
                                    id,
                                    addr,
                                    events.clone(),
                                    outbound_rx,
                                    max_line_bytes,
                                    write_timeout,
                                    stats.clone(),
                                )
                                .await;

                                if let Err(e) = result {
                                    tracing::debug!("Connection {} error: {}", addr, e);
                                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                }

                                let _ = events.send(HubEvent::Disconnected { id }).await;
                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::debug!("Connection task for {} finished", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        drop(event_tx);
        if let Err(e) = hub_task.await {
            tracing::error!("Hub task failed: {}", e);
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Owns the hub: applies events in arrival order and runs the sweeps.
    async fn run_hub(
        mut hub: Hub,
        mut events: mpsc::Receiver<HubEvent>,
        tick_interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => hub.handle_event(event, Instant::now()),
                    None => break,
                },
                _ = ticker.tick() => hub.tick(Instant::now()),
                _ = shutdown.recv() => break,
            }
        }

        hub.shutdown();
    }

    /// Moves bytes between one socket and the hub.
    ///
    /// Returns once the hub drops the session (after flushing what it
    /// queued), the peer closes, or the transport fails. A write that blocks
    /// longer than `write_timeout` counts as a transport failure.
    async fn handle_connection(
        stream: TcpStream,
        id: SessionId,
        addr: SocketAddr,
        events: mpsc::Sender<HubEvent>,
        mut outbound: mpsc::Receiver<String>,
        max_line_bytes: usize,
        write_timeout: Duration,
        stats: Arc<ServerStats>,
    ) -> Result<(), ServerError> {
        let (mut reader, mut writer) = stream.into_split();
        let mut decoder = LineDecoder::with_max_line(max_line_bytes);
        let mut buf = [0u8; 4096];

        loop {
            tokio::select! {
                biased;

                line = outbound.recv() => {
                    match line {
                        Some(line) => {
                            let frame = encode_line(&line);
                            match tokio::time::timeout(write_timeout, writer.write_all(&frame)).await {
                                Ok(result) => result?,
                                Err(_) => {
                                    tracing::debug!("[{}] Write timed out, dropping peer", addr);
                                    return Err(ServerError::Timeout);
                                }
                            }
                        }
                        None => {
                            tracing::debug!("[{}] Session closed by server", addr);
                            writer.shutdown().await?;
                            return Ok(());
                        }
                    }
                }

                result = reader.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!("[{}] Connection closed by client", addr);
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::debug!("[{}] Received {} bytes", addr, n);
                            decoder.extend(&buf[..n]);
                        }
                        Err(e) => {
                            tracing::debug!("[{}] Read error: {}", addr, e);
                            return Err(ServerError::Io(e));
                        }
                    }
                }
            }

            loop {
                let event = match decoder.decode_line() {
                    Ok(Some(line)) => {
                        stats.lines_total.fetch_add(1, Ordering::Relaxed);
                        HubEvent::Line { id, line }
                    }
                    Ok(None) => break,
                    Err(error) => HubEvent::Malformed { id, error },
                };
                if events.send(event).await.is_err() {
                    return Err(ServerError::ShuttingDown);
                }
            }
        }
    }

    /// Signals the server to stop accepting and close every session.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
