//! The long-lived duplex channel to the editing host.
//!
//! One connection carries many logical calls. Each call is tagged with a
//! connection-scoped id and parked in a pending table until its response
//! arrives or its own timer expires. Responses may arrive in any order;
//! frames that match no pending id are dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connector::{BoxedStream, Connector};
use crate::error::{ChannelError, ChannelResult};
use crate::protocol::{decode_response, RpcRequest};
use crate::stats::ChannelStats;
use crate::DEFAULT_CALL_TIMEOUT;

type Resolver = oneshot::Sender<ChannelResult<Value>>;

/// Anything that can run an opaque script fragment on the host.
///
/// The execution engine depends on this seam rather than on the concrete
/// channel so runs can be exercised against in-memory hosts.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute_script(&self, script: &str, timeout: Duration) -> ChannelResult<Value>;
}

#[derive(Debug, Default)]
struct PendingTable {
    entries: Mutex<HashMap<u64, Resolver>>,
}

impl PendingTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Resolver>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: u64, resolver: Resolver) {
        self.lock().insert(id, resolver);
    }

    fn take(&self, id: u64) -> Option<Resolver> {
        self.lock().remove(&id)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drop every resolver; their callers observe `Closed`.
    fn clear(&self) -> usize {
        let mut entries = self.lock();
        let n = entries.len();
        entries.clear();
        n
    }
}

/// Removes a pending entry when the owning call finishes, times out, or is
/// dropped mid-await.
struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.take(self.id);
    }
}

struct Connection {
    next_id: AtomicU64,
    pending: Arc<PendingTable>,
    alive: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    fn open(stream: BoxedStream, stats: Arc<ChannelStats>) -> Self {
        let (read_half, mut write_half) = tokio::io::split(stream);
        let pending = Arc::new(PendingTable::default());
        let alive = Arc::new(AtomicBool::new(true));
        let (outbound, mut queue) = mpsc::unbounded_channel::<String>();

        let writer_alive = alive.clone();
        let writer = tokio::spawn(async move {
            while let Some(mut line) = queue.recv().await {
                line.push('\n');
                let written = match write_half.write_all(line.as_bytes()).await {
                    Ok(()) => write_half.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    warn!(error = %e, "channel write failed; marking disconnected");
                    writer_alive.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_alive = alive.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => dispatch_frame(&line, &reader_pending, &stats),
                    Ok(None) => {
                        info!("host closed the channel");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "channel read failed");
                        break;
                    }
                }
            }
            // Outstanding calls are left to their own timers.
            reader_alive.store(false, Ordering::SeqCst);
            let outstanding = reader_pending.len();
            if outstanding > 0 {
                warn!(outstanding, "transport lost with calls in flight");
            }
        });

        Self {
            next_id: AtomicU64::new(1),
            pending,
            alive,
            outbound,
            reader,
            writer,
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn shutdown(self) -> usize {
        self.alive.store(false, Ordering::SeqCst);
        self.reader.abort();
        self.writer.abort();
        self.pending.clear()
    }
}

fn dispatch_frame(line: &str, pending: &PendingTable, stats: &ChannelStats) {
    if line.trim().is_empty() {
        return;
    }
    let response = match decode_response(line) {
        Ok(response) => response,
        Err(e) => {
            stats.inc_malformed_frames();
            debug!(error = %e, "dropping malformed frame");
            return;
        }
    };

    let id = response.id;
    match pending.take(id) {
        Some(resolver) => {
            stats.inc_responses_matched();
            let outcome = response
                .into_outcome()
                .map_err(|message| ChannelError::Remote { message });
            // The caller may have given up in the meantime.
            let _ = resolver.send(outcome);
        }
        None => {
            stats.inc_unmatched_responses();
            debug!(id, "dropping response with no pending call");
        }
    }
}

/// Persistent correlated RPC channel to the editing host.
pub struct RemoteScriptChannel {
    connector: Arc<dyn Connector>,
    connection: Option<Connection>,
    stats: Arc<ChannelStats>,
}

impl RemoteScriptChannel {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Arc::new(connector),
            connection: None,
            stats: Arc::new(ChannelStats::new()),
        }
    }

    /// Open the connection. Idempotent while the current connection is
    /// healthy; a dead connection is torn down and replaced.
    pub async fn connect(&mut self) -> ChannelResult<()> {
        if let Some(conn) = &self.connection {
            if conn.is_alive() {
                return Ok(());
            }
        }
        if let Some(stale) = self.connection.take() {
            let dropped = stale.shutdown();
            debug!(dropped, "replaced dead connection");
        }

        let stream = self.connector.connect().await?;
        self.connection = Some(Connection::open(stream, self.stats.clone()));
        info!(host = %self.connector.target(), "channel connected");
        Ok(())
    }

    /// Run `fragment` with the default 30s timeout.
    pub async fn call(&self, fragment: &str) -> ChannelResult<Value> {
        self.call_with_timeout(fragment, DEFAULT_CALL_TIMEOUT).await
    }

    /// Run `fragment`, failing with [`ChannelError::Timeout`] if no response
    /// arrives within `timeout`. The host is not told about the abandonment.
    pub async fn call_with_timeout(
        &self,
        fragment: &str,
        timeout: Duration,
    ) -> ChannelResult<Value> {
        let conn = self.connection.as_ref().ok_or(ChannelError::NotConnected)?;
        if !conn.is_alive() {
            return Err(ChannelError::NotConnected);
        }

        let id = conn.next_id.fetch_add(1, Ordering::SeqCst);
        let line = RpcRequest::execute_script(id, fragment).to_line()?;

        let (resolver, response) = oneshot::channel();
        conn.pending.insert(id, resolver);
        let _guard = PendingGuard {
            table: &conn.pending,
            id,
        };

        if conn.outbound.send(line).is_err() {
            return Err(ChannelError::NotConnected);
        }
        self.stats.inc_calls_sent();
        debug!(id, bytes = fragment.len(), "call sent");

        match tokio::time::timeout(timeout, response).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ChannelError::Closed { id }),
            Err(_) => {
                self.stats.inc_timeouts();
                let timeout_ms = timeout.as_millis() as u64;
                warn!(id, timeout_ms, "call timed out");
                Err(ChannelError::Timeout { id, timeout_ms })
            }
        }
    }

    /// Tear down the connection. Pending entries are dropped with it.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            let dropped = conn.shutdown();
            self.stats.flush();
            info!(dropped, "channel disconnected");
        }
    }

    /// True while a connection exists and its transport has not closed.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_alive)
    }

    /// Number of calls currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.connection
            .as_ref()
            .map(|c| c.pending.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }
}

impl Drop for RemoteScriptChannel {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.shutdown();
        }
    }
}

#[async_trait]
impl ScriptExecutor for RemoteScriptChannel {
    async fn execute_script(&self, script: &str, timeout: Duration) -> ChannelResult<Value> {
        self.call_with_timeout(script, timeout).await
    }
}
