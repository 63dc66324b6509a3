//! Id-correlated request/response channel to one worker.
//!
//! The channel owns a pending-id table: each [`send`](Channel::send)
//! allocates the next id, registers a resolver and hands the encoded
//! envelope to the transport. A dispatcher task resolves or rejects entries
//! as response lines arrive. A response whose id has no pending entry is a
//! protocol error: it is logged and dropped, never fatal — the stray
//! request's caller simply never resolves, which is acceptable because no
//! layer above imposes timeouts.

use crate::error::BackendError;
use crate::protocol::{RequestEnvelope, ResponseEnvelope, WireRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

/// One direction of the wire: delivers encoded request lines to a worker.
///
/// Implementations also carry the two side effects that bypass the
/// request/response flow: mirroring an interrupt-buffer write to a worker
/// that cannot poll the shared byte, and terminating the worker outright.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one encoded request line.
    async fn send_line(&self, line: String) -> Result<(), BackendError>;

    /// Nudge the worker after the interrupt sentinel was written. In-process
    /// workers poll the shared byte themselves; child processes get a
    /// signal instead.
    fn notify_interrupt(&self) {}

    /// Terminate the worker. Used by restart-strategy interruption and on
    /// teardown.
    async fn shutdown(&self) {}
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, BackendError>>>>>;

/// Request/response correlation over a [`Transport`].
pub struct Channel {
    transport: Arc<dyn Transport>,
    pending: PendingMap,
    next_id: AtomicU64,
    dispatcher: JoinHandle<()>,
}

impl Channel {
    /// Wire a channel to a transport and its incoming line stream.
    pub fn new(transport: Arc<dyn Transport>, incoming: mpsc::UnboundedReceiver<String>) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let dispatcher = spawn_dispatcher(Arc::clone(&pending), incoming);
        Self {
            transport,
            pending,
            next_id: AtomicU64::new(0),
            dispatcher,
        }
    }

    /// Send a typed request and await its correlated response.
    pub async fn send<R: WireRequest>(&self, request: R) -> Result<R::Response, BackendError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending map poisoned")
            .insert(id, tx);

        let envelope = RequestEnvelope {
            id,
            body: request.into_body(),
        };
        let line = match serde_json::to_string(&envelope) {
            Ok(line) => line,
            Err(e) => {
                self.forget(id);
                return Err(BackendError::Protocol(format!(
                    "failed to encode request {id}: {e}"
                )));
            }
        };
        if let Err(e) = self.transport.send_line(line).await {
            self.forget(id);
            return Err(e);
        }

        match rx.await {
            Ok(Ok(payload)) => serde_json::from_value(payload).map_err(|e| {
                BackendError::Protocol(format!("malformed response payload for id {id}: {e}"))
            }),
            Ok(Err(e)) => Err(e),
            // Resolver dropped without an answer: the channel was torn down.
            Err(_) => Err(BackendError::Interrupted),
        }
    }

    /// Reject every pending request with [`BackendError::Interrupted`].
    /// Called when a restart-strategy backend is forcibly terminated.
    pub fn fail_all_interrupted(&self) {
        let mut pending = self.pending.lock().expect("pending map poisoned");
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(BackendError::Interrupted));
        }
    }

    /// Mirror an interrupt-buffer write to the worker.
    pub fn notify_interrupt(&self) {
        self.transport.notify_interrupt();
    }

    /// Terminate the worker behind this channel.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .expect("pending map poisoned")
            .remove(&id);
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.dispatcher.abort();
        self.fail_all_interrupted();
    }
}

fn spawn_dispatcher(
    pending: PendingMap,
    mut incoming: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = incoming.recv().await {
            let envelope: ResponseEnvelope = match serde_json::from_str(&line) {
                Ok(env) => env,
                Err(e) => {
                    warn!(error = %e, "dropping malformed response line");
                    continue;
                }
            };
            let resolver = pending
                .lock()
                .expect("pending map poisoned")
                .remove(&envelope.id);
            let Some(tx) = resolver else {
                warn!(id = envelope.id, "response id has no pending request");
                continue;
            };
            let result = match (envelope.payload, envelope.error) {
                (_, Some(message)) => Err(BackendError::Worker(message)),
                (Some(payload), None) => Ok(payload),
                // Operations like restoreState may answer an empty payload.
                (None, None) => Ok(Value::Object(serde_json::Map::new())),
            };
            let _ = tx.send(result);
        }
        // Stream closed: the worker died or its stdout was torn down.
        // Every in-flight request must fail rather than wait forever.
        let mut pending = pending.lock().expect("pending map poisoned");
        if !pending.is_empty() {
            warn!(
                pending = pending.len(),
                "worker response stream closed with requests in flight"
            );
        }
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(BackendError::Transport(
                "worker response stream closed".into(),
            )));
        }
    })
}
