//! Transport for in-process engines.
//!
//! Runs an [`Engine`] on a dedicated OS thread so blocking evaluation never
//! stalls the async runtime. Requests queue through a synchronous channel
//! and are served strictly in order; responses come back on the line stream
//! the [`crate::channel::Channel`] dispatcher consumes.

use crate::channel::Transport;
use crate::error::BackendError;
use crate::worker::engine::{handle_request, Engine};
use async_trait::async_trait;
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use tokio::sync::mpsc;

pub struct LocalTransport {
    /// Dropping the sender is how the engine thread is told to exit.
    requests: Mutex<Option<std_mpsc::Sender<String>>>,
}

impl LocalTransport {
    /// Start the engine thread and return the transport plus the response
    /// line stream.
    pub fn spawn(mut engine: Box<dyn Engine>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (request_tx, request_rx) = std_mpsc::channel::<String>();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            for line in request_rx {
                let response = handle_request(engine.as_mut(), &line);
                if response_tx.send(response).is_err() {
                    break;
                }
            }
        });

        (
            Self {
                requests: Mutex::new(Some(request_tx)),
            },
            response_rx,
        )
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send_line(&self, line: String) -> Result<(), BackendError> {
        let sender = self
            .requests
            .lock()
            .expect("request queue poisoned")
            .clone();
        match sender {
            Some(tx) => tx
                .send(line)
                .map_err(|_| BackendError::Transport("engine thread has exited".into())),
            None => Err(BackendError::Transport("engine was shut down".into())),
        }
    }

    // notify_interrupt stays the default no-op: the engine polls the shared
    // interrupt byte itself.

    async fn shutdown(&self) {
        self.requests.lock().expect("request queue poisoned").take();
    }
}
