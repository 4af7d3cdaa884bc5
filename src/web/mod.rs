//! HTTP bridge between the console and the browser inspector.
//!
//! The bridge owns a dedicated OS thread running a single-threaded tokio
//! runtime. That thread only does network I/O and read-only queries against
//! the console; commands are handed to the host through the action queue and
//! run when the host calls [`HttpBridge::run_pending`].

use crossbeam_channel::RecvTimeoutError;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::HttpConfig;
use crate::console::Console;
use crate::error::ConsoleError;

mod actions;
mod routes;
mod types;

pub use actions::{Action, ActionQueue, ActionSender};
pub use routes::{handle_http_request, BridgeState};
pub use types::{content_type_for, parse_timestamp, CommandRequest, LogResponse};

/// Time given to in-flight blocking file reads once the runtime stops.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Running HTTP listener plus the host side of its action queue.
pub struct HttpBridge {
    local_addr: SocketAddr,
    queue: ActionQueue,
    sender: ActionSender,
    shutdown_tx: watch::Sender<bool>,
    done_rx: crossbeam_channel::Receiver<()>,
    thread: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl HttpBridge {
    /// Binds the listener and starts serving on a background thread.
    ///
    /// Binding happens before this returns, so an unavailable port is
    /// reported here rather than on the listener thread.
    pub fn start(console: Arc<Console>, config: &HttpConfig) -> Result<Self, ConsoleError> {
        let addr = config
            .socket_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let (sender, queue) = ActionQueue::new(console.clone());
        let state = Arc::new(BridgeState {
            console,
            actions: sender.clone(),
            assets_dir: config.assets_dir.clone(),
            request_timeout: config.request_timeout(),
            max_body_bytes: config.max_body_bytes,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let thread = thread::Builder::new()
            .name("console-http".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => {
                        match runtime.block_on(accept_loop(listener, state, shutdown_rx)) {
                            Err(e) if e.is_expected_shutdown() => debug!("HTTP listener stopped"),
                            Err(e) => error!("HTTP listener failed: {}", e),
                            Ok(()) => {}
                        }
                        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
                    }
                    Err(e) => error!("Failed to build HTTP runtime: {}", e),
                }
                let _ = done_tx.send(());
            })?;

        info!("Console HTTP bridge listening on {}", local_addr);

        Ok(HttpBridge {
            local_addr,
            queue,
            sender,
            shutdown_tx,
            done_rx,
            thread: Some(thread),
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for queuing extra work onto the host loop.
    pub fn action_sender(&self) -> ActionSender {
        self.sender.clone()
    }

    pub fn pending_actions(&self) -> usize {
        self.queue.len()
    }

    /// Runs queued actions; call once per host tick.
    pub fn run_pending(&self) -> usize {
        self.queue.run_pending()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops accepting connections, releases the socket and joins the
    /// listener thread, waiting at most the configured shutdown timeout.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.shutdown_tx.send(true);

        match self.done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if thread.join().is_err() {
                    warn!("HTTP listener thread panicked");
                }
                info!("Console HTTP bridge on {} stopped", self.local_addr);
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "HTTP listener thread did not stop within {:?}, detaching it",
                    self.shutdown_timeout
                );
            }
        }
    }
}

impl Drop for HttpBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Accepts connections until the shutdown signal fires.
///
/// Always ends with [`ConsoleError::ListenerTerminated`] on a requested stop;
/// accept errors are logged and the loop keeps going.
async fn accept_loop(
    listener: std::net::TcpListener,
    state: Arc<BridgeState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ConsoleError> {
    let listener = TcpListener::from_std(listener)?;
    let header_timeout = state.request_timeout;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                return Err(ConsoleError::ListenerTerminated);
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, addr)) => {
                    debug!("HTTP connection from {}", addr);
                    let state = state.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(socket);
                        let service =
                            service_fn(move |req| handle_http_request(req, state.clone()));
                        if let Err(e) = http1::Builder::new()
                            .timer(TokioTimer::new())
                            .header_read_timeout(header_timeout)
                            .serve_connection(io, service)
                            .await
                        {
                            debug!("HTTP connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    warn!("Failed to accept HTTP connection: {}", e);
                }
            }
        }
    }
}
