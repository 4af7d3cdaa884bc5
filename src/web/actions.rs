use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use tracing::warn;

use crate::console::Console;

/// Work that must run on the host's own loop.
pub type Action = Box<dyn FnOnce(&Console) + Send>;

/// Producer side of the action queue, cloned into the listener thread.
#[derive(Clone)]
pub struct ActionSender {
    tx: Sender<Action>,
}

impl ActionSender {
    /// Queues an action. Returns `false` if the consumer is gone.
    pub fn enqueue<F>(&self, action: F) -> bool
    where
        F: FnOnce(&Console) + Send + 'static,
    {
        match self.tx.try_send(Box::new(action)) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(_)) | Err(TrySendError::Full(_)) => {
                warn!("Action queue unavailable, dropping action");
                false
            }
        }
    }
}

/// Single-consumer FIFO of actions, drained by the host once per tick.
pub struct ActionQueue {
    rx: Receiver<Action>,
    console: Arc<Console>,
}

impl ActionQueue {
    pub fn new(console: Arc<Console>) -> (ActionSender, ActionQueue) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (ActionSender { tx }, ActionQueue { rx, console })
    }

    /// Runs every action queued before this call, in order. Returns how many ran.
    ///
    /// Actions queued while draining wait for the next call, so a tick never
    /// spins on a producer that keeps up with it.
    pub fn run_pending(&self) -> usize {
        let pending = self.rx.len();
        let mut ran = 0;
        while ran < pending {
            match self.rx.try_recv() {
                Ok(action) => {
                    action(&self.console);
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
