// src/shutdown.rs

//! Cooperative shutdown for the long-running tasks of the service.
//!
//! This is a thin wrapper around an `async_std` channel that never carries any messages: closing
//! the channel wakes every waiting [`Shutdown`] at once.

use async_std::channel::{self, Receiver, Sender};

/// Create a connected [`Trigger`] and [`Shutdown`] pair.
#[must_use]
pub fn channel() -> (Trigger, Shutdown) {
    let (sender, receiver) = channel::bounded(1);
    (Trigger { sender }, Shutdown { receiver })
}

/// The sending half of a shutdown signal.
///
/// Dropping the trigger also signals shutdown, so it must be kept alive for as long as the
/// service should run.
#[derive(Debug)]
pub struct Trigger {
    sender: Sender<()>,
}

impl Trigger {
    /// Signal every associated [`Shutdown`].
    pub fn trigger(self) {
        self.sender.close();
    }
}

/// The receiving half of a shutdown signal. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Shutdown {
    receiver: Receiver<()>,
}

impl Shutdown {
    /// Wait until shutdown has been triggered.
    pub async fn wait(&self) {
        while self.receiver.recv().await.is_ok() {}
    }

    /// Whether shutdown has already been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.receiver.is_closed()
    }
}
