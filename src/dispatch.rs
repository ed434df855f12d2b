// src/dispatch.rs

//! The pipeline that carries [`Entry`]s from listeners to [`Sink`]s.
//!
//! Listeners push entries into a bounded queue through a [`Forwarder`]. A single [`Dispatcher`]
//! pops them, applies a [`Filter`], and writes the rendered entry to every registered sink in
//! registration order. When the queue is full, `forward` waits for space rather than dropping
//! entries, so a slow sink stalls the listeners.

use async_std::channel::{self, Receiver, Sender};
use async_std::prelude::*;
use log::{debug, error, trace};
use regex::Regex;

use crate::entry::Entry;
use crate::severity::Severity;
use crate::shutdown::Shutdown;
use crate::sink::Sink;

/// The default capacity of the queue between listeners and the dispatcher.
pub const QUEUE_CAPACITY: usize = 10;

/// Decides which entries reach the sinks.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    min_severity: Severity,
    pattern: Option<Regex>,
}

impl Filter {
    /// Accept entries at least as severe as `min_severity` whose text matches `pattern` (if any).
    ///
    /// Entries without a priority header always pass the severity check.
    #[must_use]
    pub fn new(min_severity: Severity, pattern: Option<Regex>) -> Self {
        Self {
            min_severity,
            pattern,
        }
    }

    /// Whether `entry` should be written to the sinks.
    #[must_use]
    pub fn accepts(&self, entry: &Entry) -> bool {
        let severe_enough = entry.priority().map_or(true, |(severity, _)| {
            severity.as_or_more_severe_than(self.min_severity)
        });
        severe_enough && entry.matches(self.pattern.as_ref())
    }
}

/// The error returned by [`Forwarder::forward`] once the [`Dispatcher`] has stopped.
#[derive(Debug, thiserror::Error)]
#[error("dispatch queue is closed")]
pub struct Closed;

/// A handle used by listeners to push entries into the dispatch queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Forwarder {
    sender: Sender<Entry>,
}

impl Forwarder {
    /// Queue `entry` for dispatch, waiting for space if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the dispatcher has stopped.
    pub async fn forward(&self, entry: Entry) -> Result<(), Closed> {
        self.sender.send(entry).await.map_err(|_| Closed)
    }
}

/// The consuming end of the dispatch queue.
pub struct Dispatcher {
    receiver: Receiver<Entry>,
    filter: Filter,
    sinks: Vec<Box<dyn Sink>>,
}

impl Dispatcher {
    /// Create a dispatcher with a queue of `capacity` entries, along with a [`Forwarder`] for it.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(filter: Filter, capacity: usize) -> (Forwarder, Self) {
        let (sender, receiver) = channel::bounded(capacity);
        (
            Forwarder { sender },
            Self {
                receiver,
                filter,
                sinks: Vec::new(),
            },
        )
    }

    /// Register a sink. Sinks are written to in the order they are added.
    pub fn add_sink(&mut self, sink: impl Sink + 'static) -> &mut Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Deliver entries until `shutdown` is triggered or every [`Forwarder`] has been dropped.
    ///
    /// Entries already queued when shutdown is triggered are still delivered, and every sink is
    /// flushed before returning.
    pub async fn run(mut self, shutdown: Shutdown) {
        loop {
            let receiver = &self.receiver;
            let next = async { receiver.recv().await.ok() }
                .race(async {
                    shutdown.wait().await;
                    None
                })
                .await;

            match next {
                Some(entry) => self.deliver(&entry),
                None => break,
            }
        }

        while let Ok(entry) = self.receiver.try_recv() {
            self.deliver(&entry);
        }

        for sink in &mut self.sinks {
            if let Err(error) = sink.flush() {
                error!("Failed to flush {}: {}", sink.name(), error);
            }
        }

        debug!("Dispatcher stopped");
    }

    fn deliver(&mut self, entry: &Entry) {
        if !self.filter.accepts(entry) {
            trace!("Filtered out entry: {}", entry);
            return;
        }

        let line = entry.to_string();
        for sink in &mut self.sinks {
            if let Err(error) = sink.write_line(&line) {
                error!("Failed to write to {}: {}", sink.name(), error);
            }
        }
    }
}
