// src/listener/tcp.rs

//! Syslog over TCP.
//!
//! Senders are not expected to length-prefix their messages, so message boundaries are inferred
//! from two signals:
//!
//! - Structural: a priority marker (`<NN>` or `<NNN>`) anywhere after the start of the buffered
//!   bytes starts the next message, so everything before it is a complete message.
//! - Temporal: if a read times out, whatever is buffered is treated as a complete message. This
//!   bounds how long a message without a following marker (e.g. the last one a sender writes) is
//!   held back to one read timeout.
//!
//! The buffering and splitting lives in [`Framer`], which has no I/O of its own.

use std::mem;
use std::net::SocketAddr;
use std::time::Duration;

use async_std::io;
use async_std::net;
use async_std::prelude::*;
use async_std::task;
use log::{debug, error, info, trace, warn};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::dispatch::{Closed, Forwarder};
use crate::entry::Entry;
use crate::shutdown::Shutdown;

use super::BindError;

/// The maximum number of bytes requested from a connection per read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// How long a read waits before buffered bytes are flushed as a message.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

static MESSAGE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[0-9]{2,3}>").expect("invalid message start pattern"));

/// Reconstructs individual messages from a stream of bytes.
///
/// Bytes are accumulated with [`Framer::push`], which returns any messages known to be complete.
/// A message is complete once the start of another message has been seen after it. Call
/// [`Framer::flush`] when no more bytes are expected (soon) to take whatever is left.
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Vec<u8>,
}

impl Framer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every message that is now complete, in stream order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);
        self.split_complete()
    }

    /// Return every complete message followed by any remaining bytes, leaving the framer empty.
    ///
    /// The remaining bytes are returned as a message whether or not they start with a priority
    /// marker.
    pub fn flush(&mut self) -> Vec<Vec<u8>> {
        let mut messages = self.split_complete();
        if !self.buffer.is_empty() {
            messages.push(mem::take(&mut self.buffer));
        }
        messages
    }

    /// Whether there are no buffered bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn split_complete(&mut self) -> Vec<Vec<u8>> {
        let mut messages = Vec::new();
        while let Some(end) = self.next_boundary() {
            messages.push(self.buffer.drain(..end).collect());
        }
        messages
    }

    /// The position of the first message marker after the start of the buffer.
    ///
    /// The search skips the first byte, so a marker at the very start (i.e. the current message's
    /// own header) never counts as a boundary.
    fn next_boundary(&self) -> Option<usize> {
        let rest = self.buffer.get(1..)?;
        MESSAGE_START.find(rest).map(|found| found.start() + 1)
    }
}

/// A listener that accepts TCP connections and frames syslog messages from them.
#[derive(Debug)]
pub struct TcpListener {
    listener: net::TcpListener,
    read_timeout: Duration,
}

impl TcpListener {
    /// Bind a listener to `address`.
    ///
    /// `read_timeout` bounds each read on accepted connections (see [`DEFAULT_READ_TIMEOUT`]).
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] if the address can't be bound.
    pub async fn bind(address: SocketAddr, read_timeout: Duration) -> Result<Self, BindError> {
        let listener = net::TcpListener::bind(address)
            .await
            .map_err(|source| BindError::new("TCP", address, source))?;

        info!("Listening for syslog over TCP on {}", address);
        Ok(Self {
            listener,
            read_timeout,
        })
    }

    /// The address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from the underlying socket.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` is triggered, spawning a task for each one.
    ///
    /// Connection tasks check for shutdown after each read, so they can outlive this function by
    /// up to one read timeout.
    pub async fn listen(self, forwarder: Forwarder, shutdown: Shutdown) {
        loop {
            let listener = &self.listener;
            let accepted = async { Some(listener.accept().await) }
                .race(async {
                    shutdown.wait().await;
                    None
                })
                .await;

            let (stream, peer) = match accepted {
                None => break,
                Some(Ok(accepted)) => accepted,
                Some(Err(error)) => {
                    error!("Failed to accept TCP connection: {}", error);
                    break;
                }
            };

            debug!("Accepted connection from {}", peer);
            let connection = Connection {
                stream,
                peer,
                read_timeout: self.read_timeout,
                forwarder: forwarder.clone(),
                shutdown: shutdown.clone(),
            };
            task::spawn(async move {
                if connection.run().await.is_err() {
                    debug!("Dispatcher closed, dropping connection from {}", peer);
                }
            });
        }

        debug!("TCP listener stopped");
    }
}

struct Connection<R> {
    stream: R,
    peer: SocketAddr,
    read_timeout: Duration,
    forwarder: Forwarder,
    shutdown: Shutdown,
}

impl<R: io::Read + Unpin> Connection<R> {
    async fn run(mut self) -> Result<(), Closed> {
        let mut framer = Framer::new();
        let mut chunk = [0; READ_CHUNK_SIZE];

        loop {
            let read = io::timeout(self.read_timeout, self.stream.read(&mut chunk)).await;

            let (messages, keep_reading) = match read {
                Ok(0) => {
                    debug!("Connection from {} closed", self.peer);
                    (framer.flush(), false)
                }
                Ok(len) => (framer.push(&chunk[..len]), true),
                Err(error) if error.kind() == io::ErrorKind::TimedOut => {
                    trace!("Read from {} timed out", self.peer);
                    (framer.flush(), true)
                }
                Err(error) => {
                    warn!("Failed to read from {}: {}", self.peer, error);
                    (framer.flush(), false)
                }
            };

            self.forward(messages).await?;

            if !keep_reading {
                return Ok(());
            }

            if self.shutdown.is_triggered() {
                debug!("Closing connection from {} for shutdown", self.peer);
                return self.forward(framer.flush()).await;
            }
        }
    }

    async fn forward(&self, messages: Vec<Vec<u8>>) -> Result<(), Closed> {
        for message in messages {
            self.forwarder
                .forward(Entry::parse(&message, self.peer))
                .await?;
        }
        Ok(())
    }
}
