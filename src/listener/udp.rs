// src/listener/udp.rs

//! Syslog over UDP.
//!
//! Every datagram is one message. Datagrams larger than [`MAX_DATAGRAM_SIZE`] are truncated by
//! the socket.

use std::io;
use std::net::SocketAddr;

use async_std::net::UdpSocket;
use async_std::prelude::*;
use log::{debug, info, trace, warn};

use crate::dispatch::Forwarder;
use crate::entry::Entry;
use crate::shutdown::Shutdown;

use super::BindError;

/// The largest datagram payload that will be read.
pub const MAX_DATAGRAM_SIZE: usize = 512;

/// A listener that receives syslog datagrams.
#[derive(Debug)]
pub struct UdpListener {
    socket: UdpSocket,
}

impl UdpListener {
    /// Bind a listener to `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] if the address can't be bound.
    pub async fn bind(address: SocketAddr) -> Result<Self, BindError> {
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|source| BindError::new("UDP", address, source))?;

        info!("Listening for syslog over UDP on {}", address);
        Ok(Self { socket })
    }

    /// The address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from the underlying socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive datagrams until `shutdown` is triggered or the dispatcher stops.
    ///
    /// Read errors are logged and otherwise ignored.
    pub async fn listen(self, forwarder: Forwarder, shutdown: Shutdown) {
        let mut buffer = [0; MAX_DATAGRAM_SIZE];

        loop {
            let socket = &self.socket;
            let received = async { Some(socket.recv_from(&mut buffer).await) }
                .race(async {
                    shutdown.wait().await;
                    None
                })
                .await;

            let (len, peer) = match received {
                None => break,
                Some(Ok(received)) => received,
                Some(Err(error)) => {
                    warn!("Failed to read from UDP socket: {}", error);
                    continue;
                }
            };

            let payload = trim_trailing_newlines(&buffer[..len]);
            if payload.is_empty() {
                trace!("Ignoring empty datagram from {}", peer);
                continue;
            }

            if forwarder.forward(Entry::parse(payload, peer)).await.is_err() {
                debug!("Dispatcher closed");
                break;
            }
        }

        debug!("UDP listener stopped");
    }
}

fn trim_trailing_newlines(mut payload: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n'] = payload {
        payload = rest;
    }
    payload
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_std::future;
    use async_std::net::UdpSocket;
    use async_std::task;

    use crate::dispatch::{Dispatcher, Filter, QUEUE_CAPACITY};
    use crate::severity::Severity;
    use crate::shutdown;
    use crate::test::{self, wait_for_lines, MemorySink};

    use super::{trim_trailing_newlines, UdpListener, MAX_DATAGRAM_SIZE};

    #[test]
    fn trims_only_trailing_newlines() {
        assert_eq!(trim_trailing_newlines(b"hello\n\n"), b"hello");
        assert_eq!(trim_trailing_newlines(b"\nhello"), b"\nhello");
        assert_eq!(trim_trailing_newlines(b"hello \r\n"), b"hello \r");
        assert_eq!(trim_trailing_newlines(b"\n"), b"");
    }

    #[async_std::test]
    async fn one_datagram_is_one_entry() -> test::Result {
        let sink = MemorySink::default();
        let (forwarder, mut dispatcher) =
            Dispatcher::new(Filter::new(Severity::WARNING, None), QUEUE_CAPACITY);
        dispatcher.add_sink(sink.clone());

        let listener = UdpListener::bind(([127, 0, 0, 1], 0).into()).await?;
        let address = listener.local_addr()?;

        let (trigger, shutdown) = shutdown::channel();
        let dispatching = task::spawn(dispatcher.run(shutdown.clone()));
        let listening = task::spawn(listener.listen(forwarder, shutdown));

        let client = UdpSocket::bind("127.0.0.1:0").await?;
        client.send_to(b"\n", address).await?;
        client.send_to(b"<15>too chatty\n", address).await?;
        client.send_to(b"<12>first<12>and only\n\n", address).await?;
        client.send_to(b"no priority", address).await?;

        let lines = wait_for_lines(&sink, 2).await;
        assert_eq!(lines.len(), 2, "{:?}", lines);
        assert!(
            lines[0].ends_with(" 127.0.0.1 warning/user: first<12>and only"),
            "{}",
            lines[0]
        );
        assert!(lines[1].ends_with(" 127.0.0.1: no priority"), "{}", lines[1]);

        trigger.trigger();
        future::timeout(Duration::from_secs(1), listening).await?;
        future::timeout(Duration::from_secs(1), dispatching).await?;

        Ok(())
    }

    // Other platforms report an error for truncated datagrams rather than a short read.
    #[cfg(unix)]
    #[async_std::test]
    async fn oversized_datagrams_are_truncated() -> test::Result {
        let sink = MemorySink::default();
        let (forwarder, mut dispatcher) = Dispatcher::new(Filter::default(), QUEUE_CAPACITY);
        dispatcher.add_sink(sink.clone());

        let listener = UdpListener::bind(([127, 0, 0, 1], 0).into()).await?;
        let address = listener.local_addr()?;

        let (_trigger, shutdown) = shutdown::channel();
        task::spawn(dispatcher.run(shutdown.clone()));
        task::spawn(listener.listen(forwarder, shutdown));

        let client = UdpSocket::bind("127.0.0.1:0").await?;
        let message = format!("<13>{}", "x".repeat(MAX_DATAGRAM_SIZE));
        client.send_to(message.as_bytes(), address).await?;

        let lines = wait_for_lines(&sink, 1).await;
        assert_eq!(lines.len(), 1, "{:?}", lines);
        let text = lines[0].rsplit(": ").next().unwrap();
        assert_eq!(text.len(), MAX_DATAGRAM_SIZE - "<13>".len());

        Ok(())
    }
}
