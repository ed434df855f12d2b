// listener/mod.rs

//! Network listeners that feed received messages into the dispatch pipeline.
//!
//! Both listeners bind at construction time, so a port that can't be bound is reported before any
//! task is spawned. Once running, they only stop when their [`Shutdown`](crate::shutdown::Shutdown)
//! is triggered or the dispatcher goes away.

pub mod tcp;
pub mod udp;

use std::io;
use std::net::SocketAddr;

pub use tcp::{Framer, TcpListener};
pub use udp::UdpListener;

/// An error binding a listener's socket.
#[derive(Debug, thiserror::Error)]
#[error("unable to listen on {protocol} {address}: {source}")]
pub struct BindError {
    protocol: &'static str,
    address: SocketAddr,
    source: io::Error,
}

impl BindError {
    fn new(protocol: &'static str, address: SocketAddr, source: io::Error) -> Self {
        Self {
            protocol,
            address,
            source,
        }
    }

    /// The address that couldn't be bound.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }
}
