// loadgen/src/lib.rs

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use chrono::{DateTime, SecondsFormat, Utc};
use smol::net::{TcpStream, UdpSocket};
use smol::prelude::*;

use syslog_monitor::{Facility, Severity};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Protocol {
    Udp,
    Tcp,
}

/// The text of message number `sequence`: the `words` joined by spaces, or a numbered default
/// if there are none.
pub fn message_text(words: &[String], sequence: u32) -> String {
    if words.is_empty() {
        format!("message {}", sequence)
    } else {
        words.join(" ")
    }
}

/// Format an RFC 5424 message with no structured data.
pub fn format_message(
    severity: Severity,
    facility: Facility,
    timestamp: DateTime<Utc>,
    hostname: &str,
    text: &str,
) -> String {
    let priority = u16::from(facility.code()) * 8 + u16::from(severity.code());
    format!(
        "<{}>1 {} {} loadgen - - - {}",
        priority,
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        hostname,
        text
    )
}

pub enum Client {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl Client {
    pub async fn connect(protocol: Protocol, address: SocketAddr) -> io::Result<Self> {
        match protocol {
            Protocol::Udp => {
                let local: SocketAddr = if address.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(local).await?;
                socket.connect(address).await?;
                Ok(Self::Udp(socket))
            }
            Protocol::Tcp => Ok(Self::Tcp(TcpStream::connect(address).await?)),
        }
    }

    pub async fn send(&mut self, message: &str) -> io::Result<()> {
        match self {
            Self::Udp(socket) => {
                socket.send(message.as_bytes()).await?;
            }
            Self::Tcp(stream) => {
                stream.write_all(message.as_bytes()).await?;
                stream.write_all(b"\n").await?;
                stream.flush().await?;
            }
        }
        Ok(())
    }
}
