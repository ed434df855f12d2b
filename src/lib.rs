// lib.rs

//! The elements that drive the `syslog-monitor` binary.
//!
//! Messages arrive through the [`listener`]s, are parsed into [`Entry`]s, and pass through a
//! bounded queue to the [`dispatch`] loop, which filters them and writes them to every
//! [`sink`].

#![warn(
    explicit_outlives_requirements,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_lifetimes,
    variant_size_differences,
    clippy::cargo,
    clippy::pedantic
)]

pub mod config;
pub mod dispatch;
pub mod entry;
pub mod facility;
pub mod listener;
pub mod severity;
pub mod shutdown;
pub mod sink;


use std::io;
use std::path::PathBuf;

use async_std::prelude::*;
use async_std::task;
use log::debug;

pub use config::Config;
pub use entry::Entry;
pub use facility::Facility;
pub use severity::Severity;

use dispatch::{Dispatcher, Filter, QUEUE_CAPACITY};
use listener::{BindError, TcpListener, UdpListener};
use shutdown::Shutdown;

/// Possible errors when starting the service.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// A listener couldn't be bound.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The output file couldn't be opened.
    #[error("could not open {}: {source}", .path.display())]
    OpenFile {
        /// The path of the output file.
        path: PathBuf,

        /// The underlying error.
        source: io::Error,
    },
}

/// Run the service described by `config` until `shutdown` is triggered.
///
/// The output sinks are opened and both listeners bound before anything is spawned, so any setup
/// failure is returned without receiving a single message.
///
/// # Errors
///
/// Returns a [`StartError`] if the output file can't be opened or a listener can't be bound.
pub async fn run(config: Config, shutdown: Shutdown) -> Result<(), StartError> {
    let filter = Filter::new(config.min_severity, config.pattern.clone());
    let (forwarder, mut dispatcher) = Dispatcher::new(filter, QUEUE_CAPACITY);

    if let Some(path) = &config.output_file {
        let file = sink::file(path).map_err(|source| StartError::OpenFile {
            path: path.clone(),
            source,
        })?;
        dispatcher.add_sink(file);
    }
    if !config.quiet {
        dispatcher.add_sink(sink::stdout());
    }

    let address = config.socket_address();
    let udp = UdpListener::bind(address).await?;
    let tcp = TcpListener::bind(address, config.read_timeout).await?;

    // Sink writes block, so the dispatcher gets a thread of its own.
    let dispatching = task::spawn_blocking({
        let shutdown = shutdown.clone();
        move || task::block_on(dispatcher.run(shutdown))
    });

    let udp = task::spawn(udp.listen(forwarder.clone(), shutdown.clone()));
    let tcp = task::spawn(tcp.listen(forwarder, shutdown));

    udp.join(tcp).await;
    dispatching.await;

    debug!("Service stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::net::{TcpListener, UdpSocket};
    use std::time::Duration;

    use async_std::future;
    use async_std::task;

    use crate::config::Config;
    use crate::shutdown;
    use crate::test;

    use super::StartError;

    #[async_std::test]
    async fn reports_to_file_until_shutdown() -> test::Result {
        let tempdir = tempfile::tempdir()?;
        let path = tempdir.path().join("syslog.txt");

        // Find a port that's free for both protocols.
        let port = {
            let udp = UdpSocket::bind("127.0.0.1:0")?;
            let port = udp.local_addr()?.port();
            TcpListener::bind(("127.0.0.1", port))?;
            port
        };

        let config = Config {
            address: [127, 0, 0, 1].into(),
            port,
            output_file: Some(path.clone()),
            quiet: true,
            ..Config::default()
        }
        .with_severity("warning")?
        .validate()?;

        let (trigger, shutdown) = shutdown::channel();
        let running = task::spawn(super::run(config, shutdown));

        // Give the listeners a moment to bind.
        task::sleep(Duration::from_millis(100)).await;

        let client = UdpSocket::bind("127.0.0.1:0")?;
        client.send_to(b"<11>disk on fire", ("127.0.0.1", port))?;
        client.send_to(b"<14>just fyi", ("127.0.0.1", port))?;

        let mut contents = String::new();
        for _ in 0..200 {
            contents = fs::read_to_string(&path)?;
            if !contents.is_empty() {
                break;
            }
            task::sleep(Duration::from_millis(10)).await;
        }

        trigger.trigger();
        future::timeout(Duration::from_secs(3), running).await??;

        let lines: Vec<_> = fs::read_to_string(&path)?.lines().map(String::from).collect();
        assert_eq!(lines.len(), 1, "{:?}", lines);
        assert!(lines[0].ends_with(" 127.0.0.1 error/user: disk on fire"), "{}", lines[0]);
        assert!(!contents.is_empty());

        Ok(())
    }

    #[async_std::test]
    async fn bind_failure_is_reported() -> test::Result {
        let taken = UdpSocket::bind("127.0.0.1:0")?;
        let config = Config {
            address: [127, 0, 0, 1].into(),
            port: taken.local_addr()?.port(),
            ..Config::default()
        };

        let (_trigger, shutdown) = shutdown::channel();
        let error = super::run(config, shutdown).await.unwrap_err();

        match &error {
            StartError::Bind(bind) => assert_eq!(bind.address(), taken.local_addr()?),
            other => panic!("expected a bind error, got {:?}", other),
        }
        assert!(error.to_string().starts_with("unable to listen on UDP 127.0.0.1:"));

        Ok(())
    }

    #[async_std::test]
    async fn unopenable_file_is_reported() -> test::Result {
        let tempdir = tempfile::tempdir()?;
        let config = Config {
            output_file: Some(tempdir.path().join("missing").join("syslog.txt")),
            ..Config::default()
        };

        let (_trigger, shutdown) = shutdown::channel();
        let error = super::run(config, shutdown).await.unwrap_err();

        assert!(matches!(error, StartError::OpenFile { .. }), "{:?}", error);

        Ok(())
    }
}
