// src/config.rs

//! Configuration for [`run`](crate::run).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

use crate::listener::tcp::DEFAULT_READ_TIMEOUT;
use crate::severity::{self, Severity};

/// The standard syslog port.
pub const DEFAULT_PORT: u16 = 514;

/// Configuration for [`run`](crate::run).
#[derive(Clone, Debug)]
pub struct Config {
    /// The address to bind the UDP and TCP listeners to.
    pub address: IpAddr,

    /// The port to bind the UDP and TCP listeners to.
    pub port: u16,

    /// The least severe entries to report. Entries without a severity are always reported.
    pub min_severity: Severity,

    /// If set, only entries whose text matches are reported.
    pub pattern: Option<Regex>,

    /// A file to append reported entries to.
    pub output_file: Option<PathBuf>,

    /// Don't report entries to standard output.
    pub quiet: bool,

    /// How long TCP reads wait before flushing buffered bytes as a message.
    pub read_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            min_severity: Severity::DEFAULT,
            pattern: None,
            output_file: None,
            quiet: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Possible errors when building a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The minimum severity wasn't recognised.
    #[error(transparent)]
    Severity(#[from] severity::ParseError),

    /// The match pattern isn't a valid regular expression.
    #[error("invalid match pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Port 0 was requested.
    #[error("port must be in the range 1..65535")]
    Port,

    /// Quiet was requested with nowhere else to write entries.
    #[error("can only be quiet if an output file is specified")]
    QuietWithoutFile,
}

impl Config {
    /// Set the minimum severity from its name or numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Severity`] if `severity` isn't recognised.
    pub fn with_severity(mut self, severity: &str) -> Result<Self, ConfigError> {
        self.min_severity = severity.parse()?;
        Ok(self)
    }

    /// Set the match pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if `pattern` isn't a valid regular expression.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Check the configuration can be used to start the service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Port`] for port 0, or [`ConfigError::QuietWithoutFile`] if `quiet`
    /// is set without an `output_file`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Port);
        }
        if self.quiet && self.output_file.is_none() {
            return Err(ConfigError::QuietWithoutFile);
        }
        Ok(self)
    }

    /// The address to bind listeners to.
    #[must_use]
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}
