// main.rs

use std::error::Error;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use syslog_monitor::config::{Config, ConfigError};
use syslog_monitor::{shutdown, Severity};

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(StructOpt)]
#[structopt(about = "Report syslog messages received over UDP and TCP")]
struct Args {
    /// Address to listen on
    #[structopt(long, default_value = "0.0.0.0")]
    address: IpAddr,

    /// Port to listen on (UDP and TCP)
    #[structopt(long, default_value = "514")]
    port: u16,

    /// Append reported entries to this file
    #[structopt(long, parse(from_os_str))]
    file: Option<PathBuf>,

    /// Do not write to standard output (requires --file)
    #[structopt(long)]
    quiet: bool,

    /// Minimum severity of entries to report
    #[structopt(long, default_value = "debug")]
    severity: String,

    /// Only report entries whose text matches this regular expression
    #[structopt(long = "match")]
    pattern: Option<String>,

    /// Milliseconds a TCP connection may be idle before buffered bytes are reported
    #[structopt(long, default_value = "1000")]
    read_timeout_ms: u64,
}

impl Args {
    fn parse() -> Self {
        let severities = severity_help();
        let matches = Self::clap().after_help(severities.as_str()).get_matches();
        Self::from_clap(&matches)
    }

    fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = Config {
            address: self.address,
            port: self.port,
            output_file: self.file,
            quiet: self.quiet,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            ..Config::default()
        }
        .with_severity(&self.severity)?;

        if let Some(pattern) = &self.pattern {
            config = config.with_pattern(pattern)?;
        }

        config.validate()
    }
}

fn severity_help() -> String {
    format!("Severity values: {} (or 0-7)", Severity::possible_values())
}

#[async_std::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = Args::parse().into_config()?;

    if !config.quiet {
        println!(
            "{} V{} listening on port {} for severity >= {}",
            NAME, VERSION, config.port, config.min_severity
        );
    }

    // Nothing triggers shutdown here, the process runs until it is killed.
    let (_trigger, shutdown) = shutdown::channel();
    syslog_monitor::run(config, shutdown).await?;

    Ok(())
}
