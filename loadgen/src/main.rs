// loadgen/src/main.rs

use std::env;
use std::error::Error;
use std::time::Duration;

use chrono::Utc;
use smol::Timer;
use structopt::StructOpt;

use loadgen::{format_message, message_text, Client, Protocol};
use syslog_monitor::{Facility, Severity};

#[derive(StructOpt)]
struct Args {
    #[structopt(long, default_value = "localhost")]
    host: String,

    #[structopt(long, default_value = "514")]
    port: u16,

    #[structopt(long, default_value = "udp", parse(try_from_str = Self::parse_protocol))]
    protocol: Protocol,

    #[structopt(long, default_value = "debug")]
    severity: Severity,

    #[structopt(long, default_value = "5", parse(try_from_str = Self::parse_count))]
    count: u32,

    #[structopt(long, default_value = "1000")]
    delay_ms: u64,

    /// Text to send in every message, instead of a numbered default
    message: Vec<String>,
}

impl Args {
    fn parse_protocol(input: &str) -> Result<Protocol, String> {
        match input {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            _ => Err(format!("unrecognised protocol: {}", input)),
        }
    }

    fn parse_count(input: &str) -> Result<u32, String> {
        match input.parse() {
            Ok(count) if count >= 1 => Ok(count),
            Ok(_) => Err("count must be at least 1".to_string()),
            Err(error) => Err(format!("invalid count {}: {}", input, error)),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::from_args();
    let hostname = env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    let delay = Duration::from_millis(args.delay_ms);

    smol::block_on(async {
        let address = smol::net::resolve((args.host.as_str(), args.port))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| format!("could not resolve {}", args.host))?;

        let mut client = Client::connect(args.protocol, address).await?;

        for sequence in 1..=args.count {
            let text = message_text(&args.message, sequence);
            let message =
                format_message(args.severity, Facility::USER, Utc::now(), &hostname, &text);
            client.send(&message).await?;
            println!("{}", message);

            if sequence < args.count {
                Timer::after(delay).await;
            }
        }

        Ok::<_, Box<dyn Error>>(())
    })
}
