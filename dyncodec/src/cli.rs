//! # CLI
//!
//! Command-line interface of `dyncodec`, parsed with `clap`.
//!
//! Arguments are validated here (JSON bodies must parse, byte payloads must be valid hex) so the
//! commands only ever see well-formed input.
use clap::{Parser, Subcommand};
use dyncodec_core::{ReflectionVersion, client::DialOptions};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "dyncodec",
    version,
    about = "Encode and decode protobuf messages of a live node"
)]
pub struct Cli {
    /// The node URL to connect to (e.g. http://localhost:9090)
    pub url: String,

    /// Server reflection protocol revision spoken by the node (v1 or v1alpha)
    #[arg(long, global = true, default_value = "v1alpha")]
    pub reflection_version: ReflectionVersion,

    /// Give up connecting after this many seconds
    #[arg(long, global = true)]
    pub connect_timeout_secs: Option<u64>,

    /// Log what the codec builder is doing. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn dial_options(&self) -> DialOptions {
        DialOptions {
            reflection_version: self.reflection_version,
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            host: None,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the schema files the codec registered and the type URLs it accepts
    Inspect,

    /// Encode a JSON message into its canonical binary form, printed as hex
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// dyncodec http://localhost:9090 encode cosmos.bank.v1beta1.MsgSend --json '{"fromAddress": "..."}'
    /// ```
    Encode {
        /// Fully qualified message name (e.g. cosmos.bank.v1beta1.MsgSend)
        type_name: String,
        /// Message in protobuf JSON
        #[arg(long, value_parser = parse_json)]
        json: serde_json::Value,
    },

    /// Decode hex encoded binary into protobuf JSON
    Decode {
        /// Fully qualified message name (e.g. cosmos.bank.v1beta1.MsgSend)
        type_name: String,
        /// Hex encoded message bytes
        #[arg(value_parser = parse_hex)]
        bytes: HexBytes,
    },
}

#[derive(Debug, Clone)]
pub struct HexBytes(pub Vec<u8>);

fn parse_json(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}

fn parse_hex(value: &str) -> Result<HexBytes, String> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);

    hex::decode(value)
        .map(HexBytes)
        .map_err(|e| format!("Invalid hex: {e}"))
}
