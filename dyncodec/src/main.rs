//! # Dyncodec CLI Entry Point
//!
//! The main executable for the dyncodec tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and sets up logging.
//! 2. **Connection**: Dials the node and builds a codec from its reflection services.
//! 3. **Execution**: Runs the requested command against the codec.
//! 4. **Presentation**: Formats and prints the result or error to standard output/error.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use dyncodec_core::{CancellationToken, Codec, client::dial};
use formatter::{FormattedString, Hex, RegistrySummary};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let filter = if args.verbose {
        "dyncodec=debug,dyncodec_core=debug,warn"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let codec = match dial(&args.url, args.dial_options(), &cancel).await {
        Ok(codec) => codec,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Inspect => Ok(FormattedString::from(RegistrySummary(codec.registry()))),
        Commands::Encode { type_name, json } => encode(&codec, &type_name, &json),
        Commands::Decode { type_name, bytes } => decode(&codec, &type_name, &bytes.0),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

fn encode(
    codec: &Codec,
    type_name: &str,
    json: &serde_json::Value,
) -> anyhow::Result<FormattedString> {
    let message = codec
        .unmarshal_text(&json.to_string(), type_name)
        .with_context(|| format!("Failed to parse '{type_name}' from JSON"))?;

    Ok(FormattedString::from(Hex(&codec.marshal_binary(&message))))
}

fn decode(codec: &Codec, type_name: &str, bytes: &[u8]) -> anyhow::Result<FormattedString> {
    let message = codec
        .unmarshal_binary(bytes, type_name)
        .with_context(|| format!("Failed to decode '{type_name}'"))?;

    let text = codec.marshal_text(&message)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    Ok(FormattedString::from(value))
}
