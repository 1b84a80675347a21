//! SensorLedger CLI
//!
//! Command-line interface for a local ledger directory.

use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use sensorledger::contract::{Invocation, Response};
use sensorledger::journal::JournalRecovery;
use sensorledger::reading::prepare_payload;
use sensorledger::{Config, Ledger, LedgerError, TimestampLayout};
use tracing_subscriber::{fmt, EnvFilter};

/// SensorLedger CLI
#[derive(Parser, Debug)]
#[command(name = "sensorledger-cli")]
#[command(about = "Append/query ledger for IoT sensor readings")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./sensorledger_data")]
    data_dir: String,

    /// Timestamp rendering in keys: "fixed" (chronological) or "decimal" (legacy)
    #[arg(long, default_value = "fixed")]
    timestamp_layout: TimestampLayout,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a reading
    Create {
        /// Device identifier
        uuid: String,

        /// JSON payload
        payload: String,

        /// Reading time in unix millis (defaults to now)
        #[arg(short, long)]
        timestamp: Option<u64>,

        /// Store the payload byte-for-byte (no numeric coercion or stamping)
        #[arg(long)]
        raw: bool,
    },

    /// Get one reading
    Get {
        uuid: String,
        timestamp: u64,
    },

    /// List every reading of a device
    Query {
        uuid: String,
    },

    /// Show the newest reading of a device
    Latest {
        uuid: String,
    },

    /// Delete one reading
    Del {
        uuid: String,
        timestamp: u64,
    },

    /// Call a contract function by name with string arguments
    Invoke {
        /// Function name (e.g. CreateReading)
        function: String,

        /// Positional arguments
        args: Vec<String>,
    },

    /// Check the journal without modifying it
    Verify,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sensorledger=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .timestamp_layout(args.timestamp_layout)
        .build();

    if let Commands::Verify = args.command {
        verify(&config);
        return;
    }

    let invocation = match build_invocation(args.command) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let ledger = match Ledger::open(config) {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::error!("Failed to open ledger: {}", e);
            std::process::exit(1);
        }
    };

    let response = ledger.handle(invocation);
    print_response(&response);

    if let Err(e) = ledger.close() {
        tracing::error!("Failed to close ledger: {}", e);
        std::process::exit(1);
    }

    if !response.is_ok() {
        std::process::exit(1);
    }
}

/// Turn a subcommand into a contract invocation
fn build_invocation(command: Commands) -> sensorledger::Result<Invocation> {
    let invocation = match command {
        Commands::Create {
            uuid,
            payload,
            timestamp,
            raw,
        } => {
            let timestamp = timestamp.unwrap_or_else(now_millis);
            let payload = if raw {
                payload.into_bytes()
            } else {
                prepare_payload(payload.as_bytes(), &uuid, timestamp)?
            };
            Invocation::CreateReading {
                uuid,
                timestamp,
                payload,
            }
        }
        Commands::Get { uuid, timestamp } => Invocation::GetReading { uuid, timestamp },
        Commands::Query { uuid } => Invocation::QueryDevice { uuid },
        Commands::Latest { uuid } => Invocation::LatestReading { uuid },
        Commands::Del { uuid, timestamp } => Invocation::DeleteReading { uuid, timestamp },
        Commands::Invoke { function, args } => Invocation::parse(&function, &args)?,
        Commands::Verify => {
            return Err(LedgerError::InvalidArgument(
                "verify is not a contract function".to_string(),
            ))
        }
    };
    Ok(invocation)
}

fn print_response(response: &Response) {
    if response.is_ok() {
        match response.payload.as_deref() {
            Some(payload) => match serde_json::from_slice::<serde_json::Value>(payload) {
                Ok(value) => println!(
                    "{}",
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.payload_text())
                ),
                Err(_) => println!("{}", response.payload_text()),
            },
            None => println!("OK"),
        }
    } else {
        eprintln!("{:?}: {}", response.status, response.payload_text());
    }
}

fn verify(config: &Config) {
    let path = Ledger::journal_path_in(&config.data_dir);
    if !path.exists() {
        println!("No journal at {}", path.display());
        return;
    }

    match JournalRecovery::verify(&path) {
        Ok(result) => {
            println!("entries:   {}", result.entries_recovered);
            println!("last seq:  {}", result.last_seq);
            println!("damaged:   {} bytes", result.bytes_discarded);
            if result.bytes_discarded > 0 {
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!("Failed to verify journal: {}", e);
            std::process::exit(1);
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
