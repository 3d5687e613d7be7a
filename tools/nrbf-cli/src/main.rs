//! NRBF CLI - inspect and edit .NET BinaryFormatter streams
//!
//! # Commands
//!
//! - `nrbf dump` - Print the decoded records of a stream
//! - `nrbf check` - Decode, re-encode and compare against the input bytes
//! - `nrbf set-string` - Replace the value of a string object and write a new stream
//!
//! # Usage
//!
//! ```bash
//! # Inspect a save file
//! nrbf dump save.dat --json
//!
//! # Streams written by BinaryFormatter often refer forward
//! nrbf check save.dat --allow-forward-refs
//!
//! # Rename the player
//! nrbf set-string save.dat edited.dat --id 3 --value "Ada Lovelace"
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod check;
mod dump;
mod set_string;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nether_nrbf::{CodecConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NULL_SLOTS, ReferencePolicy};

/// NRBF CLI - inspect and edit .NET BinaryFormatter streams
#[derive(Parser)]
#[command(name = "nrbf")]
#[command(about = "Inspect and edit MS-NRBF (.NET BinaryFormatter) streams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decoded records of a stream
    Dump(dump::DumpArgs),

    /// Check that a stream re-encodes to identical bytes
    Check(check::CheckArgs),

    /// Replace the value of a BinaryObjectString and write the result
    SetString(set_string::SetStringArgs),
}

/// Decoder options shared by every command
#[derive(Args)]
pub struct CodecArgs {
    /// Accept references to objects defined later in the stream
    #[arg(long)]
    pub allow_forward_refs: bool,

    /// Maximum nesting depth of inline records
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Maximum number of slots null runs may expand to
    #[arg(long, default_value_t = DEFAULT_MAX_NULL_SLOTS)]
    pub max_null_slots: usize,
}

impl CodecArgs {
    pub fn config(&self) -> CodecConfig {
        let reference_policy = if self.allow_forward_refs {
            ReferencePolicy::Deferred
        } else {
            ReferencePolicy::Strict
        };
        CodecConfig {
            reference_policy,
            max_depth: self.max_depth,
            max_null_slots: self.max_null_slots,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump(args) => dump::execute(args),
        Commands::Check(args) => check::execute(args),
        Commands::SetString(args) => set_string::execute(args),
    }
}
