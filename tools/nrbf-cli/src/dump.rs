//! Dump command - print the decoded records of a stream

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::CodecArgs;

/// Arguments for the dump command
#[derive(Args)]
pub struct DumpArgs {
    /// NRBF stream to read
    pub input: PathBuf,

    /// Print the records as JSON instead of Rust debug output
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub codec: CodecArgs,
}

/// Execute the dump command
pub fn execute(args: DumpArgs) -> Result<()> {
    let records = nether_nrbf::decode_from_path_with(&args.input, &args.codec.config())
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    info!("{}: {} records", args.input.display(), records.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for (index, record) in records.iter().enumerate() {
        match record.object_id() {
            Some(id) => println!("[{index}] {} (id {id})", record.record_type().name()),
            None => println!("[{index}] {}", record.record_type().name()),
        }
        println!("{record:#?}");
    }

    Ok(())
}
