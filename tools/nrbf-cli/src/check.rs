//! Check command - verify that a stream survives a decode/encode round trip

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::{info, warn};

use crate::CodecArgs;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// NRBF stream to check
    pub input: PathBuf,

    #[command(flatten)]
    pub codec: CodecArgs,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let config = args.codec.config();
    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let records = nether_nrbf::decode_with(&data, &config)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;
    let encoded = nether_nrbf::encode_with(&records, &config).context("Failed to re-encode")?;

    if encoded != data {
        let first_difference = encoded
            .iter()
            .zip(&data)
            .position(|(a, b)| a != b)
            .unwrap_or(encoded.len().min(data.len()));
        warn!(
            offset = first_difference,
            original = data.len(),
            encoded = encoded.len(),
            "re-encoded bytes differ"
        );
        bail!(
            "{}: re-encoded stream differs from input at offset {}",
            args.input.display(),
            first_difference
        );
    }

    info!("{}: {} records, round trip OK", args.input.display(), records.len());
    println!("OK");
    Ok(())
}
