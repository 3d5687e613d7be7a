//! Set-string command - replace a string object's value and write a new stream

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use nether_nrbf::Record;
use tracing::info;

use crate::CodecArgs;

/// Arguments for the set-string command
#[derive(Args)]
pub struct SetStringArgs {
    /// NRBF stream to read
    pub input: PathBuf,

    /// Where to write the edited stream
    pub output: PathBuf,

    /// Object id of the BinaryObjectString to change
    #[arg(long)]
    pub id: i32,

    /// New string value
    #[arg(long)]
    pub value: String,

    #[command(flatten)]
    pub codec: CodecArgs,
}

/// Execute the set-string command
pub fn execute(args: SetStringArgs) -> Result<()> {
    let config = args.codec.config();
    let mut records = nether_nrbf::decode_from_path_with(&args.input, &config)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    match records.find_object_mut(args.id) {
        Some(Record::BinaryObjectString(string)) => {
            info!("Object {}: {:?} -> {:?}", args.id, string.value, args.value);
            string.value = args.value;
        }
        Some(other) => bail!(
            "Object {} is a {}, not a string",
            args.id,
            other.record_type().name()
        ),
        None => bail!("No object with id {} in {}", args.id, args.input.display()),
    }

    let written = nether_nrbf::encode_to_path_with(&records, &args.output, &config)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!("Wrote {} ({} bytes)", args.output.display(), written);
    Ok(())
}
