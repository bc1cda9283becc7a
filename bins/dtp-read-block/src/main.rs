use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};

use dtp_client::{BlockReadClient, BlockReaderConfig};
use dtp_logging::LogConfig;
use dtp_types::BlockDescriptor;

/// Read one replicated block from its datanodes
///
/// Streams the block from the first healthy replica, verifying every chunk
/// checksum and failing over to the next replica on error.
#[derive(Parser, Debug)]
#[command(name = "dtp-read-block", version, about)]
struct Args {
    /// JSON file describing the block (pool, id, length, token, locations)
    #[arg(short, long)]
    block: PathBuf,

    /// Block offset to start reading from
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with `[reader]` and `[log]` tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the configured level
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ToolConfig {
    reader: BlockReaderConfig,
    log: LogConfig,
}

impl ToolConfig {
    fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.reader.validate()?;
        Ok(config)
    }

    fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}

fn load_block(path: &Path) -> anyhow::Result<BlockDescriptor> {
    let file = File::open(path).with_context(|| format!("opening block file {}", path.display()))?;
    serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("parsing block file {}", path.display()))
}

fn copy_block<W: Write>(
    client: &BlockReadClient,
    block: BlockDescriptor,
    offset: u64,
    mut out: W,
) -> io::Result<u64> {
    let copied = client.copy_to(block, offset, &mut out)?;
    out.flush()?;
    Ok(copied)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ToolConfig::load(path)?,
        None => ToolConfig::default(),
    };
    if args.verbose {
        config.log.level = "debug".into();
    }
    let _guard = dtp_logging::init_logging(&config.log)?;

    let block = load_block(&args.block)?;
    if args.offset > block.num_bytes {
        anyhow::bail!(
            "offset {} is past the end of block {} ({} bytes)",
            args.offset,
            block.block_id,
            block.num_bytes
        );
    }
    tracing::info!(
        block_id = %block.block_id,
        offset = args.offset,
        length = block.num_bytes,
        replicas = block.locations.len(),
        "reading block"
    );

    let client = BlockReadClient::new(config.reader);
    let block_id = block.block_id;
    let copied = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            copy_block(&client, block, args.offset, BufWriter::new(file))
        }
        None => copy_block(&client, block, args.offset, io::stdout().lock()),
    }
    .with_context(|| format!("reading block {}", block_id))?;

    tracing::info!(block_id = %block_id, bytes = copied, "block read complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tool_config_defaults() {
        let config = ToolConfig::from_toml_str("").unwrap();
        assert_eq!(config.reader, BlockReaderConfig::default());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_tool_config_tables() {
        let config = ToolConfig::from_toml_str(
            r#"
            [reader]
            client_name = "backup-job"
            connect_timeout = 2.5
            read_timeout = 30

            [log]
            level = "dtp_client=debug,info"
            json_format = true
            "#,
        )
        .unwrap();
        assert_eq!(config.reader.client_name, "backup-job");
        assert_eq!(config.reader.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.reader.read_timeout, Some(Duration::from_secs(30)));
        assert!(config.log.json_format);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "dtp-read-block",
            "--block",
            "blk.json",
            "--offset",
            "4096",
            "-o",
            "out.bin",
        ])
        .unwrap();
        assert_eq!(args.block, PathBuf::from("blk.json"));
        assert_eq!(args.offset, 4096);
        assert_eq!(args.output, Some(PathBuf::from("out.bin")));
        assert!(args.config.is_none());
    }
}
