// CLI definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcs_tool")]
#[command(author, version, about = "Open and exchange data on MCS debug channels")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/mcs/mcs_tool.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to nnsmcs.dll (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Print every module call (open/read/write/close) to stderr
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Include payload hex dumps in monitor output
    #[arg(long, global = true)]
    pub monitor_hex: bool,

    /// Monitor output as JSON lines
    #[arg(long, global = true)]
    pub monitor_json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Channel selection shared by all stream commands
#[derive(Args, Debug, Clone, Default)]
pub struct ChannelArgs {
    /// Channel id (decimal or 0x hex; default from config)
    #[arg(short, long, value_parser = parse_u16)]
    pub channel: Option<u16>,

    /// Open flags passed through to the module (decimal or 0x hex)
    #[arg(short, long, value_parser = parse_u32)]
    pub flags: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a channel and report the device serving it
    #[command(visible_aliases = ["probe", "i"])]
    Info {
        #[command(flatten)]
        target: ChannelArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a file (or stdin) to a channel
    #[command(visible_alias = "s")]
    Send {
        #[command(flatten)]
        target: ChannelArgs,

        /// Input file (stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Read from a channel to stdout
    #[command(visible_alias = "r")]
    Recv {
        #[command(flatten)]
        target: ChannelArgs,

        /// Stop after this many bytes (default: until end of stream)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Print a hex dump instead of raw bytes
        #[arg(long)]
        hex: bool,

        /// Stop once nothing more is buffered instead of waiting for end of stream
        #[arg(short, long)]
        drain: bool,
    },
}

fn parse_radix(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

/// Parse a u16 given in decimal or 0x hex
pub fn parse_u16(s: &str) -> Result<u16, String> {
    let v = parse_radix(s)?;
    u16::try_from(v).map_err(|_| format!("'{s}' does not fit in 16 bits"))
}

/// Parse a u32 given in decimal or 0x hex
pub fn parse_u32(s: &str) -> Result<u32, String> {
    let v = parse_radix(s)?;
    u32::try_from(v).map_err(|_| format!("'{s}' does not fit in 32 bits"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_u16("0x4D43"), Ok(0x4D43));
        assert_eq!(parse_u16("19779"), Ok(0x4D43));
        assert!(parse_u16("0x10000").is_err());
        assert_eq!(parse_u32("0xFFFFFFFF"), Ok(u32::MAX));
        assert!(parse_u32("-1").is_err());
        assert!(parse_u32("abc").is_err());
    }

    #[test]
    fn test_recv_args() {
        let cli = Cli::parse_from([
            "mcs_tool", "--monitor", "recv", "-c", "0x1", "-n", "4", "--hex", "-d",
        ]);
        assert!(cli.monitor);
        match cli.command {
            Commands::Recv {
                target,
                count,
                hex,
                drain,
            } => {
                assert_eq!(target.channel, Some(1));
                assert_eq!(target.flags, None);
                assert_eq!(count, Some(4));
                assert!(hex);
                assert!(drain);
            }
            _ => panic!("expected recv"),
        }
    }
}
