//! Command handlers for the CLI application.
//!
//! - `stream`: channel commands (info, send, recv)

pub mod stream;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use mcs_transport::{
    ChannelFilter, McsApi, McsClient, NativeMcs, OutputFormat, PrinterConfig, PrinterMcs,
};

use crate::cli::{ChannelArgs, Cli};
use crate::config::McsToolConfig;

/// Resolved channel, flags and open mode for one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub channel: u16,
    pub flags: u32,
    pub use_ex: bool,
}

impl Target {
    /// Command-line values win over config defaults
    pub fn resolve(args: &ChannelArgs, config: &McsToolConfig) -> Self {
        Self {
            channel: args.channel.unwrap_or(config.default_channel),
            flags: args.flags.unwrap_or(config.default_flags),
            use_ex: config.use_ex,
        }
    }
}

/// Monitor settings after merging CLI flags into the config section
pub fn printer_config(cli: &Cli, config: &McsToolConfig) -> Option<PrinterConfig> {
    let monitor = &config.monitor;
    if !(cli.monitor || monitor.enabled) {
        return None;
    }
    let format = if cli.monitor_json || monitor.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let filter = monitor
        .channel
        .map(ChannelFilter::Channel)
        .unwrap_or_default();
    Some(
        PrinterConfig::default()
            .with_hex(cli.monitor_hex || monitor.show_hex)
            .with_filter(filter)
            .with_format(format),
    )
}

/// Wrap a backend in the printer when monitoring is on
pub fn with_monitor(api: Arc<dyn McsApi>, printer: Option<PrinterConfig>) -> McsClient {
    match printer {
        Some(config) => McsClient::new(PrinterMcs::wrap(api, config)),
        None => McsClient::new(api),
    }
}

/// Load nnsmcs.dll and build the client every command uses
pub fn open_client(cli: &Cli, config: &McsToolConfig) -> anyhow::Result<McsClient> {
    let library = cli.library.clone().unwrap_or_else(|| config.library());
    let native = NativeMcs::load_from(&library)
        .with_context(|| format!("cannot use MCS module {}", library.display()))?;
    info!("Using MCS module {}", native.path().display());

    Ok(with_monitor(Arc::new(native), printer_config(cli, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use mcs_transport::{DeviceType, FakeMcs};

    #[test]
    fn test_target_prefers_cli_values() {
        let config = McsToolConfig {
            default_channel: 5,
            default_flags: 1,
            ..McsToolConfig::default()
        };
        let args = ChannelArgs {
            channel: Some(9),
            flags: None,
        };
        let target = Target::resolve(&args, &config);
        assert_eq!(target.channel, 9);
        assert_eq!(target.flags, 1);
        assert!(target.use_ex);
    }

    #[test]
    fn test_monitor_off_by_default() {
        let cli = Cli::parse_from(["mcs_tool", "info"]);
        assert!(printer_config(&cli, &McsToolConfig::default()).is_none());
    }

    #[test]
    fn test_monitor_merges_flags_and_config() {
        let cli = Cli::parse_from(["mcs_tool", "--monitor", "--monitor-json", "info"]);
        let mut config = McsToolConfig::default();
        config.monitor.show_hex = true;
        config.monitor.channel = Some(2);

        let printer = printer_config(&cli, &config).unwrap();
        assert!(printer.show_hex);
        assert_eq!(printer.format, OutputFormat::Json);
        assert_eq!(printer.filter, ChannelFilter::Channel(2));
    }

    #[test]
    fn test_monitored_client_still_opens() {
        let fake = Arc::new(FakeMcs::new().with_device(0, DeviceType::Ensata));
        let client = with_monitor(fake.clone(), Some(PrinterConfig::default()));
        assert_eq!(client.probe(0, 0).unwrap(), DeviceType::Ensata);
        assert_eq!(fake.open_count(), 0);
    }

    #[test]
    fn test_missing_library_is_reported() {
        let cli = Cli::parse_from([
            "mcs_tool",
            "--library",
            "/nonexistent/nnsmcs.dll",
            "info",
        ]);
        let err = open_client(&cli, &McsToolConfig::default()).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/nnsmcs.dll"));
    }
}
