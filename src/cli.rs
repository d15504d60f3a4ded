//! Command-line interface definitions.
//!
//! ```bash
//! # One scan with the configured settings
//! piescan scan --resolution 3600
//!
//! # The exposure calibration sweep, raw planes only
//! piescan --config scanner.toml sweep --no-png
//!
//! # Show the configuration after file and environment overrides
//! piescan --config scanner.toml config
//!
//! # Debug logging
//! piescan -v scan
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use piescan_capture::config::Config;

/// Acquisition tool for RGBI film scanners.
#[derive(Debug, Parser)]
#[command(name = "piescan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true, env = "PIESCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output directory (overrides the configuration)
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output: Option<PathBuf>,

    /// Write PNGs without stretching each channel
    #[arg(long, global = true)]
    pub no_normalize: bool,

    /// Skip PNG export
    #[arg(long, global = true)]
    pub no_png: bool,

    /// Skip raw plane export
    #[arg(long, global = true)]
    pub no_raw: bool,

    /// Simulated scanner geometry
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Acquire a single image
    Scan(ScanArgs),
    /// Run the exposure calibration sweep
    Sweep,
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Scan resolution in dpi
    #[arg(long)]
    pub resolution: Option<i32>,

    /// Lamp setting
    #[arg(long)]
    pub light: Option<i32>,

    /// Image index used in output file names
    #[arg(long, default_value_t = 0)]
    pub index: u32,
}

/// Largest simulated line width or height.
const MAX_DIMENSION: i64 = 65_536;

/// Geometry and behaviour of the simulated scanner.
#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Pixels per scan line
    #[arg(
        long,
        default_value_t = 1024,
        global = true,
        value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION)
    )]
    pub pixels: u32,

    /// Lines per image
    #[arg(
        long,
        default_value_t = 680,
        global = true,
        value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION)
    )]
    pub lines: u32,

    /// Start requests answered with warm-up before the scan begins
    #[arg(long, default_value_t = 0, global = true, hide = true)]
    pub warmup_cycles: u32,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output {
            config.output.dir.clone_from(dir);
        }
        if self.no_normalize {
            config.output.normalize = false;
        }
        if self.no_png {
            config.output.png = false;
        }
        if self.no_raw {
            config.output.raw = false;
        }
        if let Commands::Scan(args) = &self.command {
            if let Some(resolution) = args.resolution {
                config.settings.resolution = resolution;
            }
            if let Some(light) = args.light {
                config.settings.light = light;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_help() {
        let result = Cli::try_parse_from(["piescan", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["piescan"]).is_err());
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["piescan", "-q", "-v", "scan"]).is_err());
    }

    #[test]
    fn test_cli_scan_overrides_config() {
        let cli = Cli::try_parse_from([
            "piescan",
            "-vv",
            "scan",
            "--resolution",
            "3600",
            "--light",
            "0",
            "--output",
            "out",
            "--no-normalize",
        ])
        .expect("valid arguments");
        assert_eq!(cli.verbose, 2);

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.settings.resolution, 3600);
        assert_eq!(config.settings.light, 0);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert!(!config.output.normalize);
        assert!(config.output.png);
    }

    #[test]
    fn test_cli_config_subcommand() {
        let cli = Cli::try_parse_from(["piescan", "--config", "scanner.toml", "config"])
            .expect("valid arguments");
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.config, Some(PathBuf::from("scanner.toml")));
    }

    #[test]
    fn test_cli_sweep_with_geometry() {
        let cli = Cli::try_parse_from(["piescan", "sweep", "--pixels", "64", "--lines", "32", "--no-raw"])
            .expect("valid arguments");
        assert!(matches!(cli.command, Commands::Sweep));
        assert_eq!(cli.device.pixels, 64);
        assert_eq!(cli.device.lines, 32);

        let mut config = Config::default();
        cli.apply(&mut config);
        assert!(!config.output.raw);
        assert_eq!(config.settings.resolution, 300);
    }

    #[test]
    fn test_cli_rejects_out_of_range_geometry() {
        assert!(Cli::try_parse_from(["piescan", "scan", "--pixels", "536870912"]).is_err());
        assert!(Cli::try_parse_from(["piescan", "scan", "--lines", "0"]).is_err());
        assert!(Cli::try_parse_from(["piescan", "scan", "--pixels", "65536"]).is_ok());
    }
}
