//! piescan: acquire RGBI film scans and export their planes.

mod cli;
mod sweep;

use std::path::Path;
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use piescan_capture::config::{Config, OutputConfig};
use piescan_capture::signal::{self, CancelFlag, EXIT_CODE_INTERRUPTED};
use piescan_capture::sim::{SimulatedBackend, SimulatedScanner};
use piescan_capture::{
    export, logging, normalize, scan_image, DeviceBackend, DeviceSession, ImageBuffer,
};

use crate::cli::{Cli, Commands};
use crate::sweep::SweepPlan;

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Interrupted,
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(Outcome::Completed) => {}
        Ok(Outcome::Interrupted) => process::exit(EXIT_CODE_INTERRUPTED),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<Outcome> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    if matches!(cli.command, Commands::Config) {
        print!("{}", config.to_toml().context("Failed to render configuration")?);
        return Ok(Outcome::Completed);
    }

    let cancel = signal::install_handler().context("Failed to install interrupt handler")?;

    let scanner = SimulatedScanner::new(cli.device.pixels, cli.device.lines)
        .with_warmup_cycles(cli.device.warmup_cycles);
    let mut session =
        DeviceSession::new(SimulatedBackend::with_device(scanner)).with_warmup(config.warmup);
    session.open().context("Failed to open scanner")?;
    if let Some(device) = session.device() {
        info!("Using {} {} ({})", device.vendor, device.model, device.name);
    }

    let result = match &cli.command {
        Commands::Scan(args) => run_scan(&mut session, &config, args.index, &cancel),
        Commands::Sweep => run_sweep(&mut session, &config, &cancel),
        Commands::Config => Ok(Outcome::Completed),
    };
    session.close();
    result
}

fn run_scan<B: DeviceBackend>(
    session: &mut DeviceSession<B>,
    config: &Config,
    index: u32,
    cancel: &CancelFlag,
) -> Result<Outcome> {
    let started = Instant::now();
    let mut image = ImageBuffer::new();
    let report =
        scan_image(session, &config.settings, &mut image, cancel).context("Scan failed")?;
    if report.cancelled {
        warn!("Scan interrupted, nothing written");
        return Ok(Outcome::Interrupted);
    }

    export_capture(&mut image, &config.output, config.settings.light, index)?;
    info!(
        "Scan of {}x{} took {:.1} s",
        image.width(),
        image.height(),
        started.elapsed().as_secs_f64()
    );
    Ok(Outcome::Completed)
}

fn run_sweep<B: DeviceBackend>(
    session: &mut DeviceSession<B>,
    config: &Config,
    cancel: &CancelFlag,
) -> Result<Outcome> {
    let plan = SweepPlan::calibration();
    let mut image = ImageBuffer::new();

    for (n, step) in plan.iter().enumerate() {
        if cancel.is_requested() {
            warn!("Sweep interrupted before scan {} of {}", n + 1, plan.len());
            return Ok(Outcome::Interrupted);
        }

        let started = Instant::now();
        let settings = step.settings(&config.settings);
        let report = scan_image(session, &settings, &mut image, cancel).with_context(|| {
            format!("Scan {} with light {} failed", step.index, step.light)
        })?;
        if report.cancelled {
            warn!("Sweep interrupted during scan {} of {}", n + 1, plan.len());
            return Ok(Outcome::Interrupted);
        }

        export_capture(&mut image, &config.output, step.light, step.index)?;
        info!(
            "Processing scan {} of {} took {:.1} s",
            n + 1,
            plan.len(),
            started.elapsed().as_secs_f64()
        );
    }
    Ok(Outcome::Completed)
}

/// Write raw planes, then (optionally normalized) PNG planes.
fn export_capture(
    image: &mut ImageBuffer,
    output: &OutputConfig,
    light: i32,
    index: u32,
) -> Result<()> {
    if output.raw {
        let dir = output.dir.join("raw");
        create_dir(&dir)?;
        export::save_raw_planes(image, &dir, &output.prefix, light, index)
            .context("Failed to write raw planes")?;
    }

    if output.png {
        if output.normalize {
            let ranges = normalize::normalize(image);
            debug!("Channel ranges before normalization: {ranges:?}");
        }
        let dir = output.dir.join("png");
        create_dir(&dir)?;
        export::save_png_planes(image, &dir, &output.prefix, light, index)
            .context("Failed to write PNG planes")?;
    }
    Ok(())
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}
