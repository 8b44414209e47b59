//! diskspeed CLI entry point

use anyhow::{Context, Result};
use diskspeed::config::cli::Cli;
use diskspeed::config::cli_convert::build_config;
use diskspeed::config::toml::{parse_toml_file, FileConfig};
use diskspeed::config::validator::validate_config;
use diskspeed::engine::sync::SyncEngine;
use diskspeed::output::json::{write_report, JsonReport};
use diskspeed::output::text;
use diskspeed::util::memory::{physical_memory_bytes, MIB};
use diskspeed::Session;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    cli.validate()?;

    let file = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => FileConfig::default(),
    };

    let physical_memory = physical_memory_bytes()?;
    let current_dir = std::env::current_dir().context("Failed to determine current directory")?;
    let config = build_config(&cli, &file, physical_memory, current_dir)?;
    validate_config(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !cli.json {
        writeln!(out, "{}", text::banner())?;
    }
    if cli.verbose {
        let settings = text::settings_line(
            config.session.runs,
            config.session.seconds,
            config.benchmark.workers,
            config.benchmark.dataset_bytes,
        );
        // Keep stdout parseable in JSON mode
        if cli.json {
            info!("{}", settings);
        } else {
            writeln!(out, "{}", settings)?;
        }
        info!("Number of CPU cores: {}", num_cpus::get());
        info!("Total system RAM: {} MB", physical_memory / MIB);
        info!("Working directory: {}", config.benchmark.base_dir.display());
    }

    let mut session = Session::start(config.benchmark.clone(), Arc::new(SyncEngine::new()))?;
    debug!(dir = %session.workspace_dir().display(), "test directory created");

    let json = cli.json;
    let outcome = session.run(&config.session, |_, result| {
        if !json {
            // stdout errors surface again at the final flush
            let _ = text::write_run(&mut out, result);
        }
    });

    let report = session.finish();
    outcome?;

    if json {
        write_report(&mut out, &JsonReport::from_session(&report, physical_memory))?;
    }
    out.flush()?;

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins, otherwise warn (debug with `--verbose`)
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}
