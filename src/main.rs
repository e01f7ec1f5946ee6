use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

use bgr_fixer::{
    config::Config,
    discovery::discover,
    video::output_path_for,
    Driver,
};

const USAGE: &str = "Usage: bgr-fixer /path/or/video.mp4 [max_workers]";

#[derive(Parser)]
#[command(
    name = "bgr-fixer",
    version,
    about = "Repair videos whose red and blue channels were swapped",
    long_about = "bgr-fixer re-encodes videos with their red and blue channels exchanged back. A single file is written to a <name>_fix sibling for inspection; a directory is corrected in place, several files at a time."
)]
struct Cli {
    /// Video file (written to a _fix sibling) or directory (fixed in place)
    path: Option<PathBuf>,

    /// Number of files corrected at once in directory mode
    max_workers: Option<usize>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List what would be corrected without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(input) = cli.path else {
        println!("{}", USAGE);
        std::process::exit(1);
    };

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase())),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting bgr-fixer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => Config::default(),
    };
    if let Some(workers) = cli.max_workers {
        config.workers.max_workers = workers;
    }
    config.validate()?;

    let found = discover(&input, &config.naming);
    println!(
        "Found {} {} files. Test mode: {}",
        found.len(),
        config.naming.extension,
        found.mode.is_test()
    );

    if cli.dry_run {
        for path in &found.files {
            println!(
                "{} -> {}",
                path.display(),
                output_path_for(path, found.mode, &config.naming).display()
            );
        }
        return Ok(());
    }

    let driver = Driver::new(config);
    if !found.mode.is_test() {
        info!("Correcting with up to {} workers", driver.config().workers.max_workers);
    }
    let summary = driver.run(&found, |outcome| match outcome {
        Ok(report) => println!("{}", report.message()),
        Err(failure) => println!("Failed {}: {}", failure.path.display(), failure.error.user_message()),
    })?;

    if summary.total() > 0 {
        println!("Summary: {} fixed, {} failed", summary.fixed.len(), summary.failed.len());
    }

    let needs_cleanup: Vec<_> = summary
        .failed
        .iter()
        .filter(|failure| failure.error.is_recoverable())
        .collect();
    if !needs_cleanup.is_empty() {
        warn!("{} failed files may need manual cleanup:", needs_cleanup.len());
        for failure in needs_cleanup {
            warn!("  {}", failure.path.display());
        }
    }

    if !summary.is_success() {
        bail!("{} of {} files could not be corrected", summary.failed.len(), summary.total());
    }

    Ok(())
}
