//! # Parallel Driver
//!
//! Runs the corrector once per discovered file. Test runs happen inline;
//! batch runs go through a fixed-size rayon pool and report each outcome as
//! soon as its job finishes.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    discovery::{Discovery, OperatingMode},
    error::{FixFailure, FixerError, Result},
    video::{fix_video, FixReport},
};

/// Result of correcting one file
pub type FixOutcome = std::result::Result<FixReport, FixFailure>;

/// Tally of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub fixed: Vec<PathBuf>,
    pub failed: Vec<FixFailure>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: FixOutcome) {
        match outcome {
            Ok(report) => self.fixed.push(report.path),
            Err(failure) => self.failed.push(failure),
        }
    }

    pub fn total(&self) -> usize {
        self.fixed.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orchestrates corrections over a discovered file set
pub struct Driver {
    config: Arc<Config>,
}

impl Driver {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Correct every file in `discovery`, calling `on_outcome` as each one completes.
    pub fn run<F>(&self, discovery: &Discovery, on_outcome: F) -> Result<RunSummary>
    where
        F: FnMut(&FixOutcome),
    {
        let workers = self.config.workers.max_workers;
        let encoder_threads = encoder_threads_for(discovery.mode, workers);
        let config = Arc::clone(&self.config);

        self.run_with(discovery, on_outcome, move |path, mode| {
            fix_video(path, mode, &config, encoder_threads)
        })
    }

    /// Like [`Driver::run`], with the per-file job supplied by the caller.
    pub fn run_with<F, J>(&self, discovery: &Discovery, mut on_outcome: F, job: J) -> Result<RunSummary>
    where
        F: FnMut(&FixOutcome),
        J: Fn(&Path, OperatingMode) -> Result<FixReport> + Send + Sync + 'static,
    {
        let mut summary = RunSummary::default();

        if discovery.is_empty() {
            debug!("Nothing to correct");
            return Ok(summary);
        }

        match discovery.mode {
            OperatingMode::Test => {
                for path in &discovery.files {
                    let outcome = run_job(&job, path, OperatingMode::Test);
                    on_outcome(&outcome);
                    summary.record(outcome);
                }
            }
            OperatingMode::Batch => {
                let workers = self.config.workers.max_workers;
                let cpus = num_cpus::get();
                if workers > cpus {
                    warn!("{} workers requested on {} logical CPUs", workers, cpus);
                }

                let pool = ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("bgr-fixer-worker-{}", i))
                    .build()
                    .map_err(|e| FixerError::generic(format!("could not start worker pool: {}", e)))?;

                info!("Submitting {} files to {} workers", discovery.len(), workers);

                let job = Arc::new(job);
                let (tx, rx) = mpsc::channel();
                for path in discovery.files.iter().cloned() {
                    let job = Arc::clone(&job);
                    let tx = tx.clone();
                    pool.spawn(move || {
                        let outcome = run_job(&*job, &path, OperatingMode::Batch);
                        // The receiver only goes away if the driver itself is unwinding
                        let _ = tx.send(outcome);
                    });
                }
                drop(tx);

                // Completion order, not submission order
                for outcome in rx {
                    on_outcome(&outcome);
                    summary.record(outcome);
                }
            }
        }

        info!(
            "Run finished: {} fixed, {} failed",
            summary.fixed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}

/// Threads each encoder may use so that concurrent encoders share the machine
pub fn encoder_threads_for(mode: OperatingMode, workers: usize) -> usize {
    let cpus = num_cpus::get();
    match mode {
        OperatingMode::Test => cpus,
        OperatingMode::Batch => (cpus / workers.max(1)).max(1),
    }
}

/// Run one job, turning both errors and panics into a [`FixFailure`].
fn run_job<J>(job: &J, path: &Path, mode: OperatingMode) -> FixOutcome
where
    J: Fn(&Path, OperatingMode) -> Result<FixReport>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| job(path, mode)))
        .unwrap_or_else(|payload| Err(FixerError::generic(format!("worker panicked: {}", panic_message(&*payload)))));

    result.map_err(|error| {
        error!("Failed to correct {:?}: {}", path, error);
        FixFailure::new(path, error)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
