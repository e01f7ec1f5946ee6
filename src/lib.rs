//! # bgr-fixer
//!
//! Repair videos whose red and blue channels were exchanged by an earlier,
//! faulty encode.
//!
//! Every frame is decoded, has its channel order reversed, and is re-encoded
//! with the same geometry and frame rate. A single file is corrected into a
//! `<name>_fix.<ext>` sibling; a directory tree is corrected in place, one
//! file per worker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgr_fixer::{discovery::discover, Config, Driver};
//!
//! # fn main() -> bgr_fixer::Result<()> {
//! let config = Config::default();
//! let found = discover("videos/", &config.naming);
//!
//! let driver = Driver::new(config);
//! let summary = driver.run(&found, |outcome| match outcome {
//!     Ok(report) => println!("{}", report.message()),
//!     Err(failure) => eprintln!("{}", failure),
//! })?;
//!
//! println!("{} fixed, {} failed", summary.fixed.len(), summary.failed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`discovery`] - Input resolution and operating mode
//! - [`video`] - Frame buffers, decoding, encoding, and per-file correction
//! - [`driver`] - Worker pool and outcome collection
//! - [`config`] - Configuration management

pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod video;

pub use crate::{
    config::Config,
    discovery::{Discovery, OperatingMode},
    driver::{Driver, FixOutcome, RunSummary},
    error::{FixFailure, FixerError, Result},
    video::{fix_video, FixReport, Frame},
};
