//! Skip and expected-failure manifests for web-platform-test runs.
//!
//! A manifest maps test file names to exemption records: either the whole
//! file is skipped, or individual subtests are listed as known failures.
//! The table is loaded and validated once, before any test executes, and is
//! read-only afterwards, so parallel runner workers can consult it without
//! synchronization.

use std::io;
use thiserror::Error;

pub mod filter;
pub mod manifest;
pub mod outcome;
pub mod report;
pub mod suite;

pub type Result<T> = std::result::Result<T, ManifestError>;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error(transparent)]
  Io(#[from] io::Error),
  #[error("manifest error: {0}")]
  Manifest(String),
  #[error("run log error: {0}")]
  RunLog(String),
  #[error("invalid filter '{0}'")]
  InvalidFilter(String),
  #[error("output failed: {0}")]
  Output(String),
}

pub use filter::IdFilter;
pub use manifest::Exemption;
pub use manifest::Exemptions;
pub use outcome::classify;
pub use outcome::SubtestStatus;
pub use outcome::Verdict;
pub use suite::evaluate;
pub use suite::FailOn;
pub use suite::Finding;
pub use suite::FindingKind;
pub use suite::OutcomeCounts;
pub use suite::RunLog;
pub use suite::SubtestRecord;
pub use suite::SubtestVerdict;
pub use suite::SuiteReport;
pub use suite::Summary;
pub use suite::REPORT_SCHEMA_VERSION;
