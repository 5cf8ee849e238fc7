use crate::manifest::Exemption;
use crate::manifest::Exemptions;
use crate::outcome::classify;
use crate::outcome::SubtestStatus;
use crate::outcome::Verdict;
use crate::ManifestError;
use crate::Result;
use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;
use tracing::warn;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// One recorded subtest result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubtestRecord {
  /// Declared subtest name; `""` for a file with a single unnamed subtest.
  pub name: String,
  pub status: SubtestStatus,
}

impl SubtestRecord {
  pub fn new(name: impl Into<String>, status: SubtestStatus) -> Self {
    Self {
      name: name.into(),
      status,
    }
  }
}

/// A recorded test run: for each executed file, its subtest results in
/// execution order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunLog {
  #[serde(default)]
  pub files: BTreeMap<String, Vec<SubtestRecord>>,
}

impl RunLog {
  pub fn from_path(path: &Path) -> Result<Self> {
    let raw = fs::read_to_string(path)?;
    Self::from_str(&raw).map_err(|err| match err {
      ManifestError::RunLog(msg) => ManifestError::RunLog(format!("{}: {msg}", path.display())),
      other => other,
    })
  }

  pub fn from_str(raw: &str) -> Result<Self> {
    serde_json::from_str(raw).map_err(|err| ManifestError::RunLog(err.to_string()))
  }

  /// Keep only files whose name satisfies `keep`.
  pub fn retain_files(&mut self, mut keep: impl FnMut(&str) -> bool) {
    self.files.retain(|file, _| keep(file));
  }

  pub fn total_subtests(&self) -> usize {
    self.files.values().map(Vec::len).sum()
  }
}

/// Maintenance anomaly surfaced by an audit. Never fatal on its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
  /// An `expectedFailures` entry whose subtest now passes.
  StaleExpectedFailure,
  /// A `skipAllTests` file whose recorded subtests all pass.
  StaleSkip,
  /// An `expectedFailures` entry naming a subtest the file never emitted.
  DanglingExpectedFailure,
}

impl FindingKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      FindingKind::StaleExpectedFailure => "stale expected failure",
      FindingKind::StaleSkip => "stale skip",
      FindingKind::DanglingExpectedFailure => "dangling expected failure",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
  pub kind: FindingKind,
  pub file: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subtest: Option<String>,
  pub detail: String,
  /// The record's own rationale, carried through for cleanup context.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
}

impl fmt::Display for Finding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.subtest {
      Some(subtest) if subtest.is_empty() => {
        write!(f, "{}: {} (unnamed subtest): {}", self.kind.as_str(), self.file, self.detail)
      }
      Some(subtest) => write!(
        f,
        "{}: {} '{}': {}",
        self.kind.as_str(),
        self.file,
        subtest,
        self.detail
      ),
      None => write!(f, "{}: {}: {}", self.kind.as_str(), self.file, self.detail),
    }
  }
}

/// Exit-code policy for a run evaluated against a manifest.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailOn {
  /// Non-zero on any failing subtest, even ones covered by the manifest.
  All,
  /// Non-zero only for failures not covered by the manifest (default).
  #[default]
  New,
  /// Always zero.
  None,
}

impl FailOn {
  pub fn should_fail(&self, uncovered_failures: usize, total_failures: usize) -> bool {
    match self {
      FailOn::All => total_failures > 0,
      FailOn::New => uncovered_failures > 0,
      FailOn::None => false,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeCounts {
  pub passed: usize,
  pub failed: usize,
  pub expected_failures: usize,
  pub stale_passes: usize,
  pub skipped: usize,
}

impl OutcomeCounts {
  fn record(&mut self, verdict: Verdict) {
    match verdict {
      Verdict::Passed => self.passed += 1,
      Verdict::Failed => self.failed += 1,
      Verdict::ExpectedFailure => self.expected_failures += 1,
      Verdict::StalePass => self.stale_passes += 1,
      Verdict::Skipped => self.skipped += 1,
    }
  }

  /// Results that produce a pass/fail signal: everything except skips.
  pub fn signals(&self) -> usize {
    self.passed + self.failed + self.expected_failures + self.stale_passes
  }

  /// Observed failures among signalling results, covered or not.
  pub fn total_failures(&self) -> usize {
    self.failed + self.expected_failures
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
  /// Every recorded subtest, including those in skipped files.
  pub total: usize,
  pub outcomes: OutcomeCounts,
  pub findings: usize,
}

impl Summary {
  pub fn suite_failed(&self, fail_on: FailOn) -> bool {
    fail_on.should_fail(self.outcomes.failed, self.outcomes.total_failures())
  }
}

/// One evaluated subtest in a report, in file order then execution order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubtestVerdict {
  pub file: String,
  pub subtest: String,
  pub status: SubtestStatus,
  pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuiteReport {
  pub schema_version: u32,
  pub summary: Summary,
  pub results: Vec<SubtestVerdict>,
  pub findings: Vec<Finding>,
}

impl SuiteReport {
  pub fn suite_failed(&self, fail_on: FailOn) -> bool {
    self.summary.suite_failed(fail_on)
  }
}

/// Evaluate a recorded run against the exemption table.
///
/// Produces a verdict per recorded subtest plus the maintenance findings:
/// stale expected failures, stale skips, and dangling expected-failure
/// names. Output ordering is deterministic: files sorted by name, subtests
/// in recorded order, findings grouped per file.
pub fn evaluate(exemptions: &Exemptions, log: &RunLog) -> SuiteReport {
  debug!(
    files = log.files.len(),
    subtests = log.total_subtests(),
    "evaluating run log"
  );

  let mut counts = OutcomeCounts::default();
  let mut results = Vec::with_capacity(log.total_subtests());
  let mut findings = Vec::new();

  for (file, subtests) in &log.files {
    let record = exemptions.lookup(file);

    for subtest in subtests {
      let verdict = classify(exemptions, file, &subtest.name, subtest.status);
      counts.record(verdict);

      if verdict.is_finding() {
        warn!(file = %file, subtest = %subtest.name, "expected failure now passes");
        findings.push(Finding {
          kind: FindingKind::StaleExpectedFailure,
          file: file.clone(),
          subtest: Some(subtest.name.clone()),
          detail: "listed as an expected failure but passed".to_string(),
          comment: record.and_then(|r| r.comment.clone()),
        });
      }

      results.push(SubtestVerdict {
        file: file.clone(),
        subtest: subtest.name.clone(),
        status: subtest.status,
        verdict,
      });
    }

    if let Some(record) = record {
      findings.extend(audit_record(file, record, subtests));
    }
  }

  let summary = Summary {
    total: log.total_subtests(),
    outcomes: counts,
    findings: findings.len(),
  };

  SuiteReport {
    schema_version: REPORT_SCHEMA_VERSION,
    summary,
    results,
    findings,
  }
}

/// Record-level anomalies that need the whole file's results to judge.
fn audit_record(file: &str, record: &Exemption, subtests: &[SubtestRecord]) -> Vec<Finding> {
  let mut findings = Vec::new();

  if record.skips_file() {
    // The file is configured to be skipped, so a recorded clean run means
    // the skip itself has gone stale. Judged only when results exist, e.g.
    // from a run captured with exemptions disabled.
    if !subtests.is_empty() && subtests.iter().all(|s| !s.status.is_fail()) {
      warn!(file = %file, "skipped file runs cleanly");
      findings.push(Finding {
        kind: FindingKind::StaleSkip,
        file: file.to_string(),
        subtest: None,
        detail: format!("all {} recorded subtest(s) pass", subtests.len()),
        comment: record.comment.clone(),
      });
    }

    // Expected failures under skipAllTests are unreachable; dangling
    // detection would be noise here.
    return findings;
  }

  for name in &record.expected_failures {
    if !subtests.iter().any(|s| s.name == *name) {
      warn!(file = %file, subtest = %name, "expected failure never observed");
      findings.push(Finding {
        kind: FindingKind::DanglingExpectedFailure,
        file: file.to_string(),
        subtest: Some(name.clone()),
        detail: "never emitted by the file's recorded run".to_string(),
        comment: record.comment.clone(),
      });
    }
  }

  findings
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fail_on_policies() {
    assert!(FailOn::All.should_fail(0, 3));
    assert!(!FailOn::All.should_fail(0, 0));
    assert!(FailOn::New.should_fail(1, 3));
    assert!(!FailOn::New.should_fail(0, 3));
    assert!(!FailOn::None.should_fail(5, 5));
  }

  #[test]
  fn counts_record_every_verdict() {
    let mut counts = OutcomeCounts::default();
    counts.record(Verdict::Passed);
    counts.record(Verdict::Failed);
    counts.record(Verdict::ExpectedFailure);
    counts.record(Verdict::StalePass);
    counts.record(Verdict::Skipped);

    assert_eq!(counts.signals(), 4);
    assert_eq!(counts.total_failures(), 2);
    assert_eq!(counts.skipped, 1);
  }

  #[test]
  fn run_log_parses_and_filters() {
    let raw = r#"{
      "files": {
        "a.js": [{"name": "t1", "status": "pass"}],
        "b.js": [{"name": "", "status": "fail"}]
      }
    }"#;

    let mut log = RunLog::from_str(raw).expect("run log");
    assert_eq!(log.total_subtests(), 2);

    log.retain_files(|file| file == "b.js");
    assert_eq!(log.total_subtests(), 1);
    assert!(log.files.contains_key("b.js"));
  }

  #[test]
  fn run_log_can_be_built_programmatically() {
    let mut log = RunLog::default();
    log.files.insert(
      "a.js".to_string(),
      vec![SubtestRecord::new("t1", SubtestStatus::Pass)],
    );

    assert_eq!(log.total_subtests(), 1);
  }

  #[test]
  fn run_log_rejects_malformed_status() {
    let raw = r#"{"files": {"a.js": [{"name": "t1", "status": "maybe"}]}}"#;
    assert!(RunLog::from_str(raw).is_err());
  }

  #[test]
  fn finding_display_names_the_unnamed_subtest() {
    let finding = Finding {
      kind: FindingKind::StaleExpectedFailure,
      file: "b.js".to_string(),
      subtest: Some(String::new()),
      detail: "listed as an expected failure but passed".to_string(),
      comment: None,
    };

    let rendered = finding.to_string();
    assert!(rendered.contains("unnamed subtest"));
    assert!(rendered.contains("b.js"));
  }
}
