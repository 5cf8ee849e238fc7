use crate::manifest::Exemptions;
use serde::Deserialize;
use serde::Serialize;

/// Observed result of one subtest, as recorded by the runner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubtestStatus {
  Pass,
  Fail,
}

impl SubtestStatus {
  pub fn is_fail(&self) -> bool {
    matches!(self, SubtestStatus::Fail)
  }
}

/// What one observed subtest result means once the exemption table has been
/// consulted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  /// The file is skipped wholesale; the result contributes no pass/fail
  /// signal at all.
  Skipped,
  Passed,
  /// A known failure listed in the manifest; does not fail the suite.
  ExpectedFailure,
  /// Listed as an expected failure but observed passing: the exemption is
  /// stale. The suite still passes; the entry should be cleaned up.
  StalePass,
  /// An uncovered failure: a suite regression.
  Failed,
}

impl Verdict {
  pub fn fails_suite(&self) -> bool {
    matches!(self, Verdict::Failed)
  }

  /// Whether the result is reported at all. Skipped files produce no signal,
  /// which is distinct from an expected failure.
  pub fn produces_signal(&self) -> bool {
    !matches!(self, Verdict::Skipped)
  }

  /// Whether this verdict should surface as a maintenance finding.
  pub fn is_finding(&self) -> bool {
    matches!(self, Verdict::StalePass)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Verdict::Skipped => "skipped",
      Verdict::Passed => "passed",
      Verdict::ExpectedFailure => "expected_failure",
      Verdict::StalePass => "stale_pass",
      Verdict::Failed => "failed",
    }
  }
}

/// Classify one observed subtest result against the exemption table.
pub fn classify(
  exemptions: &Exemptions,
  file: &str,
  subtest: &str,
  status: SubtestStatus,
) -> Verdict {
  if exemptions.is_file_skipped(file) {
    return Verdict::Skipped;
  }

  if exemptions.is_expected_failure(file, subtest) {
    return match status {
      SubtestStatus::Fail => Verdict::ExpectedFailure,
      SubtestStatus::Pass => Verdict::StalePass,
    };
  }

  match status {
    SubtestStatus::Pass => Verdict::Passed,
    SubtestStatus::Fail => Verdict::Failed,
  }
}
