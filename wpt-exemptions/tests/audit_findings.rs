use wpt_exemptions::evaluate;
use wpt_exemptions::Exemptions;
use wpt_exemptions::FailOn;
use wpt_exemptions::FindingKind;
use wpt_exemptions::RunLog;
use wpt_exemptions::SuiteReport;

fn manifest(raw: &str) -> Exemptions {
  Exemptions::from_str(raw).expect("manifest parsed")
}

fn run_log(raw: &str) -> RunLog {
  RunLog::from_str(raw).expect("run log parsed")
}

#[test]
fn stale_expected_failure_carries_the_record_comment() {
  let exemptions = manifest(
    r#"{"a.js": {
      "comment": "tracked in the upstream rewrite",
      "expectedFailures": ["t1"]
    }}"#,
  );
  let log = run_log(r#"{"files": {"a.js": [{"name": "t1", "status": "pass"}]}}"#);

  let report = evaluate(&exemptions, &log);
  assert_eq!(report.findings.len(), 1);

  let finding = &report.findings[0];
  assert_eq!(finding.kind, FindingKind::StaleExpectedFailure);
  assert_eq!(finding.file, "a.js");
  assert_eq!(finding.subtest.as_deref(), Some("t1"));
  assert_eq!(
    finding.comment.as_deref(),
    Some("tracked in the upstream rewrite")
  );
}

#[test]
fn dangling_name_is_reported_but_never_fails_the_suite() {
  let exemptions = manifest(r#"{"a.js": {"expectedFailures": ["renamed-away"]}}"#);
  let log = run_log(r#"{"files": {"a.js": [{"name": "t1", "status": "pass"}]}}"#);

  let report = evaluate(&exemptions, &log);
  assert_eq!(report.findings.len(), 1);
  assert_eq!(report.findings[0].kind, FindingKind::DanglingExpectedFailure);
  assert_eq!(report.findings[0].subtest.as_deref(), Some("renamed-away"));

  assert!(!report.suite_failed(FailOn::All));
  assert!(!report.suite_failed(FailOn::New));
}

#[test]
fn clean_run_of_a_skipped_file_is_a_stale_skip() {
  let exemptions = manifest(
    r#"{"a.js": {"comment": "was crashing the runner", "skipAllTests": true}}"#,
  );
  let log = run_log(
    r#"{"files": {"a.js": [
      {"name": "t1", "status": "pass"},
      {"name": "t2", "status": "pass"}
    ]}}"#,
  );

  let report = evaluate(&exemptions, &log);
  assert_eq!(report.findings.len(), 1);
  assert_eq!(report.findings[0].kind, FindingKind::StaleSkip);
  assert_eq!(report.findings[0].comment.as_deref(), Some("was crashing the runner"));
}

#[test]
fn skipped_file_with_a_failure_is_not_stale() {
  let exemptions = manifest(r#"{"a.js": {"skipAllTests": true}}"#);
  let log = run_log(
    r#"{"files": {"a.js": [
      {"name": "t1", "status": "pass"},
      {"name": "t2", "status": "fail"}
    ]}}"#,
  );

  let report = evaluate(&exemptions, &log);
  assert!(report.findings.is_empty());
}

#[test]
fn skipped_file_suppresses_dangling_detection() {
  let exemptions = manifest(
    r#"{"a.js": {"skipAllTests": true, "expectedFailures": ["unreachable"]}}"#,
  );
  let log = run_log(r#"{"files": {"a.js": [{"name": "t1", "status": "fail"}]}}"#);

  let report = evaluate(&exemptions, &log);
  assert!(report.findings.is_empty());
}

#[test]
fn manifest_entries_for_files_that_never_ran_are_not_judged() {
  let exemptions = manifest(r#"{"absent.js": {"expectedFailures": ["t1"]}}"#);
  let log = run_log(r#"{"files": {"other.js": [{"name": "t1", "status": "pass"}]}}"#);

  let report = evaluate(&exemptions, &log);
  assert!(report.findings.is_empty());
}

#[test]
fn evaluation_is_deterministic_and_grouped_by_file() {
  let exemptions = manifest(
    r#"{
      "a.js": {"expectedFailures": ["gone"]},
      "z.js": {"expectedFailures": ["t1"]}
    }"#,
  );
  let log = run_log(
    r#"{"files": {
      "z.js": [{"name": "t1", "status": "pass"}],
      "a.js": [{"name": "t1", "status": "pass"}]
    }}"#,
  );

  let first = evaluate(&exemptions, &log);
  let second = evaluate(&exemptions, &log);
  assert_eq!(first, second);

  let files: Vec<_> = first.results.iter().map(|r| r.file.as_str()).collect();
  assert_eq!(files, ["a.js", "z.js"]);
  let finding_files: Vec<_> = first.findings.iter().map(|f| f.file.as_str()).collect();
  assert_eq!(finding_files, ["a.js", "z.js"]);
}

#[test]
fn report_round_trips_through_json() {
  let exemptions = manifest(r#"{"a.js": {"expectedFailures": ["t1", "gone"]}}"#);
  let log = run_log(
    r#"{"files": {"a.js": [
      {"name": "t1", "status": "fail"},
      {"name": "t2", "status": "pass"}
    ]}}"#,
  );

  let report = evaluate(&exemptions, &log);
  let json = wpt_exemptions::report::to_json_pretty(&report).expect("serialize");
  let reloaded: SuiteReport = serde_json::from_str(&json).expect("reload");
  assert_eq!(report, reloaded);
}
