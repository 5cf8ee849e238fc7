use clap::Parser;
use clap::Subcommand;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;
use wpt_exemptions::evaluate;
use wpt_exemptions::report;
use wpt_exemptions::Exemptions;
use wpt_exemptions::FailOn;
use wpt_exemptions::IdFilter;
use wpt_exemptions::RunLog;

#[derive(Parser)]
#[command(author, version, about = "Web-platform-test exemption manifest utilities", long_about = None)]
struct Cli {
  /// Enable tracing output from the library
  #[arg(long, global = true)]
  trace: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Load a manifest, failing on any shape error
  Validate {
    /// Exemption manifest (TOML or JSON)
    manifest: PathBuf,

    /// Glob or regex restricting which entries are listed
    #[arg(long)]
    filter: Option<String>,

    /// List every entry after validation
    #[arg(long)]
    list: bool,
  },

  /// Evaluate a recorded test run against a manifest
  Audit {
    /// Exemption manifest (TOML or JSON)
    manifest: PathBuf,

    /// JSON run log produced by the test runner
    #[arg(long)]
    results: PathBuf,

    /// Emit the full JSON report instead of the human summary
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to a file
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Glob or regex restricting which files are audited
    #[arg(long)]
    filter: Option<String>,

    /// Exit-code policy for failing subtests
    #[arg(long, value_enum, default_value_t = FailOn::New)]
    fail_on: FailOn,

    /// Treat stale or dangling exemptions as errors
    #[arg(long)]
    strict_findings: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.trace);

  match cli.command {
    Commands::Validate {
      manifest,
      filter,
      list,
    } => run_validate(&manifest, filter.as_deref(), list),
    Commands::Audit {
      manifest,
      results,
      json,
      out,
      filter,
      fail_on,
      strict_findings,
    } => run_audit(AuditArgs {
      manifest,
      results,
      json,
      out,
      filter,
      fail_on,
      strict_findings,
    }),
  }
}

struct AuditArgs {
  manifest: PathBuf,
  results: PathBuf,
  json: bool,
  out: Option<PathBuf>,
  filter: Option<String>,
  fail_on: FailOn,
  strict_findings: bool,
}

fn run_validate(manifest: &Path, filter: Option<&str>, list: bool) -> ExitCode {
  let filter = match IdFilter::parse(filter) {
    Ok(filter) => filter,
    Err(err) => return print_error(err),
  };

  let exemptions = match Exemptions::from_path(manifest) {
    Ok(exemptions) => exemptions,
    Err(err) => return print_error(err),
  };

  let mut skipped = 0usize;
  let mut expected = 0usize;
  for (file, record) in exemptions.iter().filter(|(file, _)| filter.matches(file)) {
    if record.skips_file() {
      skipped += 1;
    }
    expected += record.expected_failures.len();

    if list {
      let directive = if record.skips_file() {
        "skip all tests".to_string()
      } else if record.expected_failures.is_empty() {
        "runs normally".to_string()
      } else {
        format!("{} expected failure(s)", record.expected_failures.len())
      };
      match &record.comment {
        Some(comment) => println!("{file}: {directive} ({comment})"),
        None => println!("{file}: {directive}"),
      }
    }
  }

  println!(
    "Validated {} record(s): {} skipped file(s), {} expected failure(s)",
    exemptions.len(),
    skipped,
    expected
  );
  ExitCode::SUCCESS
}

fn run_audit(args: AuditArgs) -> ExitCode {
  let filter = match IdFilter::parse(args.filter.as_deref()) {
    Ok(filter) => filter,
    Err(err) => return print_error(err),
  };

  let exemptions = match Exemptions::from_path(&args.manifest) {
    Ok(exemptions) => exemptions,
    Err(err) => return print_error(err),
  };

  let mut log = match RunLog::from_path(&args.results) {
    Ok(log) => log,
    Err(err) => return print_error(err),
  };
  log.retain_files(|file| filter.matches(file));

  let report = evaluate(&exemptions, &log);

  if let Some(path) = &args.out {
    if let Err(err) = report::write_json_report(path, &report) {
      return print_error(err);
    }
  }

  if args.json {
    if let Err(err) = report::write_json_report_to_stdout(&report) {
      return print_error(err);
    }
  } else {
    let outcomes = &report.summary.outcomes;
    println!(
      "Audited {} recorded subtest(s) across {} file(s)",
      report.summary.total,
      log.files.len()
    );
    println!(
      "Passed: {}, Failed: {}, Expected failures: {}, Stale passes: {}, Skipped: {}",
      outcomes.passed,
      outcomes.failed,
      outcomes.expected_failures,
      outcomes.stale_passes,
      outcomes.skipped
    );
    for finding in &report.findings {
      eprintln!("warning: {finding}");
    }
  }

  let mut failed = report.suite_failed(args.fail_on);
  if args.strict_findings && !report.findings.is_empty() {
    failed = true;
  }

  if failed {
    ExitCode::from(1)
  } else {
    ExitCode::SUCCESS
  }
}

fn print_error(err: impl std::fmt::Display) -> ExitCode {
  eprintln!("error: {err}");
  ExitCode::from(1)
}

fn init_tracing(enable: bool) {
  if !enable {
    return;
  }

  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr);
  if let Err(err) = builder.try_init() {
    eprintln!("failed to install tracing subscriber: {err}");
  }
}
