use crate::ManifestError;
use crate::Result;
use serde::Serialize;
use std::fs;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

/// Serialize `value` as pretty JSON.
///
/// Deterministic output requires that `value` itself is deterministic: the
/// report types in this crate keep result and finding lists in sorted file
/// order and use `BTreeMap` for any serialized tables.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
  serde_json::to_string_pretty(value)
    .map_err(|err| ManifestError::Output(format!("format JSON report: {err}")))
}

/// Write a pretty JSON report to `path`, creating parent directories as
/// needed.
pub fn write_json_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)
      .map_err(|err| ManifestError::Output(format!("create {}: {err}", parent.display())))?;
  }

  let file = fs::File::create(path)
    .map_err(|err| ManifestError::Output(format!("create {}: {err}", path.display())))?;
  let mut writer = BufWriter::new(file);
  write_json_report_to_writer(&mut writer, report)
    .map_err(|err| ManifestError::Output(format!("write {}: {err}", path.display())))?;
  writer.flush().ok();
  Ok(())
}

pub fn write_json_report_to_writer<W: Write, T: Serialize>(
  writer: &mut W,
  report: &T,
) -> Result<()> {
  serde_json::to_writer_pretty(&mut *writer, report)
    .map_err(|err| ManifestError::Output(format!("write JSON report: {err}")))?;
  writeln!(&mut *writer).ok();
  Ok(())
}

pub fn write_json_report_to_stdout<T: Serialize>(report: &T) -> Result<()> {
  let stdout = io::stdout();
  let mut handle = stdout.lock();
  write_json_report_to_writer(&mut handle, report)
}
