use crate::ManifestError;
use crate::Result;
use serde::de;
use serde::de::MapAccess;
use serde::de::Visitor;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Per-file exemption directives.
///
/// The wire shape is the camelCase object the WPT runner config uses:
/// `{comment?, skipAllTests?, expectedFailures?}`. An empty record (`{}`) is
/// valid and means the file runs normally; keeping the entry around documents
/// that the file was looked at.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Exemption {
  /// Free-text rationale. Informational only; never affects behavior.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,

  /// When true, no subtest in the file is executed at all. Terminal for the
  /// file: any `expectedFailures` on the same record are unreachable.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip_all_tests: Option<bool>,

  /// Subtest names (by declared name, or `""` for a file with a single
  /// unnamed subtest) that currently fail and must not count as regressions.
  /// Entries here should be removed once the underlying bug is fixed.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub expected_failures: Vec<String>,
}

impl Exemption {
  pub fn skips_file(&self) -> bool {
    self.skip_all_tests.unwrap_or(false)
  }

  /// Exact-name membership in `expectedFailures`. Callers that need the full
  /// contract (skip shadowing the list) should go through
  /// [`Exemptions::is_expected_failure`].
  pub fn lists_failure(&self, subtest: &str) -> bool {
    self.expected_failures.iter().any(|name| name == subtest)
  }
}

/// The exemption table: test file name to [`Exemption`], unique keys,
/// immutable after load.
///
/// Lookups are exact string matches on both the file name and the subtest
/// name. There is deliberately no glob or regex matching across entries.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Exemptions {
  records: BTreeMap<String, Exemption>,
}

impl Exemptions {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn from_path(path: &Path) -> Result<Self> {
    let raw = fs::read_to_string(path)?;
    Self::from_str(&raw).map_err(|err| match err {
      ManifestError::Manifest(msg) => {
        ManifestError::Manifest(format!("{}: {msg}", path.display()))
      }
      other => other,
    })
  }

  /// Parse a manifest, trying TOML first and falling back to JSON.
  ///
  /// Shape violations are fatal: unknown record fields, wrong value types,
  /// and duplicate file keys all fail the load rather than being ignored.
  pub fn from_str(raw: &str) -> Result<Self> {
    match toml::from_str::<Exemptions>(raw) {
      Ok(exemptions) => Ok(exemptions),
      Err(toml_err) => serde_json::from_str::<Exemptions>(raw).map_err(|json_err| {
        ManifestError::Manifest(format!(
          "failed to parse manifest as TOML ({toml_err}) or JSON ({json_err})"
        ))
      }),
    }
  }

  /// Build a table from `(file, record)` pairs, rejecting duplicate files.
  pub fn from_entries<I>(entries: I) -> Result<Self>
  where
    I: IntoIterator<Item = (String, Exemption)>,
  {
    let mut records = BTreeMap::new();
    for (file, record) in entries {
      if records.insert(file.clone(), record).is_some() {
        return Err(ManifestError::Manifest(format!(
          "duplicate entry for test file '{file}'"
        )));
      }
    }

    Ok(Self { records })
  }

  /// The record for `file`, or `None`: run all subtests normally, any
  /// failure is a regression.
  pub fn lookup(&self, file: &str) -> Option<&Exemption> {
    self.records.get(file)
  }

  /// True iff a record exists for `file` and `skipAllTests` is true.
  pub fn is_file_skipped(&self, file: &str) -> bool {
    self.lookup(file).is_some_and(Exemption::skips_file)
  }

  /// True iff a record exists for `file`, the file is not skipped wholesale,
  /// and `subtest` appears in its `expectedFailures`.
  pub fn is_expected_failure(&self, file: &str, subtest: &str) -> bool {
    self
      .lookup(file)
      .is_some_and(|record| !record.skips_file() && record.lists_failure(subtest))
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Records in file-name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &Exemption)> {
    self.records.iter().map(|(file, record)| (file.as_str(), record))
  }

  pub fn to_json_pretty(&self) -> Result<String> {
    serde_json::to_string_pretty(self)
      .map_err(|err| ManifestError::Output(format!("serialize manifest: {err}")))
  }
}

impl<'de> Deserialize<'de> for Exemptions {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    struct TableVisitor;

    impl<'de> Visitor<'de> for TableVisitor {
      type Value = Exemptions;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map from test file name to exemption record")
      }

      fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
      where
        A: MapAccess<'de>,
      {
        let mut records = BTreeMap::new();
        while let Some((file, record)) = access.next_entry::<String, Exemption>()? {
          if records.insert(file.clone(), record).is_some() {
            return Err(de::Error::custom(format!(
              "duplicate entry for test file '{file}'"
            )));
          }
        }

        Ok(Exemptions { records })
      }
    }

    deserializer.deserialize_map(TableVisitor)
  }
}
