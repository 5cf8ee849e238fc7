use crate::ManifestError;
use crate::Result;
use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use regex::Regex;

/// Restricts which test-file identifiers an audit or listing reports on.
///
/// The pattern is tried as a glob first, then as a regex. This only narrows
/// tool output; exemption lookup itself is always an exact string match.
#[derive(Debug, Clone)]
pub enum IdFilter {
  All,
  Glob(GlobSet),
  Regex(Regex),
}

impl IdFilter {
  pub fn parse(pattern: Option<&str>) -> Result<Self> {
    match pattern {
      None => Ok(IdFilter::All),
      Some(raw) => {
        if let Ok(glob) = Glob::new(raw) {
          let mut builder = GlobSetBuilder::new();
          builder.add(glob);
          let set = builder
            .build()
            .map_err(|err| ManifestError::InvalidFilter(err.to_string()))?;
          return Ok(IdFilter::Glob(set));
        }

        let regex =
          Regex::new(raw).map_err(|err| ManifestError::InvalidFilter(err.to_string()))?;
        Ok(IdFilter::Regex(regex))
      }
    }
  }

  pub fn matches(&self, file: &str) -> bool {
    match self {
      IdFilter::All => true,
      IdFilter::Glob(set) => set.is_match(file),
      IdFilter::Regex(re) => re.is_match(file),
    }
  }
}
