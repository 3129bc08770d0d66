//! Checker configuration with sane defaults.
//!
//! [`Config::load`] layers an optional TOML file over the built-in defaults.
//! Command-line flags are applied on top by the binary.

use serde::Deserialize;
use std::path::Path;

use crate::error::CheckError;
use crate::types::{AddressMode, Strategy};

const DEFAULT_CONFIG: &str = r#"
strategy     = "paired"
address_mode = "grouped"
max_errors   = 2
"#;

/// Tunable settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
  /// How commands are matched with hopper observations.
  #[serde(default)]
  pub strategy: Strategy,
  /// Address convention of the event log.
  #[serde(default)]
  pub address_mode: AddressMode,
  /// Error count at which a controller raises an alert.
  #[serde(default = "default_max_errors")]
  pub max_errors: u64,
  /// Only analyse records from the last N minutes.
  #[serde(default)]
  pub lookback_minutes: Option<u64>,
}

fn default_max_errors() -> u64 {
  2
}

impl Default for Config {
  fn default() -> Self {
    Self {
      strategy: Strategy::Paired,
      address_mode: AddressMode::Grouped,
      max_errors: default_max_errors(),
      lookback_minutes: None,
    }
  }
}

impl Config {
  /// Load the defaults, overlaid with `path` when given. A named file that
  /// does not exist is an error.
  pub fn load(path: Option<&Path>) -> Result<Self, CheckError> {
    let mut builder = config::Config::builder()
      .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }
    Ok(builder.build()?.try_deserialize()?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn defaults_load() {
    let cfg = Config::load(None).unwrap();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.max_errors, 2);
    assert_eq!(cfg.strategy, Strategy::Paired);
  }

  #[test]
  fn file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "strategy = \"streaming\"\nlookback_minutes = 90").unwrap();
    let cfg = Config::load(Some(file.path())).unwrap();
    assert_eq!(cfg.strategy, Strategy::Streaming);
    assert_eq!(cfg.lookback_minutes, Some(90));
    assert_eq!(cfg.address_mode, AddressMode::Grouped);
    assert_eq!(cfg.max_errors, 2);
  }

  #[test]
  fn missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, CheckError::Config(_)));
  }
}
