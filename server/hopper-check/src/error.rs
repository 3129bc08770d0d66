//! Structured error types for the hopper checker.
//!
//! Hardware problems found in the log are never errors; they are reported as
//! [`Outcome`](crate::types::Outcome) values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("line {line}: {reason}")]
  MalformedRecord { line: usize, reason: String },

  #[error("cannot open {path}: {source}")]
  SourceUnavailable {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("read: {0}")]
  Read(#[from] std::io::Error),

  #[error("parse: {0}")]
  Parse(String),

  #[error("config: {0}")]
  Config(#[from] config::ConfigError),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl CheckError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
    Self::MalformedRecord {
      line,
      reason: reason.into(),
    }
  }

  pub fn parse(msg: impl Into<String>) -> Self {
    Self::Parse(msg.into())
  }

  /// True for errors that only affect a single record.
  pub fn is_local(&self) -> bool {
    matches!(self, Self::Validation { .. } | Self::MalformedRecord { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_errors_are_local() {
    assert!(CheckError::validation("time", "missing").is_local());
    assert!(CheckError::malformed(3, "bad json").is_local());
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err = CheckError::SourceUnavailable {
      path: "events.jsonl".into(),
      source: io,
    };
    assert!(!err.is_local());
    assert!(err.to_string().contains("events.jsonl"));
  }
}
