//! Line-delimited JSON record source.
//!
//! Reads lazily, one line at a time. Blank lines are ignored and lines that do
//! not parse are logged and skipped; only I/O failures end the stream with an
//! error.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use tracing::warn;

use crate::error::CheckError;
use crate::types::{RawEvent, Record};

pub struct JsonlReader<R> {
  lines: Lines<R>,
  line_no: usize,
  skipped: u64,
  cutoff: Option<i64>,
}

impl JsonlReader<BufReader<File>> {
  /// Open a jsonl file. A missing or unreadable file is fatal.
  pub fn open(path: &Path) -> Result<Self, CheckError> {
    let file = File::open(path).map_err(|source| CheckError::SourceUnavailable {
      path: path.display().to_string(),
      source,
    })?;
    Ok(Self::new(BufReader::new(file)))
  }
}

impl<R: BufRead> JsonlReader<R> {
  pub fn new(reader: R) -> Self {
    Self {
      lines: reader.lines(),
      line_no: 0,
      skipped: 0,
      cutoff: None,
    }
  }

  /// Only yield records newer than `cutoff_ms`. Records without a time are
  /// passed through for the normalizer to judge.
  pub fn since(mut self, cutoff_ms: i64) -> Self {
    self.cutoff = Some(cutoff_ms);
    self
  }

  /// Number of lines that failed to parse so far.
  pub fn skipped(&self) -> u64 {
    self.skipped
  }
}

impl<R: BufRead> Iterator for JsonlReader<R> {
  type Item = Result<Record, CheckError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let line = match self.lines.next()? {
        Ok(l) => l,
        Err(e) => return Some(Err(CheckError::Read(e))),
      };
      self.line_no += 1;

      let trimmed = line.trim();
      if trimmed.is_empty() {
        continue;
      }

      let event: RawEvent = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
          self.skipped += 1;
          let err = CheckError::malformed(self.line_no, e.to_string());
          warn!(line = self.line_no, content = trimmed, "skipping record: {err}");
          continue;
        }
      };

      if let (Some(cutoff), Some(time)) = (self.cutoff, event.time) {
        if time <= cutoff {
          continue;
        }
      }

      return Some(Ok(Record {
        line: self.line_no,
        event,
      }));
    }
  }
}
