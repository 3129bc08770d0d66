//! Binary entrypoint: read a jsonl event log (file or stdin), print the feeder
//! summary to stdout.
//!
//! Diagnostics go to stderr. The exit status is 0 whenever the log could be
//! analysed, even if hopper errors were found.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{ArgAction, Parser, ValueEnum};
use hopper_check::alert::{self, LogNotifier};
use hopper_check::types::{AddressMode, Window};
use hopper_check::{report, Config, JsonlReader, Strategy};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
  Table,
  Json,
}

#[derive(Parser)]
#[command(name = "hopper-check", about = "Check an event log for feeder and hopper errors")]
struct Cli {
  /// The event log (jsonl) to analyse; `-` or absent reads stdin.
  file: Option<PathBuf>,

  /// Only analyse records from the last N minutes.
  #[arg(short, long)]
  minutes: Option<u64>,

  /// Matching strategy: paired (offline report) or streaming (level-based).
  #[arg(short, long)]
  strategy: Option<Strategy>,

  #[arg(long, value_enum, default_value_t = Format::Table)]
  format: Format,

  /// Addresses are bare `feeder_N` / `hopper` with no controller prefix.
  #[arg(long)]
  flat_addresses: bool,

  /// Raise an alert for controllers at or over the error threshold.
  #[arg(short = 'e', long = "alert")]
  alert: bool,

  /// Number of errors that triggers an alert.
  #[arg(long)]
  max_errors: Option<u64>,

  /// TOML file with default settings.
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// More diagnostics on stderr (-v, -vv). RUST_LOG takes precedence.
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
  if let Some(strategy) = cli.strategy {
    config.strategy = strategy;
  }
  if cli.flat_addresses {
    config.address_mode = AddressMode::Flat;
  }
  if let Some(max_errors) = cli.max_errors {
    config.max_errors = max_errors;
  }
  if cli.minutes.is_some() {
    config.lookback_minutes = cli.minutes;
  }

  let cutoff = config
    .lookback_minutes
    .map(|m| lookback_cutoff(Utc::now(), m))
    .transpose()?;

  match cli.file.as_deref() {
    Some(path) if path.as_os_str() != "-" => {
      let reader = JsonlReader::open(path)?;
      run(reader, cutoff, &config, &cli)
    }
    _ => run(JsonlReader::new(io::stdin().lock()), cutoff, &config, &cli),
  }
}

/// Epoch milliseconds `minutes` before `now`.
fn lookback_cutoff(now: DateTime<Utc>, minutes: u64) -> anyhow::Result<i64> {
  let delta = i64::try_from(minutes)
    .ok()
    .and_then(TimeDelta::try_minutes)
    .with_context(|| format!("lookback of {minutes} minutes is out of range"))?;
  let cutoff = now
    .checked_sub_signed(delta)
    .with_context(|| format!("lookback of {minutes} minutes reaches before the earliest date"))?;
  Ok(cutoff.timestamp_millis())
}

fn run<R: BufRead>(
  reader: JsonlReader<R>,
  cutoff: Option<i64>,
  config: &Config,
  cli: &Cli,
) -> anyhow::Result<()> {
  let reader = match cutoff {
    Some(c) => reader.since(c),
    None => reader,
  };
  tracing::info!(strategy = %config.strategy, cutoff, "analysing event log");
  let mut result = hopper_check::check(reader, config).context("reading event log")?;

  // With a lookback the report covers the requested window, not just the events.
  if let Some(c) = cutoff {
    result.window = Some(Window {
      start: report::timestamp(c),
      end: Utc::now(),
    });
  }

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  if config.strategy == Strategy::Streaming && cli.format == Format::Table {
    for outcome in result.outcomes.iter().filter(|o| o.kind.is_error()) {
      writeln!(out, "{}", report::describe(outcome))?;
    }
    writeln!(
      out,
      "{}",
      report::totals_line(result.stats.feed_commands, &result.outcomes)
    )?;
  }

  match cli.format {
    Format::Table => writeln!(
      out,
      "{}",
      report::render_table(&result.summaries, result.window.as_ref())
    )?,
    Format::Json => report::write_json_lines(&mut out, &result.summaries)?,
  }

  if cli.alert {
    let mut notifier = LogNotifier::default();
    let sent = alert::dispatch(
      &result.summaries,
      config.max_errors,
      result.window.as_ref(),
      &mut notifier,
    )?;
    tracing::info!(sent = notifier.sent(), "alerting done");
    for a in &sent {
      writeln!(
        out,
        "- alert {} raised for {}",
        a.alert_id,
        a.controller.as_deref().unwrap_or("-")
      )?;
    }
  }

  if result.stats.malformed > 0 {
    tracing::warn!(skipped = result.stats.malformed, "some hopper records were skipped");
  }

  out.flush()?;
  Ok(())
}

fn init_tracing(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
    .init();
}
