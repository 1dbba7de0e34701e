use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bar_studies::config::{self, AppConfig};
use bar_studies::engine::Engine;
use bar_studies::indicator::Calculator;
use bar_studies::indicator::imbalance::Imbalance;
use bar_studies::indicator::volume_spikes::VolumeSpikes;
use bar_studies::model::Bar;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("failed to read bars")]
    Input,
    #[display("failed to write results")]
    Output,
}

#[derive(Parser)]
#[command(
    name = "bar-studies",
    about = "Replay a bar series through a calculator and print one JSON result per bar"
)]
struct Cli {
    /// Path to the TOML configuration file; calculator defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-lines file with one bar per line
    #[arg(short, long)]
    bars: PathBuf,

    #[command(subcommand)]
    study: Study,
}

#[derive(Subcommand)]
enum Study {
    /// Imbalance / fair value gap rectangles
    Imbalance,
    /// Volume histogram with spike highlighting
    VolumeSpikes,
}

/// Bar as read from the input file; `index` defaults to the number of bars
/// read before it, so blank lines do not count.
#[derive(Debug, Deserialize)]
struct BarRecord {
    index: Option<usize>,
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl BarRecord {
    fn into_bar(self, position: usize) -> Bar {
        Bar {
            index: self.index.unwrap_or(position),
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

fn main() {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load(path).change_context(AppError::Config)?,
        None => AppConfig::default(),
    };

    init_tracing(&config);

    let bars = read_bars(&cli.bars)?;
    info!(bars = bars.len(), path = %cli.bars.display(), "bars loaded");

    match cli.study {
        Study::Imbalance => {
            let calculator = Imbalance::new(config.imbalance).change_context(AppError::Config)?;
            replay(calculator, bars)
        }
        Study::VolumeSpikes => {
            let calculator =
                VolumeSpikes::new(config.volume_spikes).change_context(AppError::Config)?;
            replay(calculator, bars)
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    // stdout carries results, so logs go to stderr
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn read_bars(path: &Path) -> Result<Vec<Bar>, Report<AppError>> {
    let file = File::open(path)
        .change_context(AppError::Input)
        .attach_with(|| format!("path: {}", path.display()))?;

    parse_bars(BufReader::new(file)).attach_with(|| format!("path: {}", path.display()))
}

/// Parse JSON-lines bars, skipping blank lines and rejecting indexes that do
/// not strictly increase.
fn parse_bars(reader: impl BufRead) -> Result<Vec<Bar>, Report<AppError>> {
    let mut bars = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.change_context(AppError::Input)?;
        if line.trim().is_empty() {
            continue;
        }
        let record: BarRecord = serde_json::from_str(&line)
            .change_context(AppError::Input)
            .attach_with(|| format!("line {}", line_no + 1))?;
        let bar = record.into_bar(bars.len());
        let previous = bars.last().map(|b: &Bar| b.index);
        if previous.is_some_and(|p| bar.index <= p) {
            return Err(Report::new(AppError::Input).attach(format!(
                "line {}: index {} does not increase",
                line_no + 1,
                bar.index
            )));
        }
        bars.push(bar);
    }
    Ok(bars)
}

fn replay<C: Calculator>(calculator: C, bars: Vec<Bar>) -> Result<(), Report<AppError>> {
    let name = calculator.name().to_string();
    let mut engine = Engine::new(calculator);
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for (bar_index, bar) in bars.into_iter().enumerate() {
        let result = engine.step(bar);
        serde_json::to_writer(&mut out, &result)
            .change_context(AppError::Output)
            .attach_with(|| format!("bar {bar_index}"))?;
        out.write_all(b"\n").change_context(AppError::Output)?;
    }
    out.flush().change_context(AppError::Output)?;

    info!(calculator = %name, processed = engine.processed(), "replay complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2024-01-02T00:00:00Z";

    fn line(index: Option<usize>, close: f64) -> String {
        let index = index.map(|i| format!("\"index\":{i},")).unwrap_or_default();
        format!(
            "{{{index}\"timestamp\":\"{TS}\",\"open\":{close},\"high\":{close},\"low\":{close},\"close\":{close},\"volume\":1.0}}"
        )
    }

    #[test]
    fn missing_index_defaults_to_position() {
        let input = format!("{}\n{}\n", line(None, 1.0), line(None, 2.0));
        let bars = parse_bars(input.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].index, 0);
        assert_eq!(bars[1].index, 1);
        assert!((bars[1].close - 2.0).abs() < 1e-12);
    }

    #[test]
    fn blank_lines_skipped() {
        let input = format!("\n{}\n   \n\n{}\n", line(None, 1.0), line(None, 2.0));
        let bars = parse_bars(input.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].index, 1);
    }

    #[test]
    fn explicit_indexes_kept() {
        let input = format!("{}\n{}\n", line(Some(10), 1.0), line(Some(12), 2.0));
        let bars = parse_bars(input.as_bytes()).unwrap();
        assert_eq!(bars[0].index, 10);
        assert_eq!(bars[1].index, 12);
    }

    #[test]
    fn non_increasing_index_rejected() {
        let input = format!("{}\n{}\n", line(Some(5), 1.0), line(Some(5), 2.0));
        let err = parse_bars(input.as_bytes()).unwrap_err();
        assert!(matches!(err.current_context(), AppError::Input));
    }

    #[test]
    fn defaulted_index_behind_explicit_one_rejected() {
        let input = format!("{}\n{}\n", line(Some(7), 1.0), line(None, 2.0));
        assert!(parse_bars(input.as_bytes()).is_err());
    }

    #[test]
    fn malformed_line_rejected() {
        let input = format!("{}\nnot json\n", line(None, 1.0));
        let err = parse_bars(input.as_bytes()).unwrap_err();
        assert!(matches!(err.current_context(), AppError::Input));
    }
}
