use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{config::TableSource, fuzzy::Scorer};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile per-category football statistics into one player report",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Cleanse, merge, filter and project per-category statistics tables
    Merge(MergeArgs),
    /// Attach scraped market values to a merged report by fuzzy player name
    Match(MatchArgs),
    /// Per-squad median/mean/std and top/bottom listings for numeric columns
    Summary(SummaryArgs),
    /// Write the default pipeline configuration as YAML
    Config(ConfigArgs),
}

/// Options shared by every data command.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// YAML pipeline configuration; explicit flags override its values
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Token read as, and written for, missing cells (defaults to `N/a`)
    #[arg(long = "missing-marker")]
    pub missing_marker: Option<String>,
    /// Prefix CSV output with a UTF-8 byte order mark
    #[arg(long)]
    pub bom: bool,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Input table as `LABEL=PATH`, repeated in merge order (overrides the config table list)
    #[arg(long = "table", value_parser = parse_table_source, action = clap::ArgAction::Append)]
    pub tables: Vec<TableSource>,
    /// Comma-separated identity key fields
    #[arg(long)]
    pub key: Option<String>,
    /// Rank column whose header token marks repeated header rows
    #[arg(long = "rank-column")]
    pub rank_column: Option<String>,
    /// Keep records whose minutes are strictly greater than this value
    #[arg(long = "min-minutes")]
    pub min_minutes: Option<f64>,
    /// Column holding minutes played
    #[arg(long = "minutes-column")]
    pub minutes_column: Option<String>,
    /// Canonical output columns (defaults to the built-in list)
    #[arg(short = 'C', long = "columns", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Keep merge order (first table's rows, then unmatched rows of later tables) instead of ordering by first name
    #[arg(long = "no-sort")]
    pub no_sort: bool,
    /// Also drop rows where a cell equals the row's position
    #[arg(long = "positional-cleanse")]
    pub positional_cleanse: bool,
    /// Leading rows to skip above each table's header
    #[arg(long = "skip-rows")]
    pub skip_rows: Option<usize>,
    /// Write the collision rename map as JSON
    #[arg(long = "rename-log")]
    pub rename_log: Option<PathBuf>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Merged report CSV to match
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Candidate pool CSV with player names and market values
    #[arg(long = "candidates")]
    pub candidates: PathBuf,
    /// Comma-separated identity key fields; the first one holds the player name
    #[arg(long)]
    pub key: Option<String>,
    /// Name column of the candidate file
    #[arg(long = "candidate-name-column")]
    pub candidate_name_column: Option<String>,
    /// Value column of the candidate file
    #[arg(long = "candidate-value-column")]
    pub candidate_value_column: Option<String>,
    /// Minimum similarity (0-100) for a match to be accepted
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Similarity scorer
    #[arg(long, value_enum)]
    pub scorer: Option<Scorer>,
    /// Keep records whose minutes are strictly greater than this value
    #[arg(long = "min-minutes")]
    pub min_minutes: Option<f64>,
    /// Column holding minutes played
    #[arg(long = "minutes-column")]
    pub minutes_column: Option<String>,
    /// Columns kept ahead of the matched value (defaults to the config's match columns)
    #[arg(short = 'C', long = "columns", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Merged report CSV to summarize
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV for the per-squad statistics (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Text file for the top/bottom listings (skipped if omitted)
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
    /// Records per top/bottom listing
    #[arg(long)]
    pub top: Option<usize>,
    /// Column grouping records into squads
    #[arg(long = "squad-column")]
    pub squad_column: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Destination YAML file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_table_source(value: &str) -> Result<TableSource, String> {
    let (label, path) = value
        .split_once('=')
        .ok_or_else(|| format!("Expected LABEL=PATH, got '{value}'"))?;
    let label = label.trim();
    let path = path.trim();
    if label.is_empty() || path.is_empty() {
        return Err(format!("Expected LABEL=PATH, got '{value}'"));
    }
    Ok(TableSource::new(label, path))
}
