pub mod cleanse;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod fuzzy;
pub mod io_utils;
pub mod merge;
pub mod pipeline;
pub mod project;
pub mod schema;
pub mod summary;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, CommonArgs, ConfigArgs, MatchArgs, MergeArgs, SummaryArgs},
    config::PipelineConfig,
    filter::ThresholdFilter,
    fuzzy::FuzzyMatcher,
    io_utils::{ReadOptions, WriteOptions},
    merge::IdentityKey,
    pipeline::{MatchOptions, MergeOptions},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("squad_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Merge(args) => handle_merge(&args),
        Commands::Match(args) => handle_match(&args),
        Commands::Summary(args) => handle_summary(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

/// Loaded config with the shared CLI overrides applied.
fn resolve_config(common: &CommonArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_or_default(common.config.as_deref())?;
    if let Some(marker) = &common.missing_marker {
        config.missing_marker = marker.clone();
    }
    Ok(config)
}

fn read_options(common: &CommonArgs, config: &PipelineConfig) -> Result<ReadOptions> {
    let mut options = ReadOptions::new(config.missing_marker.clone());
    options.delimiter = common.delimiter;
    options.encoding = io_utils::resolve_encoding(common.input_encoding.as_deref())?;
    Ok(options)
}

fn write_options(common: &CommonArgs, config: &PipelineConfig) -> WriteOptions {
    WriteOptions {
        delimiter: common.delimiter,
        missing_marker: config.missing_marker.clone(),
        bom: common.bom,
    }
}

fn eligibility(column: &str, cutoff: f64) -> Result<Option<ThresholdFilter>> {
    Ok(Some(ThresholdFilter::new(column, cutoff)?))
}

fn handle_merge(args: &MergeArgs) -> Result<()> {
    let mut config = resolve_config(&args.common)?;
    if !args.tables.is_empty() {
        config.tables = args.tables.clone();
    }
    if let Some(skip) = args.skip_rows {
        for table in &mut config.tables {
            table.skip_rows = skip;
        }
    }
    if let Some(rank) = &args.rank_column {
        config.rank_column = rank.clone();
    }
    if args.positional_cleanse {
        config.positional_cleanse = true;
    }
    if args.no_sort {
        config.sort_by_first_name = false;
    }
    if !args.columns.is_empty() {
        config.canonical_columns = args.columns.clone();
    }
    let key = match &args.key {
        Some(raw) => IdentityKey::parse(raw)?,
        None => config.identity_key(),
    };
    let minutes_column = args.minutes_column.as_ref().unwrap_or(&config.minutes_column);
    let cutoff = args.min_minutes.unwrap_or(config.merge_min_minutes);

    let mut tables = Vec::with_capacity(config.tables.len());
    for source in &config.tables {
        let mut options = read_options(&args.common, &config)?;
        options.skip_rows = source.skip_rows;
        info!(
            "Reading '{}' from {:?} with delimiter '{}'",
            source.label,
            source.path,
            printable_delimiter(io_utils::resolve_delimiter(
                Some(source.path.as_path()),
                options.delimiter
            ))
        );
        let table = io_utils::read_table(&source.path, &source.label, &options)
            .with_context(|| format!("Reading table '{}' from {:?}", source.label, source.path))?;
        tables.push(table);
    }

    let sort_field = config
        .sort_by_first_name
        .then(|| key.fields.first().cloned())
        .flatten();
    let options = MergeOptions {
        key,
        cleanse: config.cleanse_rules(),
        eligibility: eligibility(minutes_column, cutoff)?,
        sort_field,
        canonical: config.canonical_columns.clone(),
        missing_marker: config.missing_marker.clone(),
    };
    let merged = pipeline::reconcile(tables, &options).context("Reconciling tables")?;
    if merged.is_empty() {
        warn!("Merged report has no records");
    }

    io_utils::write_dataset(
        args.output.as_deref(),
        merged.data(),
        &write_options(&args.common, &config),
    )
    .with_context(|| format!("Writing merged report to {:?}", args.output))?;
    if let Some(path) = &args.rename_log {
        io_utils::write_rename_log(path, merged.renames())?;
        debug!("Rename log with {} entry(ies) written to {path:?}", merged.renames().len());
    }
    info!(
        "Merged report: {} record(s) x {} column(s) from {} table(s)",
        merged.len(),
        merged.schema().len(),
        merged.sources().len()
    );
    Ok(())
}

fn handle_match(args: &MatchArgs) -> Result<()> {
    let config = resolve_config(&args.common)?;
    let read = read_options(&args.common, &config)?;
    let data = io_utils::read_dataset(&args.input, &read)
        .with_context(|| format!("Reading report {:?}", args.input))?;
    let name_column = args
        .candidate_name_column
        .as_ref()
        .unwrap_or(&config.candidate_name_column);
    let value_column = args
        .candidate_value_column
        .as_ref()
        .unwrap_or(&config.candidate_value_column);
    let pool = io_utils::read_candidate_pool(&args.candidates, name_column, value_column, &read)
        .with_context(|| format!("Reading candidates {:?}", args.candidates))?;
    info!("Loaded {} candidate(s) from {:?}", pool.len(), args.candidates);

    let key = match &args.key {
        Some(raw) => IdentityKey::parse(raw)?,
        None => config.identity_key(),
    };
    let name_field = key
        .fields
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Identity key is empty"))?;
    let matcher = FuzzyMatcher::new(
        name_field,
        args.threshold.unwrap_or(config.similarity_threshold),
    )?
    .with_scorer(args.scorer.unwrap_or(config.scorer));
    let minutes_column = args.minutes_column.as_ref().unwrap_or(&config.minutes_column);
    let options = MatchOptions {
        eligibility: eligibility(
            minutes_column,
            args.min_minutes.unwrap_or(config.match_min_minutes),
        )?,
        canonical: if args.columns.is_empty() {
            config.match_columns.clone()
        } else {
            args.columns.clone()
        },
        matcher,
        value_field: config.value_field.clone(),
        score_field: config.score_field.clone(),
    };
    let linked = pipeline::link_market_values(&data, &pool, &options)
        .context("Matching records to candidates")?;
    io_utils::write_dataset(
        args.output.as_deref(),
        &linked,
        &write_options(&args.common, &config),
    )
    .with_context(|| format!("Writing matched report to {:?}", args.output))?;
    info!("Matched report: {} record(s)", linked.len());
    Ok(())
}

fn handle_summary(args: &SummaryArgs) -> Result<()> {
    let mut config = resolve_config(&args.common)?;
    if let Some(squad) = &args.squad_column {
        config.squad_column = squad.clone();
    }
    let top = args.top.unwrap_or(config.top_n);
    let data = io_utils::read_dataset(&args.input, &read_options(&args.common, &config)?)
        .with_context(|| format!("Reading report {:?}", args.input))?;
    if data.is_empty() {
        warn!("Report {:?} has no records", args.input);
    }

    let columns = summary::numeric_columns(&data, &config.key);
    debug!(
        "Numeric columns: {:?}",
        columns
            .iter()
            .filter_map(|idx| data.schema.field(*idx).map(|f| f.name.as_str()))
            .collect::<Vec<_>>()
    );
    let imputed = summary::impute_means(&data, &columns);
    let squads = summary::summarize(&imputed, &columns, &config.squad_column)?;
    io_utils::write_dataset(
        args.output.as_deref(),
        &squads.to_dataset(&config.squad_column),
        &write_options(&args.common, &config),
    )
    .with_context(|| format!("Writing summary to {:?}", args.output))?;

    if let Some(path) = &args.report {
        let player_field = config.key.first().map(String::as_str).unwrap_or("Player");
        let rankings = summary::rank_extremes(
            &imputed,
            &columns,
            top,
            player_field,
            &config.squad_column,
            &config.missing_marker,
        );
        let report = summary::render_report(&rankings, top, player_field, &config.squad_column);
        io_utils::write_text(Some(path.as_path()), &report)
            .with_context(|| format!("Writing report to {path:?}"))?;
        info!("Top/bottom {top} report for {} column(s) written to {path:?}", rankings.len());
    }
    Ok(())
}

fn handle_config(args: &ConfigArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(anyhow!(
            "{:?} already exists; pass --force to overwrite",
            args.output
        ));
    }
    PipelineConfig::default()
        .save(&args.output)
        .with_context(|| format!("Writing default config to {:?}", args.output))?;
    info!("Default pipeline config written to {:?}", args.output);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
